//! Shared data models for the subtitle burn-in pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - User identity and file locations
//! - Artifact classification (video / subtitle / unsupported)
//! - Per-user pairing sessions
//! - Transcode jobs and encoding configuration

pub mod artifact;
pub mod encoding;
pub mod job;
pub mod session;
pub mod user;

// Re-export common types
pub use artifact::{classify, ArtifactKind, FileLocation, Slot};
pub use encoding::{EncodingConfig, SubtitleStyle};
pub use job::{JobPaths, TranscodeJob};
pub use session::Session;
pub use user::UserId;
