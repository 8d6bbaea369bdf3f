//! Ingestion state machine and transcode driver.
//!
//! Users submit a video and a subtitle, in any order, as direct uploads or
//! links. Once both are present the pair is downloaded, the subtitles are
//! burned in with FFmpeg, and the result is delivered back through a
//! [`Notifier`].

pub mod cleanup;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod runner;
pub mod session_store;

pub use cleanup::{CleanupGuard, CleanupManager};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use ingest::{welcome_text, ArtifactEvent, IngestionController, IngestionError, IngestionOutcome};
pub use logging::{JobLogger, Stage};
pub use notifier::{LogNotifier, MessageHandle, Notifier, NotifyError, NotifyResult, StatusMessage};
pub use runner::{TranscodeOutcome, TranscodeRunner};
pub use session_store::SessionStore;
