//! FFmpeg CLI wrapper and downloader for subtitle burn-in.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building for burned-in subtitles
//! - Progress parsing from `-progress pipe:1`
//! - Duration probing via FFprobe
//! - Streaming HTTP downloads with bounded network waits

pub mod command;
pub mod download;
pub mod error;
pub mod probe;
pub mod progress;

pub use command::{subtitles_filter, FfmpegCommand, FfmpegProcess, FfmpegRunner};
pub use download::HttpDownloader;
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration_with;
pub use progress::{parse_progress_line, render_gauge, ProgressStream, ProgressThrottle, ProgressTick};
