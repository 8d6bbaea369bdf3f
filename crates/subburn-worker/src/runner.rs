//! Transcode driver.
//!
//! Takes a completed session through download, probe, burn-in and delivery,
//! reporting progress by editing one status message. Every run ends in a
//! [`TranscodeOutcome`] and always releases its [`CleanupGuard`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};

use subburn_media::{
    probe_duration_with, render_gauge, FfmpegCommand, FfmpegRunner, HttpDownloader, MediaError,
    ProgressThrottle,
};
use subburn_models::{
    EncodingConfig, FileLocation, JobPaths, Session, Slot, SubtitleStyle, TranscodeJob,
};

use crate::cleanup::{CleanupGuard, CleanupManager};
use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::notifier::{Notifier, StatusMessage};
use crate::session_store::SessionStore;

/// Caption attached to the delivered video.
pub const SUCCESS_CAPTION: &str = "✅ Success! Your video is ready.";

/// Terminal result of one transcode run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// An input could not be fetched
    DownloadFailed(Slot),
    /// The video has no readable positive duration
    UnreadableMedia,
    /// FFmpeg failed; carries the tail of its error output
    TranscodeFailed(String),
    /// The rendered file could not be delivered
    UploadFailed(String),
    Success,
}

impl TranscodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscodeOutcome::Success)
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeOutcome::DownloadFailed(_) => "download_failed",
            TranscodeOutcome::UnreadableMedia => "unreadable_media",
            TranscodeOutcome::TranscodeFailed(_) => "transcode_failed",
            TranscodeOutcome::UploadFailed(_) => "upload_failed",
            TranscodeOutcome::Success => "success",
        }
    }

    /// Text shown to the user for this outcome.
    pub fn user_message(&self) -> String {
        match self {
            TranscodeOutcome::DownloadFailed(slot) => {
                format!("❌ Error: Could not download the {} file.", slot.as_str())
            }
            TranscodeOutcome::UnreadableMedia => {
                "❌ Error: Could not read video file. It may be corrupt.".to_string()
            }
            TranscodeOutcome::TranscodeFailed(snippet) => {
                format!("❌ FFmpeg error:\n\n`{}`", snippet)
            }
            TranscodeOutcome::UploadFailed(reason) => {
                format!("❌ Error: Could not upload the finished video: {}", reason)
            }
            TranscodeOutcome::Success => SUCCESS_CAPTION.to_string(),
        }
    }
}

/// Status text for a progress update.
pub fn progress_text(percent: u8) -> String {
    format!("⚙️ Processing: {}", render_gauge(percent))
}

/// Runs transcodes for completed sessions.
pub struct TranscodeRunner {
    notifier: Arc<dyn Notifier>,
    downloader: HttpDownloader,
    ffmpeg: FfmpegRunner,
    ffprobe_bin: String,
    style: SubtitleStyle,
    encoding: EncodingConfig,
    work_dir: PathBuf,
    progress_step: u8,
    cleanup: CleanupManager,
}

impl TranscodeRunner {
    pub fn new(
        config: &WorkerConfig,
        notifier: Arc<dyn Notifier>,
        sessions: SessionStore,
    ) -> WorkerResult<Self> {
        Ok(Self {
            notifier,
            downloader: HttpDownloader::new(config.download_timeout)?,
            ffmpeg: FfmpegRunner::new()
                .with_binary(&config.ffmpeg_bin)
                .with_stderr_tail(config.stderr_tail_lines),
            ffprobe_bin: config.ffprobe_bin.clone(),
            style: config.subtitle_style(),
            encoding: config.encoding(),
            work_dir: config.work_dir.clone(),
            progress_step: config.progress_step,
            cleanup: CleanupManager::new(sessions),
        })
    }

    /// Transcode a completed session and deliver the result.
    ///
    /// Local files and the user's session are gone when this returns,
    /// whatever the outcome.
    pub async fn run(&self, session: Session) -> TranscodeOutcome {
        let user_id = session.user_id;
        let logger = JobLogger::transcode(user_id);
        let span = logger.create_span();

        async move {
            let missing = session.missing();
            let Some(job) = TranscodeJob::from_session(session, &self.work_dir) else {
                // An empty slot has nothing to fetch
                let slot = missing.unwrap_or(Slot::Video);
                logger.for_slot(slot).log_error("Session has no file for this slot");
                let outcome = TranscodeOutcome::DownloadFailed(slot);
                StatusMessage::open(self.notifier.clone(), user_id, &outcome.user_message()).await;
                self.cleanup
                    .cleanup(user_id, &JobPaths::for_user(&self.work_dir, user_id))
                    .await;
                return outcome;
            };

            logger.log_start(&format!("{} + {}", job.video.filename, job.subtitle.filename));
            let started = Instant::now();
            let guard = self.cleanup.guard(user_id, job.paths.clone());
            let mut status = StatusMessage::open(
                self.notifier.clone(),
                user_id,
                "⬇️ All files received. Starting download...",
            )
            .await;

            let outcome = self.execute(&job, &guard, &mut status, &logger).await;

            match &outcome {
                TranscodeOutcome::Success => {
                    status.delete().await;
                    logger.log_completion("Video delivered");
                }
                failed => {
                    status.update(&failed.user_message()).await;
                    logger.log_error(&format!("Transcode ended with {}", failed.as_str()));
                }
            }

            metrics::record_transcode(outcome.as_str(), started.elapsed().as_secs_f64());
            guard.finish().await;
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job: &TranscodeJob,
        guard: &CleanupGuard<'_>,
        status: &mut StatusMessage,
        logger: &JobLogger,
    ) -> TranscodeOutcome {
        let paths = guard.paths();

        status.update("⬇️ Downloading video file...").await;
        if !self.fetch(Slot::Video, &job.video, &paths.video, logger).await {
            return TranscodeOutcome::DownloadFailed(Slot::Video);
        }

        status.update("⬇️ Downloading subtitle file...").await;
        if !self.fetch(Slot::Subtitle, &job.subtitle, &paths.subtitle, logger).await {
            return TranscodeOutcome::DownloadFailed(Slot::Subtitle);
        }

        let duration = match probe_duration_with(&self.ffprobe_bin, &paths.video).await {
            Ok(duration) => duration,
            Err(e) => {
                logger.log_warning(&format!("Probe failed: {}", e));
                return TranscodeOutcome::UnreadableMedia;
            }
        };
        logger.log_progress(&format!("Video duration {:.2}s", duration));

        status.update("⚙️ Files downloaded. Hardcoding subtitles...").await;

        let cmd = FfmpegCommand::burn_subtitles(
            &paths.video,
            &paths.subtitle,
            &paths.output,
            &self.style,
            &self.encoding,
        );
        let mut process = match self.ffmpeg.spawn(&cmd) {
            Ok(process) => process,
            Err(e) => {
                logger.log_error(&format!("Failed to start FFmpeg: {}", e));
                return TranscodeOutcome::TranscodeFailed(e.to_string());
            }
        };

        let mut throttle = ProgressThrottle::new(self.progress_step);
        loop {
            match process.next_tick().await {
                Ok(Some(tick)) => {
                    if let Some(percent) = throttle.observe(tick.percent(duration)) {
                        status.update(&progress_text(percent)).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    logger.log_warning(&format!("Progress stream error: {}", e));
                    break;
                }
            }
        }

        if let Err(e) = process.wait().await {
            return TranscodeOutcome::TranscodeFailed(failure_snippet(&e));
        }
        info!(path = %paths.output.display(), "FFmpeg finished");

        status.update("✅ Processing complete! ⬆️ Uploading...").await;
        match self
            .notifier
            .send_file(job.user_id, &paths.output, SUCCESS_CAPTION)
            .await
        {
            Ok(()) => TranscodeOutcome::Success,
            Err(e) => {
                logger.log_error(&format!("Upload failed: {}", e));
                TranscodeOutcome::UploadFailed(e.to_string())
            }
        }
    }

    /// Download one input. Returns false on failure.
    async fn fetch(
        &self,
        slot: Slot,
        location: &FileLocation,
        dest: &Path,
        logger: &JobLogger,
    ) -> bool {
        let logger = logger.for_slot(slot);
        match self.downloader.download(&location.url, dest).await {
            Ok(bytes) => {
                metrics::record_download(slot.as_str(), Some(bytes));
                logger.log_progress(&format!("Downloaded {} bytes", bytes));
                true
            }
            Err(e) => {
                metrics::record_download(slot.as_str(), None);
                logger.log_warning(&format!("Download from {} failed: {}", location.url, e));
                false
            }
        }
    }
}

/// Error text surfaced to the user when FFmpeg fails.
fn failure_snippet(err: &MediaError) -> String {
    match err.stderr().map(str::trim).filter(|s| !s.is_empty()) {
        Some(tail) => tail.to_string(),
        None => match err {
            MediaError::FfmpegFailed {
                exit_code: Some(code),
                ..
            } => format!("{} (exit code {})", err, code),
            _ => err.to_string(),
        },
    }
}
