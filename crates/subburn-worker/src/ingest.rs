//! Submission handling.
//!
//! Turns inbound uploads and links into session slots, and hands a session
//! to the [`TranscodeRunner`] once both a video and a subtitle are present.

use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

use subburn_models::{FileLocation, Session, Slot, UserId};
use subburn_resolver::{LinkResolver, Provider, ResolutionError};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::notifier::{Notifier, StatusMessage};
use crate::runner::{TranscodeOutcome, TranscodeRunner};
use crate::session_store::SessionStore;

/// Onboarding text for new users.
pub fn welcome_text() -> &'static str {
    "Welcome to the Subtitle Muxer Bot!\n\n\
     1. Send your video file or a direct download link.\n\
     2. Send the .srt subtitle file or a direct download link."
}

/// An inbound event from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactEvent {
    /// A file sent directly through the chat.
    Upload {
        /// Fetchable URL handed out by the transport
        upload_ref: String,
        declared_filename: String,
        declared_size_bytes: u64,
    },
    /// A text message; only the first detected URL is used.
    Text {
        raw_text: String,
        detected_urls: Vec<String>,
    },
}

impl ArtifactEvent {
    /// Text event carrying a single link.
    pub fn link(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Text {
            raw_text: url.clone(),
            detected_urls: vec![url],
        }
    }

    fn source(&self) -> &'static str {
        match self {
            ArtifactEvent::Upload { .. } => "upload",
            ArtifactEvent::Text { .. } => "link",
        }
    }
}

/// Why a submission was refused. The session is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Unsupported file type: {filename}")]
    UnsupportedType { filename: String, from_link: bool },

    #[error("Upload too large: {filename} is {size_bytes} bytes (limit {limit_bytes})")]
    TooLarge {
        filename: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

impl IngestionError {
    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            IngestionError::Resolution(e) => e.user_message().to_string(),
            IngestionError::UnsupportedType { from_link: true, .. } => {
                "The link doesn't point to a supported video (.mp4, .mkv, .avi, .mov) or subtitle (.srt) file."
                    .to_string()
            }
            IngestionError::UnsupportedType { filename, .. } => format!(
                "❌ '{}' is not a supported video (.mp4, .mkv, .avi, .mov) or subtitle (.srt) file.",
                filename
            ),
            IngestionError::TooLarge {
                size_bytes,
                limit_bytes,
                ..
            } => format!(
                "❌ Error: File is too big ({:.1} MiB, limit {} MiB). Please send a direct link instead.",
                *size_bytes as f64 / MIB,
                limit_bytes / MIB as u64
            ),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            IngestionError::Resolution(_) => "unresolved",
            IngestionError::UnsupportedType { .. } => "unsupported",
            IngestionError::TooLarge { .. } => "too_large",
        }
    }
}

const MIB: f64 = 1024.0 * 1024.0;

/// Result of handling one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// Nothing actionable (text without a link)
    Ignored,
    Rejected(IngestionError),
    /// A slot was filled and the other one is still empty
    SlotFilled { slot: Slot, awaiting: Slot },
    /// Both slots were filled and the transcode ran to completion
    Transcoded(TranscodeOutcome),
}

/// Accepts submissions and drives sessions to a transcode.
#[derive(Clone)]
pub struct IngestionController {
    sessions: SessionStore,
    resolver: LinkResolver,
    runner: Arc<TranscodeRunner>,
    notifier: Arc<dyn Notifier>,
    max_upload_bytes: u64,
}

impl IngestionController {
    /// Build the controller and its runner from configuration.
    pub fn new(config: &WorkerConfig, notifier: Arc<dyn Notifier>) -> WorkerResult<Self> {
        let sessions = SessionStore::new();
        let resolver = LinkResolver::new(config.resolver_config())?;
        let runner = TranscodeRunner::new(config, notifier.clone(), sessions.clone())?;

        Ok(Self::from_parts(
            sessions,
            resolver,
            Arc::new(runner),
            notifier,
            config.max_upload_bytes,
        ))
    }

    pub fn from_parts(
        sessions: SessionStore,
        resolver: LinkResolver,
        runner: Arc<TranscodeRunner>,
        notifier: Arc<dyn Notifier>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            sessions,
            resolver,
            runner,
            notifier,
            max_upload_bytes,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound event for a user.
    ///
    /// When the event completes the user's session this awaits the whole
    /// transcode and returns its outcome.
    pub async fn on_artifact(&self, user_id: UserId, event: ArtifactEvent) -> IngestionOutcome {
        let logger = JobLogger::ingest(user_id);
        let span = logger.create_span();
        self.handle(user_id, event, &logger).instrument(span).await
    }

    async fn handle(
        &self,
        user_id: UserId,
        event: ArtifactEvent,
        logger: &JobLogger,
    ) -> IngestionOutcome {
        let source = event.source();

        let (location, status, upload_size) = match event {
            ArtifactEvent::Upload {
                upload_ref,
                declared_filename,
                declared_size_bytes,
            } => {
                let status = StatusMessage::open(
                    self.notifier.clone(),
                    user_id,
                    &format!("Received '{}'.", declared_filename),
                )
                .await;
                (
                    FileLocation::new(upload_ref, declared_filename),
                    status,
                    Some(declared_size_bytes),
                )
            }
            ArtifactEvent::Text { detected_urls, .. } => {
                let Some(url) = detected_urls.into_iter().next() else {
                    return IngestionOutcome::Ignored;
                };

                let provider = Provider::detect(&url);
                let status =
                    StatusMessage::open(self.notifier.clone(), user_id, provider.resolving_text())
                        .await;

                match self.resolver.resolve(&url).await {
                    Ok(location) => (location, status, None),
                    Err(e) => return self.reject(status, source, e.into(), logger).await,
                }
            }
        };

        let Some(slot) = location.kind().slot() else {
            let error = IngestionError::UnsupportedType {
                filename: location.filename,
                from_link: upload_size.is_none(),
            };
            return self.reject(status, source, error, logger).await;
        };

        if let Some(size_bytes) = upload_size.filter(|size| *size > self.max_upload_bytes) {
            let error = IngestionError::TooLarge {
                filename: location.filename,
                size_bytes,
                limit_bytes: self.max_upload_bytes,
            };
            return self.reject(status, source, error, logger).await;
        }

        self.accept(user_id, slot, location, status, source, logger)
            .await
    }

    async fn accept(
        &self,
        user_id: UserId,
        slot: Slot,
        location: FileLocation,
        mut status: StatusMessage,
        source: &'static str,
        logger: &JobLogger,
    ) -> IngestionOutcome {
        let filename = location.filename.clone();
        let session = self.sessions.upsert_slot(user_id, slot, location);

        metrics::record_artifact(source, "accepted");
        logger
            .for_slot(slot)
            .log_progress(&format!("Accepted '{}' via {}", filename, source));
        status
            .update(&slot_filled_text(slot, &filename, source == "link", &session))
            .await;

        match self.sessions.take_if_complete(user_id) {
            Some(session) => IngestionOutcome::Transcoded(self.runner.run(session).await),
            None => IngestionOutcome::SlotFilled {
                slot,
                awaiting: session.missing().unwrap_or_else(|| slot.other()),
            },
        }
    }

    async fn reject(
        &self,
        mut status: StatusMessage,
        source: &'static str,
        error: IngestionError,
        logger: &JobLogger,
    ) -> IngestionOutcome {
        metrics::record_artifact(source, error.as_str());
        logger.log_warning(&format!("Rejected {}: {}", source, error));
        status.update(&error.user_message()).await;
        IngestionOutcome::Rejected(error)
    }
}

/// Confirmation for a filled slot, naming what is still needed.
fn slot_filled_text(slot: Slot, filename: &str, from_link: bool, session: &Session) -> String {
    let label = match (slot, from_link) {
        (Slot::Video, false) => "Video",
        (Slot::Video, true) => "Video link for",
        (Slot::Subtitle, false) => "Subtitle",
        (Slot::Subtitle, true) => "Subtitle link for",
    };

    match session.missing() {
        Some(missing) => format!("✅ {} '{}' received. Now send the {}.", label, filename, missing),
        None => format!("✅ {} '{}' received. Both files are here.", label, filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_text_lists_steps() {
        assert!(welcome_text().contains("1. Send your video file"));
        assert!(welcome_text().contains("2. Send the .srt subtitle file"));
    }

    #[test]
    fn test_link_event() {
        let event = ArtifactEvent::link("https://example.com/a.mp4");
        assert_eq!(
            event,
            ArtifactEvent::Text {
                raw_text: "https://example.com/a.mp4".to_string(),
                detected_urls: vec!["https://example.com/a.mp4".to_string()],
            }
        );
        assert_eq!(event.source(), "link");
    }

    #[test]
    fn test_rejection_messages() {
        let too_large = IngestionError::TooLarge {
            filename: "big.mp4".to_string(),
            size_bytes: 30 * 1024 * 1024,
            limit_bytes: 20 * 1024 * 1024,
        };
        assert_eq!(
            too_large.user_message(),
            "❌ Error: File is too big (30.0 MiB, limit 20 MiB). Please send a direct link instead."
        );

        let unsupported = IngestionError::UnsupportedType {
            filename: "notes.txt".to_string(),
            from_link: false,
        };
        assert!(unsupported.user_message().contains("'notes.txt'"));

        let drive = IngestionError::from(ResolutionError::quota_or_invalid("html"));
        assert!(drive.user_message().contains("Google Drive"));
    }

    #[test]
    fn test_slot_filled_text() {
        let mut session = Session::new(UserId::new(1));
        session.set(Slot::Video, FileLocation::new("u", "movie.mkv"));
        assert_eq!(
            slot_filled_text(Slot::Video, "movie.mkv", false, &session),
            "✅ Video 'movie.mkv' received. Now send the subtitle."
        );
        assert_eq!(
            slot_filled_text(Slot::Video, "movie.mkv", true, &session),
            "✅ Video link for 'movie.mkv' received. Now send the subtitle."
        );

        session.set(Slot::Subtitle, FileLocation::new("u", "subs.srt"));
        assert!(slot_filled_text(Slot::Subtitle, "subs.srt", true, &session).ends_with("Both files are here."));
    }
}
