//! Structured per-user logging.
//!
//! Every event carries the user id, the pipeline stage and, once known,
//! the slot being handled.

use tracing::{error, info, warn, Span};

use subburn_models::{Slot, UserId};

/// Pipeline stage a logger reports for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Transcode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Transcode => "transcode",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JobLogger {
    user_id: UserId,
    stage: Stage,
    slot: Option<Slot>,
}

impl JobLogger {
    pub fn ingest(user_id: UserId) -> Self {
        Self {
            user_id,
            stage: Stage::Ingest,
            slot: None,
        }
    }

    pub fn transcode(user_id: UserId) -> Self {
        Self {
            user_id,
            stage: Stage::Transcode,
            slot: None,
        }
    }

    /// Same logger, tagged with the slot being handled.
    pub fn for_slot(&self, slot: Slot) -> Self {
        Self {
            slot: Some(slot),
            ..*self
        }
    }

    fn slot(&self) -> &'static str {
        self.slot.map_or("-", |s| s.as_str())
    }

    pub fn log_start(&self, message: &str) {
        info!(
            user_id = %self.user_id,
            stage = self.stage.as_str(),
            slot = self.slot(),
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            user_id = %self.user_id,
            stage = self.stage.as_str(),
            slot = self.slot(),
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            user_id = %self.user_id,
            stage = self.stage.as_str(),
            slot = self.slot(),
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            user_id = %self.user_id,
            stage = self.stage.as_str(),
            slot = self.slot(),
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            user_id = %self.user_id,
            stage = self.stage.as_str(),
            "Job completed: {}", message
        );
    }

    /// Span to instrument the whole stage with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            user_id = %self.user_id,
            stage = self.stage.as_str()
        )
    }
}
