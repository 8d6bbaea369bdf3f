//! Per-user pairing session.

use serde::{Deserialize, Serialize};

use crate::{FileLocation, Slot, UserId};

/// In-progress pairing of a video and a subtitle for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub video: Option<FileLocation>,
    pub subtitle: Option<FileLocation>,
}

impl Session {
    /// Create an empty session.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            video: None,
            subtitle: None,
        }
    }

    /// Fill (or overwrite) a slot.
    pub fn set(&mut self, slot: Slot, location: FileLocation) {
        match slot {
            Slot::Video => self.video = Some(location),
            Slot::Subtitle => self.subtitle = Some(location),
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&FileLocation> {
        match slot {
            Slot::Video => self.video.as_ref(),
            Slot::Subtitle => self.subtitle.as_ref(),
        }
    }

    /// True once both slots are filled.
    pub fn is_complete(&self) -> bool {
        self.video.is_some() && self.subtitle.is_some()
    }

    /// The first slot still waiting for input.
    pub fn missing(&self) -> Option<Slot> {
        if self.video.is_none() {
            Some(Slot::Video)
        } else if self.subtitle.is_none() {
            Some(Slot::Subtitle)
        } else {
            None
        }
    }
}
