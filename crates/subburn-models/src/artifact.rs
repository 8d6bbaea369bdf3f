//! Artifacts submitted by users and their classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// File suffixes accepted as video input.
pub const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".mkv", ".avi", ".mov"];

/// File suffix accepted as subtitle input.
pub const SUBTITLE_EXTENSION: &str = ".srt";

/// A fetchable file together with the name it was declared under.
///
/// Produced either by link resolution or by the transport layer for direct
/// uploads. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    /// Final, directly downloadable URL
    pub url: String,
    /// Declared filename (used for classification only)
    pub filename: String,
}

impl FileLocation {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }

    /// Classify this location by its filename.
    pub fn kind(&self) -> ArtifactKind {
        classify(&self.filename)
    }
}

/// What a submitted artifact is, judged by its filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Video,
    Subtitle,
    Unsupported,
}

impl ArtifactKind {
    /// The session slot this kind fills, if any.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            ArtifactKind::Video => Some(Slot::Video),
            ArtifactKind::Subtitle => Some(Slot::Subtitle),
            ArtifactKind::Unsupported => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::Subtitle => "subtitle",
            ArtifactKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a filename by suffix, ignoring case.
pub fn classify(filename: &str) -> ArtifactKind {
    let name = filename.to_ascii_lowercase();

    if VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        ArtifactKind::Video
    } else if name.ends_with(SUBTITLE_EXTENSION) {
        ArtifactKind::Subtitle
    } else {
        ArtifactKind::Unsupported
    }
}

/// One of the two inputs a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Video,
    Subtitle,
}

impl Slot {
    /// The slot that completes a session together with this one.
    pub fn other(&self) -> Slot {
        match self {
            Slot::Video => Slot::Subtitle,
            Slot::Subtitle => Slot::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Video => "video",
            Slot::Subtitle => "subtitle",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
