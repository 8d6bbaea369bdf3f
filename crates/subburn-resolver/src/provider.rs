//! Provider detection and link parsing.
//!
//! All functions here are pure; network access lives in [`crate::resolver`].

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Filename used when neither headers nor the URL path name the file.
pub const UNKNOWN_FILENAME: &str = "unknown_file";

static PIXELDRAIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pixeldrain\.com/(u|l)/([a-zA-Z0-9]+)").unwrap());

static DRIVE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:/file/d/|/open\?id=|/uc\?id=)([a-zA-Z0-9_-]{28,})").unwrap());

static DISPOSITION_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^"]+)"?"#).unwrap());

/// Hosting provider a link belongs to, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Pixeldrain,
    GoogleDrive,
    Generic,
}

impl Provider {
    /// Classify a link by case-sensitive substring match.
    pub fn detect(url: &str) -> Self {
        if url.contains("pixeldrain.com") {
            Provider::Pixeldrain
        } else if url.contains("drive.google.com") {
            Provider::GoogleDrive
        } else {
            Provider::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Pixeldrain => "pixeldrain",
            Provider::GoogleDrive => "google_drive",
            Provider::Generic => "generic",
        }
    }

    /// Status line shown while the link is being resolved.
    pub fn resolving_text(&self) -> &'static str {
        match self {
            Provider::Pixeldrain => "⚙️ Pixeldrain link detected. Resolving...",
            Provider::GoogleDrive => "⚙️ Google Drive link detected. Resolving...",
            Provider::Generic => "⚙️ Verifying direct link...",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the Pixeldrain file id from a `/u/<id>` or `/l/<id>` link.
pub fn pixeldrain_id(url: &str) -> Option<&str> {
    PIXELDRAIN_ID
        .captures(url)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Extract the Google Drive file id from `/file/d/`, `open?id=` or `uc?id=` links.
pub fn drive_file_id(url: &str) -> Option<&str> {
    DRIVE_ID.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Extract a filename from a `Content-Disposition` header value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let name = DISPOSITION_FILENAME.captures(header)?.get(1)?.as_str();
    let name = name.trim().trim_matches('"');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Last non-empty path segment of a URL.
pub fn filename_from_url(url: &url::Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
