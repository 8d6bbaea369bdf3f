//! FFprobe duration probing.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Probe a media file's duration in seconds with a specific FFprobe executable.
///
/// Fails with [`MediaError::InvalidVideo`] if the reported duration is
/// missing, unparsable, or not positive.
pub async fn probe_duration_with(binary: &str, path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which(binary).map_err(|_| MediaError::FfprobeNotFound(binary.to_string()))?;

    let output = Command::new(binary)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Parse FFprobe's bare duration output (e.g. `"12.345000\n"`).
fn parse_duration(stdout: &str) -> MediaResult<f64> {
    let raw = stdout.trim();
    let duration: f64 = raw
        .parse()
        .map_err(|_| MediaError::InvalidVideo(format!("unreadable duration: {:?}", raw)))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidVideo(format!(
            "non-positive duration: {}",
            duration
        )));
    }

    Ok(duration)
}
