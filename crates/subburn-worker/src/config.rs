//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use subburn_models::encoding::DEFAULT_FONT_PATH;
use subburn_models::{EncodingConfig, SubtitleStyle};
use subburn_resolver::ResolverConfig;

/// Largest direct upload the transport lets us fetch.
pub const MAX_DIRECT_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for downloaded inputs and rendered output
    pub work_dir: PathBuf,
    /// FFmpeg executable
    pub ffmpeg_bin: String,
    /// FFprobe executable
    pub ffprobe_bin: String,
    /// Font file used for burned-in subtitles
    pub font_path: String,
    /// Direct uploads above this size are refused
    pub max_upload_bytes: u64,
    /// Bound on each network wait while downloading
    pub download_timeout: Duration,
    /// Timeout for Drive and generic link resolution
    pub resolve_timeout: Duration,
    /// Timeout for the Pixeldrain info call
    pub pixeldrain_timeout: Duration,
    /// Pixeldrain API base URL
    pub pixeldrain_api_base: String,
    /// Google Drive base URL
    pub drive_base: String,
    /// Number of FFmpeg stderr lines surfaced on failure
    pub stderr_tail_lines: usize,
    /// Progress is reported in multiples of this percentage
    pub progress_step: u8,
    /// Prometheus listen address; metrics are disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let resolver = ResolverConfig::default();
        Self {
            work_dir: PathBuf::from("/tmp/subburn"),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            font_path: DEFAULT_FONT_PATH.to_string(),
            max_upload_bytes: MAX_DIRECT_UPLOAD_BYTES,
            download_timeout: Duration::from_secs(60),
            resolve_timeout: resolver.head_timeout,
            pixeldrain_timeout: resolver.pixeldrain_timeout,
            pixeldrain_api_base: resolver.pixeldrain_api_base,
            drive_base: resolver.drive_base,
            stderr_tail_lines: 5,
            progress_step: 5,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("SUBBURN_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_bin: std::env::var("SUBBURN_FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("SUBBURN_FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            font_path: std::env::var("SUBBURN_FONT_PATH").unwrap_or(defaults.font_path),
            max_upload_bytes: std::env::var("SUBBURN_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            download_timeout: Duration::from_secs(
                std::env::var("SUBBURN_DOWNLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            resolve_timeout: Duration::from_secs(
                std::env::var("SUBBURN_RESOLVE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            pixeldrain_timeout: Duration::from_secs(
                std::env::var("SUBBURN_PIXELDRAIN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            pixeldrain_api_base: std::env::var("SUBBURN_PIXELDRAIN_API_BASE")
                .unwrap_or(defaults.pixeldrain_api_base),
            drive_base: std::env::var("SUBBURN_DRIVE_BASE").unwrap_or(defaults.drive_base),
            stderr_tail_lines: std::env::var("SUBBURN_STDERR_TAIL_LINES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stderr_tail_lines),
            progress_step: std::env::var("SUBBURN_PROGRESS_STEP")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|step| *step > 0)
                .unwrap_or(defaults.progress_step),
            metrics_addr: std::env::var("SUBBURN_METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Resolver settings derived from this config.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_bases(&self.pixeldrain_api_base, &self.drive_base)
            .with_request_timeout(self.resolve_timeout)
            .with_pixeldrain_timeout(self.pixeldrain_timeout)
    }

    pub fn subtitle_style(&self) -> SubtitleStyle {
        SubtitleStyle::default().with_font_path(&self.font_path)
    }

    pub fn encoding(&self) -> EncodingConfig {
        EncodingConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/subburn"));
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.download_timeout, Duration::from_secs(60));
        assert_eq!(config.resolve_timeout, Duration::from_secs(15));
        assert_eq!(config.pixeldrain_timeout, Duration::from_secs(10));
        assert_eq!(config.stderr_tail_lines, 5);
        assert_eq!(config.progress_step, 5);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_resolver_config_follows_worker_config() {
        let config = WorkerConfig {
            pixeldrain_api_base: "http://127.0.0.1:9000/api/".to_string(),
            drive_base: "http://127.0.0.1:9000".to_string(),
            resolve_timeout: Duration::from_secs(3),
            pixeldrain_timeout: Duration::from_secs(2),
            ..WorkerConfig::default()
        };

        let resolver = config.resolver_config();
        assert_eq!(resolver.pixeldrain_api_base, "http://127.0.0.1:9000/api");
        assert_eq!(resolver.drive_base, "http://127.0.0.1:9000");
        assert_eq!(resolver.head_timeout, Duration::from_secs(3));
        assert_eq!(resolver.drive_timeout, Duration::from_secs(3));
        assert_eq!(resolver.pixeldrain_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_subtitle_style_uses_font_path() {
        let config = WorkerConfig {
            font_path: "/fonts/custom.ttf".to_string(),
            ..WorkerConfig::default()
        };
        assert!(config.subtitle_style().force_style().starts_with("FontFile=/fonts/custom.ttf,"));
    }
}
