//! Transcode encoding configuration.

use serde::{Deserialize, Serialize};

/// Default video codec (HEVC)
pub const DEFAULT_VIDEO_CODEC: &str = "libx265";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 28;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Default font file used for burned-in subtitles.
pub const DEFAULT_FONT_PATH: &str = "./fonts/HelveticaRounded-Bold.ttf";
/// Default subtitle font size.
pub const DEFAULT_FONT_SIZE: u32 = 20;
/// Default subtitle bottom margin.
pub const DEFAULT_MARGIN_V: u32 = 40;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx265")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

impl EncodingConfig {
    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}

/// Styling applied to burned-in subtitles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    /// Font file handed to libass via `FontFile=`
    pub font_path: String,
    /// Font size in libass units
    pub font_size: u32,
    /// Vertical margin from the bottom edge
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_path: DEFAULT_FONT_PATH.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            margin_v: DEFAULT_MARGIN_V,
        }
    }
}

impl SubtitleStyle {
    /// Use a different font file.
    pub fn with_font_path(mut self, font_path: impl Into<String>) -> Self {
        self.font_path = font_path.into();
        self
    }

    /// Render the `force_style` value for the `subtitles` filter.
    pub fn force_style(&self) -> String {
        format!(
            "FontFile={},FontSize={},MarginV={}",
            self.font_path, self.font_size, self.margin_v
        )
    }
}
