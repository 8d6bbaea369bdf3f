//! FFmpeg progress parsing.
//!
//! FFmpeg's `-progress pipe:1` output is a sequence of `key=value` lines.
//! Only `out_time_ms` is consumed; every other key, and any malformed line,
//! is ignored. Despite its name, `out_time_ms` carries microseconds.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Number of segments in the progress gauge.
pub const GAUGE_SEGMENTS: u8 = 10;

/// Default reporting granularity in percent.
pub const DEFAULT_PROGRESS_STEP: u8 = 5;

const FILLED: char = '█';
const EMPTY: char = '░';

/// One elapsed-time observation from FFmpeg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTick {
    /// Output time encoded so far, in microseconds
    pub elapsed_us: i64,
}

impl ProgressTick {
    /// Percentage of `total_secs` encoded so far, floored and clamped to 0..=100.
    pub fn percent(&self, total_secs: f64) -> u8 {
        if total_secs.is_nan() || total_secs <= 0.0 {
            return 0;
        }
        let pct = (self.elapsed_us as f64 / 1_000_000.0 / total_secs) * 100.0;
        pct.floor().clamp(0.0, 100.0) as u8
    }
}

/// Parse a single progress line.
pub fn parse_progress_line(line: &str) -> Option<ProgressTick> {
    let (key, value) = line.trim().split_once('=')?;
    match key.trim() {
        "out_time_ms" => value
            .trim()
            .parse::<i64>()
            .ok()
            .map(|elapsed_us| ProgressTick { elapsed_us }),
        _ => None,
    }
}

/// Lazy sequence of progress ticks read from FFmpeg's progress stream.
///
/// Ends when the underlying reader reaches EOF (process exit). Lines that
/// are not valid UTF-8 are decoded lossily and never end the stream.
pub struct ProgressStream<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> ProgressStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(128),
        }
    }

    /// Next tick, or `None` once the stream is exhausted.
    pub async fn next_tick(&mut self) -> std::io::Result<Option<ProgressTick>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            if let Some(tick) = parse_progress_line(&String::from_utf8_lossy(&self.buf)) {
                return Ok(Some(tick));
            }
        }
    }

    /// Read and discard everything up to EOF.
    pub async fn drain(&mut self) -> std::io::Result<u64> {
        tokio::io::copy_buf(&mut self.reader, &mut tokio::io::sink()).await
    }
}

/// Decides which percentages are worth telling the user about.
///
/// A value passes only if it is strictly greater than the last one that
/// passed and is a multiple of `step`.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: u8,
    last: Option<u8>,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_STEP)
    }
}

impl ProgressThrottle {
    pub fn new(step: u8) -> Self {
        Self {
            step: step.max(1),
            last: None,
        }
    }

    /// Returns `Some(percent)` when the value should be reported.
    pub fn observe(&mut self, percent: u8) -> Option<u8> {
        let advanced = self.last.map_or(true, |last| percent > last);
        if advanced && percent % self.step == 0 {
            self.last = Some(percent);
            Some(percent)
        } else {
            None
        }
    }

    /// Last reported percentage.
    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// Render a fixed-width block gauge, e.g. `[████░░░░░░] 45%`.
pub fn render_gauge(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = (percent / (100 / GAUGE_SEGMENTS)) as usize;
    let empty = GAUGE_SEGMENTS as usize - filled;

    let mut bar = String::with_capacity(GAUGE_SEGMENTS as usize * 3);
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(empty));

    format!("[{}] {}%", bar, percent)
}
