//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use subburn_models::{EncodingConfig, SubtitleStyle};

use crate::error::{MediaError, MediaResult};
use crate::progress::{ProgressStream, ProgressTick};

/// Default number of stderr lines kept for error reporting.
pub const DEFAULT_STDERR_TAIL: usize = 5;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
    /// Target of `-progress`
    progress_target: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
            progress_target: "pipe:1".to_string(),
        }
    }

    /// Command that burns `subtitle` into `input` with the given style and encoding.
    pub fn burn_subtitles(
        input: impl AsRef<Path>,
        subtitle: impl AsRef<Path>,
        output: impl AsRef<Path>,
        style: &SubtitleStyle,
        encoding: &EncodingConfig,
    ) -> Self {
        Self::new(input, output)
            .video_filter(subtitles_filter(subtitle.as_ref(), style))
            .output_args(encoding.to_ffmpeg_args())
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Machine-readable progress on stdout, diagnostics stay on stderr
        args.push("-progress".to_string());
        args.push(self.progress_target.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Build the `subtitles=` filter expression for a subtitle file.
///
/// Values are escaped twice: once for the filter's option parser and once
/// for the filtergraph parser, so paths may contain colons, quotes or backslashes.
pub fn subtitles_filter(subtitle: &Path, style: &SubtitleStyle) -> String {
    escape_graph(&format!(
        "subtitles={}:force_style={}",
        escape_option_value(&subtitle.to_string_lossy()),
        escape_option_value(&style.force_style())
    ))
}

/// Escape characters special inside a filter option value.
fn escape_option_value(value: &str) -> String {
    escape_chars(value, &['\\', ':', '\''])
}

/// Escape characters special to the filtergraph parser.
fn escape_graph(value: &str) -> String {
    escape_chars(value, &['\\', '\'', ',', ';', '[', ']'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Spawns FFmpeg with progress on stdout and a bounded stderr tail.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// FFmpeg executable (name on PATH or absolute path)
    binary: String,
    /// Number of trailing stderr lines kept
    stderr_tail: usize,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            stderr_tail: DEFAULT_STDERR_TAIL,
        }
    }

    /// Use a specific FFmpeg executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set how many trailing stderr lines to keep.
    pub fn with_stderr_tail(mut self, lines: usize) -> Self {
        self.stderr_tail = lines;
        self
    }

    /// Start an FFmpeg command.
    pub fn spawn(&self, cmd: &FfmpegCommand) -> MediaResult<FfmpegProcess> {
        which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound(self.binary.clone()))?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stdout not captured", None, None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr not captured", None, None))?;

        // Drain stderr concurrently so the child never blocks on a full pipe
        let keep = self.stderr_tail;
        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(keep);
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::with_capacity(256);
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("FFmpeg stderr read failed: {}", e);
                        break;
                    }
                }
                if keep == 0 {
                    continue;
                }
                if tail.len() == keep {
                    tail.pop_front();
                }
                let line = String::from_utf8_lossy(&buf);
                tail.push_back(line.trim_end_matches(['\n', '\r']).to_string());
            }
            tail
        });

        Ok(FfmpegProcess {
            child,
            progress: ProgressStream::new(BufReader::new(stdout)),
            stderr_task,
        })
    }
}

/// A running FFmpeg process.
///
/// Pull ticks with [`FfmpegProcess::next_tick`] until it returns `None`,
/// then call [`FfmpegProcess::wait`] for the exit status.
pub struct FfmpegProcess {
    child: Child,
    progress: ProgressStream<BufReader<ChildStdout>>,
    stderr_task: JoinHandle<VecDeque<String>>,
}

impl FfmpegProcess {
    /// Next progress tick; `None` once FFmpeg closes its progress stream.
    pub async fn next_tick(&mut self) -> MediaResult<Option<ProgressTick>> {
        Ok(self.progress.next_tick().await?)
    }

    /// Wait for exit. A non-zero status carries the stderr tail.
    ///
    /// Unread progress output is drained first so FFmpeg never stalls on a
    /// full stdout pipe. If stdout cannot be read the process is killed.
    pub async fn wait(mut self) -> MediaResult<()> {
        if let Err(e) = self.progress.drain().await {
            warn!("FFmpeg progress stream failed, killing process: {}", e);
            if let Err(e) = self.child.start_kill() {
                warn!("Failed to kill FFmpeg: {}", e);
            }
        }

        let status = self.child.wait().await?;

        let tail = match self.stderr_task.await {
            Ok(tail) => tail,
            Err(e) => {
                warn!("FFmpeg stderr reader failed: {}", e);
                VecDeque::new()
            }
        };

        if status.success() {
            Ok(())
        } else {
            let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr),
                status.code(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_subtitles_args() {
        let style = SubtitleStyle::default().with_font_path("/fonts/a.ttf");
        let cmd = FfmpegCommand::burn_subtitles(
            "/w/1_input.mp4",
            "/w/1_input.srt",
            "/w/1_output.mp4",
            &style,
            &EncodingConfig::default(),
        );

        let args = cmd.build_args();
        assert_eq!(&args[..6], &["-y", "-v", "error", "-progress", "pipe:1", "-i"]);
        assert_eq!(args[6], "/w/1_input.mp4");
        assert_eq!(args[7], "-vf");
        assert_eq!(
            args[8],
            r"subtitles=/w/1_input.srt:force_style=FontFile=/fonts/a.ttf\,FontSize=20\,MarginV=40"
        );
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx265"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "28"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "veryfast"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "128k"]));
        assert_eq!(args.last().unwrap(), "/w/1_output.mp4");
    }

    #[test]
    fn test_option_value_escaping() {
        assert_eq!(escape_option_value("plain/path.srt"), "plain/path.srt");
        assert_eq!(escape_option_value(r"C:\subs\a'b.srt"), r"C\:\\subs\\a\'b.srt");
    }

    #[test]
    fn test_font_path_with_special_characters() {
        let style = SubtitleStyle::default().with_font_path("/fonts/my:font's,1.ttf");
        let filter = subtitles_filter(Path::new("/w/[1] a.srt"), &style);

        assert_eq!(
            filter,
            r"subtitles=/w/\[1\] a.srt:force_style=FontFile=/fonts/my\\:font\\\'s\,1.ttf\,FontSize=20\,MarginV=40"
        );
    }

    #[test]
    fn test_log_level_override() {
        let args = FfmpegCommand::new("in.mp4", "out.mp4")
            .log_level("warning")
            .build_args();
        assert!(args.windows(2).any(|w| w == ["-v", "warning"]));
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_output_does_not_stall() {
        let dir = tempfile::tempdir().unwrap();
        // Enough progress after the bad byte to overflow a pipe nobody reads
        let binary = fake_ffmpeg(
            dir.path(),
            r#"printf 'out_time_ms=1000000\n\377\n'
printf 'bad \377 line\n' >&2
i=0
while [ $i -lt 20000 ]; do printf 'frame=%d\nprogress=continue\n' $i; i=$((i+1)); done
printf 'last line\n' >&2
exit 3"#,
        );
        let runner = FfmpegRunner::new().with_binary(binary);
        let mut process = runner
            .spawn(&FfmpegCommand::new("in.mp4", "out.mp4"))
            .unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(20), async {
            let first = process.next_tick().await.unwrap();
            assert_eq!(first.map(|t| t.elapsed_us), Some(1_000_000));
            process.wait().await
        })
        .await
        .expect("ffmpeg run stalled");

        match result {
            Err(MediaError::FfmpegFailed { stderr, exit_code, .. }) => {
                assert_eq!(exit_code, Some(3));
                let stderr = stderr.unwrap();
                assert!(stderr.contains("bad \u{FFFD} line"));
                assert!(stderr.ends_with("last line"));
            }
            other => panic!("expected FfmpegFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let runner = FfmpegRunner::new().with_binary("/nonexistent/ffmpeg-subburn");
        let result = runner.spawn(&FfmpegCommand::new("in.mp4", "out.mp4"));
        assert!(matches!(result, Err(MediaError::FfmpegNotFound(_))));
    }
}
