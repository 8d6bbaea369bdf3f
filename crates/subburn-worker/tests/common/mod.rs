//! Shared fixtures: a recording notifier, fake FFmpeg/FFprobe scripts and
//! a controller wired to a mock HTTP server.

#![allow(dead_code)]

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

use subburn_models::UserId;
use subburn_worker::{
    IngestionController, MessageHandle, Notifier, NotifyError, NotifyResult, WorkerConfig,
};

/// Everything the pipeline told the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { id: i64, text: String },
    Edit { id: i64, text: String },
    Delete { id: i64 },
    File { path: PathBuf, caption: String, existed: bool },
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_edits: bool,
    fail_files: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_edits() -> Arc<Self> {
        Arc::new(Self {
            fail_edits: true,
            ..Self::default()
        })
    }

    pub fn failing_files() -> Arc<Self> {
        Arc::new(Self {
            fail_files: true,
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts and edits in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } | Sent::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    /// Percentages from progress edits, in order.
    pub fn progress(&self) -> Vec<u8> {
        self.texts()
            .iter()
            .filter(|t| t.starts_with("⚙️ Processing:"))
            .filter_map(|t| t.rsplit(' ').next())
            .filter_map(|p| p.trim_end_matches('%').parse().ok())
            .collect()
    }

    pub fn files(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::File { .. }))
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, chat_id: UserId, text: &str) -> NotifyResult<MessageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Sent::Text {
            id,
            text: text.to_string(),
        });
        Ok(MessageHandle {
            chat_id,
            message_id: id,
        })
    }

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> NotifyResult<()> {
        if self.fail_edits {
            return Err(NotifyError::MessageNotFound(handle.message_id.to_string()));
        }
        self.record(Sent::Edit {
            id: handle.message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, handle: &MessageHandle) -> NotifyResult<()> {
        self.record(Sent::Delete {
            id: handle.message_id,
        });
        Ok(())
    }

    async fn send_file(&self, _chat_id: UserId, path: &Path, caption: &str) -> NotifyResult<()> {
        if self.fail_files {
            return Err(NotifyError::delivery_failed("upload rejected"));
        }
        self.record(Sent::File {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.is_file(),
        });
        Ok(())
    }
}

/// How the fake FFmpeg behaves.
#[derive(Debug, Clone, Copy)]
pub enum FfmpegScript {
    /// Reports progress over a 10 second video and writes the output
    Succeeds,
    /// Prints seven numbered error lines and exits 1
    ExitsWithError,
    /// Mixes invalid UTF-8 into both streams, floods stdout, then succeeds
    GarbledOutput,
}

/// Fake media tools written to a temp dir.
pub struct FakeTools {
    dir: TempDir,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    calls: PathBuf,
}

impl FakeTools {
    pub fn new(ffmpeg: FfmpegScript, probe_output: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let calls = dir.path().join("ffmpeg_calls.log");

        let ffmpeg_body = match ffmpeg {
            FfmpegScript::Succeeds => format!(
                "#!/bin/sh\n\
                 echo \"$@\" >> '{calls}'\n\
                 for last; do :; done\n\
                 printf 'frame=1\\nout_time_ms=0\\nprogress=continue\\nout_time_ms=2600000\\nout_time_ms=5000000\\nout_time_ms=5100000\\nout_time_ms=N/A\\nout_time_ms=10000000\\nprogress=end\\n'\n\
                 printf 'rendered' > \"$last\"\n\
                 exit 0\n",
                calls = calls.display()
            ),
            FfmpegScript::ExitsWithError => format!(
                "#!/bin/sh\n\
                 echo \"$@\" >> '{calls}'\n\
                 i=1\n\
                 while [ $i -le 7 ]; do echo \"ffmpeg error line $i\" >&2; i=$((i+1)); done\n\
                 exit 1\n",
                calls = calls.display()
            ),
            FfmpegScript::GarbledOutput => format!(
                "#!/bin/sh\n\
                 echo \"$@\" >> '{calls}'\n\
                 for last; do :; done\n\
                 printf 'out_time_ms=0\\n\\377\\376\\nout_time_ms=5000000\\n'\n\
                 printf 'warning \\377\\n' >&2\n\
                 i=0\n\
                 while [ $i -lt 20000 ]; do printf 'frame=%d\\nprogress=continue\\n' $i; i=$((i+1)); done\n\
                 printf 'rendered' > \"$last\"\n\
                 exit 0\n",
                calls = calls.display()
            ),
        };
        let ffprobe_body = format!("#!/bin/sh\necho '{}'\n", probe_output);

        let ffmpeg = write_script(dir.path(), "ffmpeg", &ffmpeg_body);
        let ffprobe = write_script(dir.path(), "ffprobe", &ffprobe_body);

        Self {
            dir,
            ffmpeg,
            ffprobe,
            calls,
        }
    }

    /// Number of times FFmpeg was started.
    pub fn ffmpeg_calls(&self) -> usize {
        std::fs::read_to_string(&self.calls)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A controller wired to a mock server and fake tools.
pub struct Harness {
    pub server: MockServer,
    pub work_dir: TempDir,
    pub tools: FakeTools,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: IngestionController,
}

impl Harness {
    pub async fn new(ffmpeg: FfmpegScript, probe_output: &str) -> Self {
        Self::with_notifier(ffmpeg, probe_output, RecordingNotifier::new()).await
    }

    pub async fn with_notifier(
        ffmpeg: FfmpegScript,
        probe_output: &str,
        notifier: Arc<RecordingNotifier>,
    ) -> Self {
        let server = MockServer::start().await;
        let work_dir = TempDir::new().unwrap();
        let tools = FakeTools::new(ffmpeg, probe_output);

        let config = WorkerConfig {
            work_dir: work_dir.path().to_path_buf(),
            ffmpeg_bin: tools.ffmpeg.display().to_string(),
            ffprobe_bin: tools.ffprobe.display().to_string(),
            font_path: "/fonts/test.ttf".to_string(),
            download_timeout: Duration::from_secs(5),
            resolve_timeout: Duration::from_secs(5),
            pixeldrain_timeout: Duration::from_secs(5),
            pixeldrain_api_base: format!("{}/api", server.uri()),
            drive_base: server.uri(),
            ..WorkerConfig::default()
        };

        let controller = IngestionController::new(&config, notifier.clone()).unwrap();

        Self {
            server,
            work_dir,
            tools,
            notifier,
            controller,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Files left in the work directory.
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect()
    }
}
