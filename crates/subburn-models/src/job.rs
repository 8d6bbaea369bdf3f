//! Transcode job definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{FileLocation, Session, UserId};

/// Deterministic local paths for one user's transcode.
///
/// Keyed by user id so concurrent jobs for different users never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPaths {
    pub video: PathBuf,
    pub subtitle: PathBuf,
    pub output: PathBuf,
}

impl JobPaths {
    /// Derive the paths for a user inside a work directory.
    pub fn for_user(work_dir: impl AsRef<Path>, user_id: UserId) -> Self {
        let work_dir = work_dir.as_ref();
        Self {
            video: work_dir.join(format!("{}_input.mp4", user_id)),
            subtitle: work_dir.join(format!("{}_input.srt", user_id)),
            output: work_dir.join(format!("{}_output.mp4", user_id)),
        }
    }

    /// All paths, inputs first.
    pub fn all(&self) -> [&Path; 3] {
        [&self.video, &self.subtitle, &self.output]
    }
}

/// A completed session bound to local paths for one transcode run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub user_id: UserId,
    pub video: FileLocation,
    pub subtitle: FileLocation,
    pub paths: JobPaths,
}

impl TranscodeJob {
    /// Build a job from a session. Returns `None` unless both slots are filled.
    pub fn from_session(session: Session, work_dir: impl AsRef<Path>) -> Option<Self> {
        let Session {
            user_id,
            video,
            subtitle,
        } = session;

        Some(Self {
            user_id,
            video: video?,
            subtitle: subtitle?,
            paths: JobPaths::for_user(work_dir, user_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Slot;

    #[test]
    fn test_paths_are_keyed_by_user() {
        let paths = JobPaths::for_user("/tmp/work", UserId(42));
        assert_eq!(paths.video, PathBuf::from("/tmp/work/42_input.mp4"));
        assert_eq!(paths.subtitle, PathBuf::from("/tmp/work/42_input.srt"));
        assert_eq!(paths.output, PathBuf::from("/tmp/work/42_output.mp4"));

        let other = JobPaths::for_user("/tmp/work", UserId(43));
        assert_ne!(paths, other);
    }

    #[test]
    fn test_job_requires_complete_session() {
        let mut session = Session::new(UserId(1));
        session.set(Slot::Video, FileLocation::new("https://x/v", "v.mp4"));
        assert!(TranscodeJob::from_session(session.clone(), "/tmp").is_none());

        session.set(Slot::Subtitle, FileLocation::new("https://x/s", "s.srt"));
        let job = TranscodeJob::from_session(session, "/tmp").unwrap();
        assert_eq!(job.user_id, UserId(1));
        assert_eq!(job.subtitle.filename, "s.srt");
    }
}
