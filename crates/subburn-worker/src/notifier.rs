//! Outbound messaging seam.
//!
//! The pipeline never talks to a chat platform directly. Everything the
//! user sees goes through a [`Notifier`]: plain texts, in-place edits of a
//! status message, deletion, and delivery of the rendered file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use subburn_models::UserId;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifyError {
    pub fn delivery_failed(msg: impl Into<String>) -> Self {
        Self::DeliveryFailed(msg.into())
    }
}

/// Reference to a sent message that can later be edited or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat_id: UserId,
    pub message_id: i64,
}

/// Outbound messaging to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, chat_id: UserId, text: &str) -> NotifyResult<MessageHandle>;

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> NotifyResult<()>;

    async fn delete_message(&self, handle: &MessageHandle) -> NotifyResult<()>;

    /// Deliver a local file. The file may be deleted as soon as this returns.
    async fn send_file(&self, chat_id: UserId, path: &Path, caption: &str) -> NotifyResult<()>;
}

/// A single status message that is edited as work advances.
///
/// Failures to send or edit are logged and swallowed; they never change
/// the outcome of the work being reported on.
pub struct StatusMessage {
    notifier: Arc<dyn Notifier>,
    chat_id: UserId,
    handle: Option<MessageHandle>,
}

impl StatusMessage {
    /// Send the initial status text.
    pub async fn open(notifier: Arc<dyn Notifier>, chat_id: UserId, text: &str) -> Self {
        let handle = match notifier.send_text(chat_id, text).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(user_id = %chat_id, "Failed to send status message: {}", e);
                None
            }
        };

        Self {
            notifier,
            chat_id,
            handle,
        }
    }

    /// Replace the status text, sending a fresh message if none exists.
    pub async fn update(&mut self, text: &str) {
        match &self.handle {
            Some(handle) => {
                if let Err(e) = self.notifier.edit_text(handle, text).await {
                    warn!(user_id = %self.chat_id, "Failed to edit status message: {}", e);
                }
            }
            None => match self.notifier.send_text(self.chat_id, text).await {
                Ok(handle) => self.handle = Some(handle),
                Err(e) => warn!(user_id = %self.chat_id, "Failed to send status message: {}", e),
            },
        }
    }

    /// Remove the status message.
    pub async fn delete(self) {
        if let Some(handle) = &self.handle {
            if let Err(e) = self.notifier.delete_message(handle).await {
                warn!(user_id = %self.chat_id, "Failed to delete status message: {}", e);
            }
        }
    }

    pub fn handle(&self) -> Option<&MessageHandle> {
        self.handle.as_ref()
    }
}

/// Notifier that writes every message to the log and copies delivered
/// files into a local directory.
#[derive(Debug)]
pub struct LogNotifier {
    delivery_dir: PathBuf,
    next_id: AtomicI64,
}

impl LogNotifier {
    pub fn new(delivery_dir: impl Into<PathBuf>) -> Self {
        Self {
            delivery_dir: delivery_dir.into(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn delivery_dir(&self) -> &Path {
        &self.delivery_dir
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_text(&self, chat_id: UserId, text: &str) -> NotifyResult<MessageHandle> {
        let message_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(user_id = %chat_id, message_id, "{}", text);
        Ok(MessageHandle {
            chat_id,
            message_id,
        })
    }

    async fn edit_text(&self, handle: &MessageHandle, text: &str) -> NotifyResult<()> {
        info!(user_id = %handle.chat_id, message_id = handle.message_id, "(edit) {}", text);
        Ok(())
    }

    async fn delete_message(&self, handle: &MessageHandle) -> NotifyResult<()> {
        info!(user_id = %handle.chat_id, message_id = handle.message_id, "(deleted)");
        Ok(())
    }

    async fn send_file(&self, chat_id: UserId, path: &Path, caption: &str) -> NotifyResult<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| NotifyError::delivery_failed(format!("not a file: {}", path.display())))?;
        let dest = self.delivery_dir.join(file_name);

        tokio::fs::create_dir_all(&self.delivery_dir).await?;
        let bytes = tokio::fs::copy(path, &dest).await?;

        info!(
            user_id = %chat_id,
            path = %dest.display(),
            bytes,
            "{}", caption
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records texts; every edit fails.
    #[derive(Default)]
    struct FlakyNotifier {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send_text(&self, chat_id: UserId, text: &str) -> NotifyResult<MessageHandle> {
            let mut texts = self.texts.lock().unwrap();
            texts.push(text.to_string());
            Ok(MessageHandle {
                chat_id,
                message_id: texts.len() as i64,
            })
        }

        async fn edit_text(&self, _handle: &MessageHandle, _text: &str) -> NotifyResult<()> {
            Err(NotifyError::MessageNotFound("gone".to_string()))
        }

        async fn delete_message(&self, _handle: &MessageHandle) -> NotifyResult<()> {
            Err(NotifyError::MessageNotFound("gone".to_string()))
        }

        async fn send_file(&self, _chat_id: UserId, _path: &Path, _caption: &str) -> NotifyResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_status_message_swallows_edit_failures() {
        let notifier = Arc::new(FlakyNotifier::default());
        let mut status = StatusMessage::open(notifier.clone(), UserId::new(7), "first").await;

        status.update("second").await;
        assert_eq!(status.handle().map(|h| h.message_id), Some(1));
        status.delete().await;

        assert_eq!(*notifier.texts.lock().unwrap(), vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_log_notifier_copies_delivered_file() {
        let source = TempDir::new().unwrap();
        let delivery = TempDir::new().unwrap();
        let output = source.path().join("7_output.mp4");
        std::fs::write(&output, b"rendered").unwrap();

        let notifier = LogNotifier::new(delivery.path().join("out"));
        notifier.send_file(UserId::new(7), &output, "done").await.unwrap();

        let copied = delivery.path().join("out").join("7_output.mp4");
        assert_eq!(std::fs::read(copied).unwrap(), b"rendered");
    }

    #[tokio::test]
    async fn test_log_notifier_handles_are_unique() {
        let notifier = LogNotifier::new("/tmp");
        let a = notifier.send_text(UserId::new(1), "a").await.unwrap();
        let b = notifier.send_text(UserId::new(1), "b").await.unwrap();
        assert_ne!(a.message_id, b.message_id);
    }
}
