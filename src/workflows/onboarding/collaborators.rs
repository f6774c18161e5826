use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::transform::OnboardingPayload;
use super::uploads::LocalFile;

/// Severity attached to every candidate-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

/// Fire-and-forget sink for validation, upload, and submission feedback.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// Buffers notifications until a caller drains them (HTTP responses, tests).
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.snapshot()
            .iter()
            .filter(|notification| notification.kind == kind)
            .count()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Error => tracing::debug!(%message, "error notification queued"),
            NotificationKind::Success | NotificationKind::Info => {
                tracing::debug!(?kind, %message, "notification queued")
            }
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Notification {
                message: message.to_string(),
                kind,
            });
        }
    }
}

/// Durable location returned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("storage transport unavailable: {0}")]
    Transport(String),
    #[error("storage rejected the file: {0}")]
    Rejected(String),
}

/// External file storage. Retries are the caller's decision.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, file: &LocalFile, owner_id: &str) -> Result<UploadedFile, UploadError>;
}

/// Acknowledgement returned by the backend after accepting an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission transport unavailable: {0}")]
    Transport(String),
    #[error("backend rejected the application: {0}")]
    Rejected(String),
}

/// Backend endpoint receiving the transformed application.
#[async_trait]
pub trait SubmissionService: Send + Sync {
    async fn submit(&self, payload: &OnboardingPayload) -> Result<SubmissionAck, SubmissionError>;
}

/// Moves the candidate out of the wizard once the application is accepted.
pub trait Navigator: Send + Sync {
    fn redirect(&self);
}
