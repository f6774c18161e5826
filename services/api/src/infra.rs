use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use onboarding_wizard::config::AppConfig;
use onboarding_wizard::workflows::onboarding::{
    FileUploader, LocalFile, MissingDocumentPolicy, Navigator, OnboardingPayload,
    SubmissionAck, SubmissionError, SubmissionService, TransformOptions, UploadError,
    UploadPolicy, UploadedFile, WizardSettings,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wizard defaults derived from configuration; owner and namespace are filled per session.
pub(crate) fn wizard_defaults(config: &AppConfig) -> WizardSettings {
    let missing_documents = match &config.wizard.document_placeholder {
        Some(url) => MissingDocumentPolicy::Placeholder(url.clone()),
        None => MissingDocumentPolicy::Null,
    };

    WizardSettings {
        transform: TransformOptions { missing_documents },
        upload_policy: UploadPolicy::default().with_max_bytes(config.wizard.max_upload_bytes),
        validate_all_family_members: config.wizard.validate_all_family_members,
        ..WizardSettings::for_owner("anonymous")
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Stores uploads under `<root>/<owner>/` and serves them from `public_base`.
#[derive(Debug, Clone)]
pub(crate) struct LocalDirectoryUploader {
    root: PathBuf,
    public_base: String,
}

impl LocalDirectoryUploader {
    pub(crate) fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn file_name(file: &LocalFile) -> String {
        let stem = file
            .name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&file.name);
        let extension = mime_guess::get_mime_extensions_str(&file.content_type)
            .and_then(|extensions| extensions.first())
            .copied()
            .unwrap_or("bin");
        format!(
            "{}-{}.{extension}",
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            sanitize(stem)
        )
    }
}

#[async_trait]
impl FileUploader for LocalDirectoryUploader {
    async fn upload(&self, file: &LocalFile, owner_id: &str) -> Result<UploadedFile, UploadError> {
        let owner = sanitize(owner_id);
        let directory = self.root.join(&owner);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        let name = Self::file_name(file);
        tokio::fs::write(directory.join(&name), &file.bytes)
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        info!(owner = %owner, file = %name, bytes = file.size(), "stored uploaded document");
        Ok(UploadedFile {
            url: format!("{}/{owner}/{name}", self.public_base),
        })
    }
}

#[derive(Serialize)]
struct OutboxEnvelope<'a> {
    reference: &'a str,
    received_at: String,
    payload: &'a OnboardingPayload,
}

/// Writes accepted applications as JSON files for a downstream importer.
#[derive(Debug)]
pub(crate) struct OutboxSubmissionService {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl OutboxSubmissionService {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicU64::new(1),
        }
    }

    fn next_reference(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("ONB-{}-{sequence:04}", Utc::now().format("%Y%m%d%H%M%S"))
    }
}

#[async_trait]
impl SubmissionService for OutboxSubmissionService {
    async fn submit(&self, payload: &OnboardingPayload) -> Result<SubmissionAck, SubmissionError> {
        let reference = self.next_reference();
        let envelope = OutboxEnvelope {
            reference: &reference,
            received_at: Utc::now().to_rfc3339(),
            payload,
        };
        let body = serde_json::to_vec_pretty(&envelope)
            .map_err(|err| SubmissionError::Rejected(err.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        tokio::fs::write(self.dir.join(format!("{reference}.json")), body)
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;

        info!(%reference, "application written to outbox");
        Ok(SubmissionAck {
            reference: Some(reference),
        })
    }
}

/// Keeps uploads in memory; used by the CLI demo.
#[derive(Debug, Default)]
pub(crate) struct InMemoryUploader {
    stored: Mutex<Vec<String>>,
}

impl InMemoryUploader {
    pub(crate) fn stored(&self) -> Vec<String> {
        self.stored.lock().expect("uploader mutex poisoned").clone()
    }
}

#[async_trait]
impl FileUploader for InMemoryUploader {
    async fn upload(&self, file: &LocalFile, owner_id: &str) -> Result<UploadedFile, UploadError> {
        let url = format!("memory://{}/{}", sanitize(owner_id), file.name);
        self.stored
            .lock()
            .map_err(|_| UploadError::Transport("uploader mutex poisoned".to_string()))?
            .push(url.clone());
        Ok(UploadedFile { url })
    }
}

/// Captures submitted payloads; used by the CLI demo.
#[derive(Debug, Default)]
pub(crate) struct InMemorySubmissionService {
    payloads: Mutex<Vec<OnboardingPayload>>,
}

impl InMemorySubmissionService {
    pub(crate) fn payloads(&self) -> Vec<OnboardingPayload> {
        self.payloads.lock().expect("submission mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionService for InMemorySubmissionService {
    async fn submit(&self, payload: &OnboardingPayload) -> Result<SubmissionAck, SubmissionError> {
        let mut payloads = self
            .payloads
            .lock()
            .map_err(|_| SubmissionError::Transport("submission mutex poisoned".to_string()))?;
        payloads.push(payload.clone());
        Ok(SubmissionAck {
            reference: Some(format!("DEMO-{:04}", payloads.len())),
        })
    }
}

/// Logs the post-submission redirect; the HTTP client performs the actual navigation.
#[derive(Debug, Clone)]
pub(crate) struct LoggingNavigator {
    redirect_to: String,
}

impl LoggingNavigator {
    pub(crate) fn new(redirect_to: impl Into<String>) -> Self {
        Self {
            redirect_to: redirect_to.into(),
        }
    }
}

impl Navigator for LoggingNavigator {
    fn redirect(&self) {
        info!(redirect_to = %self.redirect_to, "onboarding complete; redirecting candidate");
    }
}
