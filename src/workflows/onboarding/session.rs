use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::warn;

use super::collaborators::{
    FileUploader, Navigator, Notifier, SubmissionAck, SubmissionError, SubmissionService,
    UploadError,
};
use super::controller::{SubmitError, WizardController};
use super::domain::DocumentSlot;
use super::persistence::PersistenceStore;
use super::uploads::{LocalFile, PendingUpload, UploadCompletion, UploadRejected, UploadResolution};

/// A controller shared between request handlers and background uploads.
///
/// The lock is never held across a call into an external service, so edits and
/// navigation keep working while an upload or submission is in flight. Service
/// calls run on their own tasks: a caller that goes away (a dropped HTTP
/// request) does not strand the slot in `Uploading` or the submission flag.
pub struct WizardSession<S, N> {
    controller: Mutex<WizardController<S, N>>,
    uploader: Arc<dyn FileUploader>,
    submitter: Arc<dyn SubmissionService>,
    navigator: Arc<dyn Navigator>,
}

impl<S, N> WizardSession<S, N>
where
    S: PersistenceStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        controller: WizardController<S, N>,
        uploader: Arc<dyn FileUploader>,
        submitter: Arc<dyn SubmissionService>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            controller: Mutex::new(controller),
            uploader,
            submitter,
            navigator,
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, WizardController<S, N>> {
        self.controller.lock().await
    }

    /// Uploads and waits for the slot to settle.
    pub async fn upload_document(
        self: &Arc<Self>,
        slot: DocumentSlot,
        file: LocalFile,
    ) -> Result<UploadResolution, UploadRejected> {
        let pending = self.start_upload(slot, file).await?;
        let ticket = pending.ticket().clone();

        match self.dispatch_upload(pending).await {
            Ok(resolution) => Ok(resolution),
            Err(err) => {
                warn!(slot = slot.key(), error = %err, "upload task ended without a result");
                let completion = UploadCompletion {
                    ticket,
                    outcome: Err(UploadError::Transport(format!("upload interrupted: {err}"))),
                };
                Ok(self.controller.lock().await.complete_upload(completion))
            }
        }
    }

    /// Shows the preview now and finishes the upload in the background.
    pub async fn spawn_upload(
        self: &Arc<Self>,
        slot: DocumentSlot,
        file: LocalFile,
    ) -> Result<JoinHandle<UploadResolution>, UploadRejected> {
        let pending = self.start_upload(slot, file).await?;
        Ok(self.dispatch_upload(pending))
    }

    /// Validates and transforms under the lock, then hands the payload to the backend.
    pub async fn submit(self: &Arc<Self>) -> Result<SubmissionAck, SubmitError> {
        let payload = self.controller.lock().await.prepare_submission()?;

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = session.submitter.submit(&payload).await;
            session
                .controller
                .lock()
                .await
                .finish_submission(outcome, session.navigator.as_ref())
        });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "submission task ended without an outcome");
                let outcome = Err(SubmissionError::Transport(format!(
                    "submission interrupted: {err}"
                )));
                self.controller
                    .lock()
                    .await
                    .finish_submission(outcome, self.navigator.as_ref())
            }
        }
    }

    async fn start_upload(
        &self,
        slot: DocumentSlot,
        file: LocalFile,
    ) -> Result<PendingUpload, UploadRejected> {
        let mut controller = self.controller.lock().await;
        let pending = controller.select_document(slot, file)?;
        controller.begin_upload(pending.ticket());
        Ok(pending)
    }

    fn dispatch_upload(self: &Arc<Self>, pending: PendingUpload) -> JoinHandle<UploadResolution> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let completion = pending.dispatch(session.uploader.as_ref()).await;
            session.controller.lock().await.complete_upload(completion)
        })
    }
}
