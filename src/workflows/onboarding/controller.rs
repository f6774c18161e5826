use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use super::collaborators::{
    FileUploader, Navigator, NotificationKind, Notifier, SubmissionAck, SubmissionError,
    SubmissionService,
};
use super::domain::{
    About, DocumentSlot, DocumentState, Draft, FamilyMember, Identification, PersonalDetails,
    Qualification, Reference, WizardStep, WorkExperience, MAX_FAMILY_MEMBERS, MIN_FAMILY_MEMBERS,
};
use super::persistence::{
    DraftPersistence, PersistenceError, PersistenceStore, DEFAULT_NAMESPACE,
};
use super::sections::{section_for, validate_draft, ValidationContext, ValidationReport};
use super::transform::{to_backend, OnboardingPayload, TransformError, TransformOptions};
use super::uploads::{
    LocalFile, PendingUpload, UploadCompletion, UploadCoordinator, UploadPolicy, UploadRejected,
    UploadResolution, UploadTicket,
};
use super::validators::normalize_pan;

/// Per-session knobs supplied by the host.
#[derive(Debug, Clone)]
pub struct WizardSettings {
    /// Candidate identifier passed to the upload service.
    pub owner_id: String,
    /// Persistence key prefix for this session.
    pub namespace: String,
    pub transform: TransformOptions,
    pub upload_policy: UploadPolicy,
    pub validate_all_family_members: bool,
}

impl WizardSettings {
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        Self {
            namespace: format!("{DEFAULT_NAMESPACE}.{owner_id}"),
            owner_id,
            transform: TransformOptions::default(),
            upload_policy: UploadPolicy::default(),
            validate_all_family_members: false,
        }
    }
}

/// Result of a navigation request. The view scrolls to the top when asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: WizardStep,
    pub to: WizardStep,
    pub accepted: bool,
    pub scroll_to_top: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("the final step submits the application instead of advancing")]
    SubmitRequired,
    #[error("cannot skip ahead from step {} to step {}", .from.number(), .to.number())]
    ForwardJump { from: WizardStep, to: WizardStep },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftEditError {
    #[error("at most {max} family members can be listed")]
    FamilyMembersFull { max: usize },
    #[error("at least {min} family members are required")]
    FamilyMembersMinimum { min: usize },
    #[error("no entry at position {index}")]
    NoSuchEntry { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("submission is only available on the final step (currently step {})", .step.number())]
    NotOnFinalStep { step: WizardStep },
    #[error("a submission is already in progress")]
    AlreadySubmitting,
    #[error("{} section(s) failed validation", .reports.len())]
    Invalid { reports: Vec<ValidationReport> },
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Service(#[from] SubmissionError),
}

/// Owns the draft and the current step; every change goes through here.
pub struct WizardController<S, N> {
    settings: WizardSettings,
    persistence: DraftPersistence<S>,
    notifier: Arc<N>,
    draft: Draft,
    step: WizardStep,
    errors: BTreeMap<WizardStep, ValidationReport>,
    submitting: bool,
    uploads: UploadCoordinator,
    today: Option<NaiveDate>,
}

impl<S, N> WizardController<S, N>
where
    S: PersistenceStore,
    N: Notifier,
{
    /// Restores the saved draft for this session, or starts a new one.
    pub fn rehydrate(store: Arc<S>, notifier: Arc<N>, settings: WizardSettings) -> Self {
        let persistence = DraftPersistence::new(store, &settings.namespace);

        let (draft, step) = match persistence.load() {
            Ok(Some(snapshot)) => {
                info!(
                    owner = %settings.owner_id,
                    step = snapshot.step.number(),
                    "resuming saved draft"
                );
                (snapshot.draft, snapshot.step)
            }
            Ok(None) => (Draft::default(), WizardStep::FIRST),
            Err(err) => {
                warn!(
                    owner = %settings.owner_id,
                    error = %err,
                    "saved draft could not be restored"
                );
                if matches!(
                    err,
                    PersistenceError::CorruptDraft(_) | PersistenceError::CorruptStep(_)
                ) {
                    if let Err(clear_err) = persistence.clear() {
                        warn!(error = %clear_err, "failed to discard unreadable draft");
                    }
                }
                notifier.notify(
                    "Your saved progress could not be restored, so a new application was started.",
                    NotificationKind::Info,
                );
                (Draft::default(), WizardStep::FIRST)
            }
        };

        let uploads = UploadCoordinator::new(settings.upload_policy.clone());

        Self {
            settings,
            persistence,
            notifier,
            draft,
            step,
            errors: BTreeMap::new(),
            submitting: false,
            uploads,
            today: None,
        }
    }

    /// Pins the date used by date-of-birth checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn errors(&self, step: WizardStep) -> Option<&ValidationReport> {
        self.errors.get(&step)
    }

    pub fn all_errors(&self) -> impl Iterator<Item = &ValidationReport> {
        self.errors.values()
    }

    pub fn document(&self, slot: DocumentSlot) -> &DocumentState {
        self.draft.identification.documents.get(slot)
    }

    pub fn validation_context(&self) -> ValidationContext {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        ValidationContext::new(today)
            .with_all_family_members(self.settings.validate_all_family_members)
    }

    // Draft updates

    pub fn update_personal_details(&mut self, edit: impl FnOnce(&mut PersonalDetails)) {
        edit(&mut self.draft.personal_details);
        self.persist();
    }

    pub fn update_qualification(&mut self, edit: impl FnOnce(&mut Qualification)) {
        edit(&mut self.draft.qualification);
        self.persist();
    }

    pub fn update_about(&mut self, edit: impl FnOnce(&mut About)) {
        edit(&mut self.draft.about);
        self.persist();
    }

    /// The list is re-padded to the minimum afterwards.
    pub fn update_references(&mut self, edit: impl FnOnce(&mut Vec<Reference>)) {
        edit(self.draft.references.entries_mut());
        self.draft.references.normalize();
        self.persist();
    }

    /// Document slots are owned by the upload operations and are left untouched.
    pub fn update_identification(&mut self, edit: impl FnOnce(&mut Identification)) {
        let documents = self.draft.identification.documents.clone();
        edit(&mut self.draft.identification);
        let identification = &mut self.draft.identification;
        identification.documents = documents;
        identification.pan_number = normalize_pan(&identification.pan_number);
        self.persist();
    }

    pub fn set_permanent_same_as_current(&mut self, same: bool) {
        let personal = &mut self.draft.personal_details;
        personal.permanent_same_as_current = same;
        if same {
            personal.permanent_address = personal.current_address.clone();
        }
        self.persist();
    }

    pub fn toggle_language(&mut self, language: &str) -> bool {
        let selected = self.draft.personal_details.languages.toggle(language);
        self.persist();
        selected
    }

    pub fn toggle_interest(&mut self, interest: &str) -> bool {
        let selected = self.draft.about.interests.toggle(interest);
        self.persist();
        selected
    }

    pub fn add_work_experience(&mut self) -> usize {
        let entries = &mut self.draft.qualification.work_experience;
        entries.push(WorkExperience::default());
        let index = entries.len() - 1;
        self.persist();
        index
    }

    pub fn remove_work_experience(
        &mut self,
        index: usize,
    ) -> Result<WorkExperience, DraftEditError> {
        let entries = &mut self.draft.qualification.work_experience;
        if index >= entries.len() {
            return Err(DraftEditError::NoSuchEntry { index });
        }
        let removed = entries.remove(index);
        self.persist();
        Ok(removed)
    }

    pub fn add_family_member(&mut self) -> Result<usize, DraftEditError> {
        let members = &mut self.draft.identification.family_members;
        if members.len() >= MAX_FAMILY_MEMBERS {
            return Err(DraftEditError::FamilyMembersFull {
                max: MAX_FAMILY_MEMBERS,
            });
        }
        members.push(FamilyMember::default());
        let index = members.len() - 1;
        self.persist();
        Ok(index)
    }

    pub fn remove_family_member(&mut self, index: usize) -> Result<FamilyMember, DraftEditError> {
        let members = &mut self.draft.identification.family_members;
        if index >= members.len() {
            return Err(DraftEditError::NoSuchEntry { index });
        }
        if members.len() <= MIN_FAMILY_MEMBERS {
            return Err(DraftEditError::FamilyMembersMinimum {
                min: MIN_FAMILY_MEMBERS,
            });
        }
        let removed = members.remove(index);
        self.persist();
        Ok(removed)
    }

    // Validation and navigation

    /// Validates one section, replacing its previous errors and notifying once per failure.
    pub fn validate_form(&mut self, step: WizardStep) -> bool {
        let ctx = self.validation_context();
        let report = section_for(&self.draft, step).validate(&ctx);

        if let Some(message) = report.list_message() {
            self.notifier.notify(&message, NotificationKind::Error);
        }
        for message in report.field_messages() {
            self.notifier.notify(&message, NotificationKind::Error);
        }

        let valid = report.is_valid();
        self.errors.insert(step, report);
        valid
    }

    pub fn next(&mut self) -> Result<Transition, NavigationError> {
        let from = self.step;
        let target = from.next().ok_or(NavigationError::SubmitRequired)?;

        if !self.validate_form(from) {
            info!(step = from.number(), "step blocked by validation");
            return Ok(Transition {
                from,
                to: from,
                accepted: false,
                scroll_to_top: true,
            });
        }

        self.step = target;
        self.persist();
        info!(from = from.number(), to = target.number(), "advanced wizard step");
        Ok(Transition {
            from,
            to: target,
            accepted: true,
            scroll_to_top: true,
        })
    }

    /// Never validates; a no-op on the first step.
    pub fn previous(&mut self) -> Transition {
        let from = self.step;
        match from.previous() {
            Some(target) => {
                self.step = target;
                self.persist();
                Transition {
                    from,
                    to: target,
                    accepted: true,
                    scroll_to_top: true,
                }
            }
            None => Transition {
                from,
                to: from,
                accepted: false,
                scroll_to_top: false,
            },
        }
    }

    /// Jumps back to an earlier (or the current) step.
    pub fn go_to(&mut self, target: WizardStep) -> Result<Transition, NavigationError> {
        let from = self.step;
        if target > from {
            return Err(NavigationError::ForwardJump { from, to: target });
        }
        if target != from {
            self.step = target;
            self.persist();
        }
        Ok(Transition {
            from,
            to: target,
            accepted: true,
            scroll_to_top: target != from,
        })
    }

    // Documents

    /// Accepts a selection and shows its local preview immediately.
    pub fn select_document(
        &mut self,
        slot: DocumentSlot,
        file: LocalFile,
    ) -> Result<PendingUpload, UploadRejected> {
        let selected = self.uploads.select(
            &mut self.draft.identification.documents,
            slot,
            file,
            &self.settings.owner_id,
        );
        match selected {
            Ok(pending) => {
                self.persist();
                Ok(pending)
            }
            Err(rejected) => {
                self.notifier.notify(&rejected.to_string(), NotificationKind::Error);
                Err(rejected)
            }
        }
    }

    pub fn begin_upload(&mut self, ticket: &UploadTicket) -> bool {
        let started = self
            .uploads
            .begin(&mut self.draft.identification.documents, ticket);
        if started {
            self.persist();
        }
        started
    }

    pub fn complete_upload(&mut self, completion: UploadCompletion) -> UploadResolution {
        let resolution = self
            .uploads
            .complete(&mut self.draft.identification.documents, completion);

        match &resolution {
            UploadResolution::Committed { .. } => self.persist(),
            UploadResolution::Failed { slot, .. } => {
                self.persist();
                self.notifier.notify(
                    &format!("{} could not be uploaded. Please try again.", slot.display_name()),
                    NotificationKind::Error,
                );
            }
            UploadResolution::Stale { .. } => {}
        }
        resolution
    }

    /// Select, upload and commit in one call.
    pub async fn upload_document(
        &mut self,
        slot: DocumentSlot,
        file: LocalFile,
        uploader: &dyn FileUploader,
    ) -> Result<UploadResolution, UploadRejected> {
        let pending = self.select_document(slot, file)?;
        self.begin_upload(pending.ticket());
        let completion = pending.dispatch(uploader).await;
        Ok(self.complete_upload(completion))
    }

    // Submission

    /// Re-validates every section and builds the payload; marks the submission in flight.
    pub fn prepare_submission(&mut self) -> Result<OnboardingPayload, SubmitError> {
        if self.step != WizardStep::LAST {
            return Err(SubmitError::NotOnFinalStep { step: self.step });
        }
        if self.submitting {
            return Err(SubmitError::AlreadySubmitting);
        }

        let ctx = self.validation_context();
        let reports = validate_draft(&self.draft, &ctx);
        let failing: Vec<ValidationReport> = reports
            .iter()
            .filter(|report| !report.is_valid())
            .cloned()
            .collect();
        for report in reports {
            self.errors.insert(report.step, report);
        }

        if !failing.is_empty() {
            warn!(sections = failing.len(), "submission blocked by validation");
            self.notifier
                .notify(&consolidated_message(&failing), NotificationKind::Error);
            return Err(SubmitError::Invalid { reports: failing });
        }

        let payload = to_backend(&self.draft, &self.settings.transform).map_err(|err| {
            self.notifier.notify(
                &format!("Your application could not be prepared: {err}"),
                NotificationKind::Error,
            );
            err
        })?;

        self.submitting = true;
        info!(owner = %self.settings.owner_id, "submitting application");
        Ok(payload)
    }

    /// Applies the backend outcome. Only success clears the draft.
    pub fn finish_submission(
        &mut self,
        outcome: Result<SubmissionAck, SubmissionError>,
        navigator: &dyn Navigator,
    ) -> Result<SubmissionAck, SubmitError> {
        self.submitting = false;

        match outcome {
            Ok(ack) => {
                info!(
                    owner = %self.settings.owner_id,
                    reference = ?ack.reference,
                    "application submitted"
                );
                self.notifier
                    .notify("Your application has been submitted.", NotificationKind::Success);
                if let Err(err) = self.persistence.clear() {
                    warn!(error = %err, "submitted draft could not be cleared");
                    self.notifier.notify(
                        "Your application was submitted, but saved progress could not be removed.",
                        NotificationKind::Error,
                    );
                }
                self.reset();
                navigator.redirect();
                Ok(ack)
            }
            Err(error) => {
                warn!(owner = %self.settings.owner_id, %error, "application submission failed");
                self.notifier.notify(
                    concat!(
                        "We could not submit your application. ",
                        "Your answers are saved; please try again."
                    ),
                    NotificationKind::Error,
                );
                Err(SubmitError::Service(error))
            }
        }
    }

    pub async fn submit(
        &mut self,
        service: &dyn SubmissionService,
        navigator: &dyn Navigator,
    ) -> Result<SubmissionAck, SubmitError> {
        let payload = self.prepare_submission()?;
        let outcome = service.submit(&payload).await;
        self.finish_submission(outcome, navigator)
    }

    /// Throws away the draft and its saved copy.
    pub fn discard(&mut self) -> Result<(), PersistenceError> {
        self.persistence.clear()?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.draft = Draft::default();
        self.step = WizardStep::FIRST;
        self.errors.clear();
        self.uploads.invalidate_all();
    }

    fn persist(&self) {
        if let Err(err) = self.persistence.save(&self.draft, self.step) {
            warn!(owner = %self.settings.owner_id, error = %err, "failed to persist draft");
            self.notifier.notify(
                "Your latest changes could not be saved on this device.",
                NotificationKind::Error,
            );
        }
    }
}

fn consolidated_message(reports: &[ValidationReport]) -> String {
    let mut lines = Vec::new();
    for report in reports {
        if let Some(message) = report.list_message() {
            lines.push(format!("Step {}: {message}", report.step.number()));
        }
        for message in report.field_messages() {
            lines.push(format!("Step {}: {message}", report.step.number()));
        }
    }
    format!(
        "Please fix the following before submitting:\n- {}",
        lines.join("\n- ")
    )
}
