//! Candidate onboarding wizard: five validated sections, draft persistence,
//! document uploads, and submission to the backend.

pub mod collaborators;
pub mod controller;
pub mod domain;
pub mod persistence;
pub mod router;
pub mod sections;
pub mod session;
pub mod transform;
pub mod uploads;
pub mod validators;

#[cfg(test)]
mod tests;

pub use collaborators::{
    FileUploader, Navigator, Notification, NotificationKind, NotificationLog, Notifier,
    SubmissionAck, SubmissionError, SubmissionService, UploadError, UploadedFile,
};
pub use controller::{
    DraftEditError, NavigationError, SubmitError, Transition, WizardController, WizardSettings,
};
pub use domain::{
    About, Address, ApplyForRole, DocumentSlot, DocumentState, Documents, Draft, FamilyMember,
    Gender, Identification, PersonalDetails, Qualification, QualificationLevel, Reference,
    References, SelectionSet, WizardStep, WorkExperience, MAX_FAMILY_MEMBERS, MIN_FAMILY_MEMBERS,
    MIN_REFERENCES,
};
pub use persistence::{
    DraftPersistence, DraftSnapshot, FileStore, MemoryStore, PersistenceError, PersistenceStore,
    StoreError, DEFAULT_NAMESPACE,
};
pub use router::{
    onboarding_router, SessionHandle, SessionRegistry, WizardView, DEFAULT_IDLE_TIMEOUT,
};
pub use sections::{
    validate_draft, FieldError, ListViolation, Validatable, ValidationContext, ValidationReport,
};
pub use session::WizardSession;
pub use transform::{
    to_backend, MissingDocumentPolicy, OnboardingPayload, TransformError, TransformOptions,
};
pub use uploads::{
    LocalFile, UploadCoordinator, UploadPolicy, UploadRejected, UploadResolution,
    DEFAULT_MAX_UPLOAD_BYTES,
};
pub use validators::FieldFailure;
