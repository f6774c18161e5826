use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::Value;

use crate::workflows::onboarding::collaborators::{
    FileUploader, Navigator, NotificationLog, SubmissionAck, SubmissionError, SubmissionService,
    UploadError, UploadedFile,
};
use crate::workflows::onboarding::controller::{WizardController, WizardSettings};
use crate::workflows::onboarding::domain::{
    About, Address, ApplyForRole, DocumentSlot, DocumentState, Draft, FamilyMember, Gender,
    Identification, PersonalDetails, Qualification, QualificationLevel, Reference, References,
    WizardStep, WorkExperience, MAX_FAMILY_MEMBERS,
};
use crate::workflows::onboarding::persistence::{MemoryStore, PersistenceStore, StoreError};
use crate::workflows::onboarding::transform::OnboardingPayload;
use crate::workflows::onboarding::uploads::LocalFile;

pub(super) const OWNER: &str = "cand-042";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date")
}

pub(super) fn words(count: usize) -> String {
    vec!["learning"; count].join(" ")
}

pub(super) fn address() -> Address {
    Address {
        building: "12B".to_string(),
        street: "MG Road".to_string(),
        area: "Indiranagar".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560038".to_string(),
    }
}

pub(super) fn personal_details() -> PersonalDetails {
    PersonalDetails {
        full_name: "Asha Verma".to_string(),
        date_of_birth: "1994-06-12".to_string(),
        gender: Some(Gender::Female),
        phone: "9876543210".to_string(),
        whatsapp_number: "9876543210".to_string(),
        email: "asha@example.org".to_string(),
        current_address: address(),
        permanent_address: Address::default(),
        permanent_same_as_current: true,
        languages: ["English", "Hindi"].into_iter().collect(),
        apply_for: Some(ApplyForRole::Teacher),
    }
}

pub(super) fn qualification() -> Qualification {
    Qualification {
        highest_qualification: Some(QualificationLevel::Graduate),
        work_experience: vec![WorkExperience {
            company_name: "Pratham".to_string(),
            years: "3".to_string(),
        }],
    }
}

pub(super) fn about() -> About {
    About {
        motivation: words(60),
        experience: words(55),
        aspirations: words(50),
        hours_per_day: "4".to_string(),
        interests: ["Mathematics"].into_iter().collect(),
        joining_availability_days: "30".to_string(),
    }
}

pub(super) fn reference(index: usize) -> Reference {
    Reference {
        name: format!("Referee {}", ["One", "Two", "Three", "Four"][index % 4]),
        contact_number: format!("981234567{index}"),
        email: format!("referee{index}@example.org"),
        organization: "Teach Forward".to_string(),
        designation: "Coordinator".to_string(),
        how_they_know: "Former supervisor".to_string(),
    }
}

pub(super) fn family_member(name: &str, age: &str) -> FamilyMember {
    FamilyMember {
        name: name.to_string(),
        relationship: "Parent".to_string(),
        occupation: "Farmer".to_string(),
        age: age.to_string(),
        dependent: false,
    }
}

pub(super) fn identification() -> Identification {
    Identification {
        aadhar_number: "123456789012".to_string(),
        pan_number: "ABCDE1234F".to_string(),
        emergency_contact: "9123456780".to_string(),
        family_members: vec![
            family_member("Ravi Verma", "58"),
            family_member("Sunita Verma", "54"),
            family_member("Kiran Verma", "21"),
        ],
        ..Identification::default()
    }
}

pub(super) fn valid_draft() -> Draft {
    Draft {
        personal_details: personal_details(),
        qualification: qualification(),
        about: about(),
        references: References::new((0..3).map(reference).collect()),
        identification: identification(),
    }
}

pub(super) fn any_step() -> impl Strategy<Value = WizardStep> {
    prop::sample::select(WizardStep::ALL.to_vec())
}

/// Drafts the way a candidate leaves them mid-entry: blanked, padded or mistyped
/// fields, short or long lists, and messy selections.
pub(super) fn partial_draft() -> impl Strategy<Value = Draft> {
    (
        prop::collection::vec(0u8..4, 48),
        "[ a-zA-Z0-9@.]{0,16}",
        0usize..=5,
        0usize..=MAX_FAMILY_MEMBERS,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(edits, noise, references, family, same_address, photo)| {
            let mut draft = valid_draft();
            let mut edits = edits.into_iter();
            let mut edit = |field: &mut String| match edits.next().unwrap_or(0) {
                0 => {}
                1 => field.clear(),
                2 => *field = format!("  {field} "),
                _ => *field = noise.clone(),
            };

            let personal = &mut draft.personal_details;
            edit(&mut personal.full_name);
            edit(&mut personal.date_of_birth);
            edit(&mut personal.phone);
            edit(&mut personal.email);
            edit(&mut personal.current_address.city);
            edit(&mut personal.current_address.pincode);
            edit(&mut personal.permanent_address.street);
            personal.permanent_same_as_current = same_address;
            if !same_address {
                personal.languages = [" Hindi ", "hindi", noise.as_str(), "  "]
                    .into_iter()
                    .collect();
            }

            for entry in &mut draft.qualification.work_experience {
                edit(&mut entry.company_name);
                edit(&mut entry.years);
            }

            let about = &mut draft.about;
            edit(&mut about.motivation);
            edit(&mut about.experience);
            edit(&mut about.hours_per_day);
            edit(&mut about.joining_availability_days);

            let mut entries: Vec<Reference> = (0..references).map(reference).collect();
            for entry in &mut entries {
                edit(&mut entry.name);
                edit(&mut entry.contact_number);
                edit(&mut entry.email);
            }
            draft.references = References::new(entries);

            let identification = &mut draft.identification;
            edit(&mut identification.aadhar_number);
            edit(&mut identification.pan_number);
            edit(&mut identification.emergency_contact);
            identification.family_members = (0..family)
                .map(|index| family_member(&format!("Member {index}"), "40"))
                .collect();
            for member in &mut identification.family_members {
                edit(&mut member.name);
                edit(&mut member.age);
            }
            if photo {
                *identification.documents.slot_mut(DocumentSlot::ProfilePhoto) =
                    DocumentState::Committed {
                        url: format!("https://files.example.org/{OWNER}/photo.png"),
                    };
            }

            draft
        })
}

pub(super) fn png(name: &str) -> LocalFile {
    LocalFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

pub(super) fn settings() -> WizardSettings {
    WizardSettings::for_owner(OWNER)
}

pub(super) type TestController = WizardController<MemoryStore, NotificationLog>;

pub(super) fn controller(store: Arc<MemoryStore>) -> (TestController, Arc<NotificationLog>) {
    let notifications = Arc::new(NotificationLog::default());
    let controller =
        WizardController::rehydrate(store, notifications.clone(), settings()).with_today(today());
    (controller, notifications)
}

/// A controller holding a complete draft, parked on the final step.
pub(super) fn ready_to_submit(store: Arc<MemoryStore>) -> (TestController, Arc<NotificationLog>) {
    let (mut controller, notifications) = controller(store);
    let draft = valid_draft();
    controller.update_personal_details(|current| *current = draft.personal_details);
    controller.update_qualification(|current| *current = draft.qualification);
    controller.update_about(|current| *current = draft.about);
    controller.update_references(|current| *current = draft.references.entries().to_vec());
    controller.update_identification(|current| *current = draft.identification);
    for _ in 0..4 {
        let transition = controller.next().expect("not on the final step");
        assert!(transition.accepted, "valid draft advances");
    }
    notifications.drain();
    (controller, notifications)
}

#[derive(Default)]
pub(super) struct MemoryUploader {
    failing: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MemoryUploader {
    pub(super) fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: Mutex::new(names.iter().map(|name| name.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileUploader for MemoryUploader {
    async fn upload(&self, file: &LocalFile, owner_id: &str) -> Result<UploadedFile, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing.lock().expect("uploader mutex poisoned");
        if failing.iter().any(|name| name == &file.name) {
            return Err(UploadError::Transport("connection reset".to_string()));
        }
        Ok(UploadedFile {
            url: format!("https://files.example.org/{owner_id}/{}", file.name),
        })
    }
}

#[derive(Default)]
pub(super) struct RecordingSubmissions {
    outcomes: Mutex<VecDeque<Result<SubmissionAck, SubmissionError>>>,
    payloads: Mutex<Vec<OnboardingPayload>>,
}

impl RecordingSubmissions {
    pub(super) fn with_outcomes(outcomes: Vec<Result<SubmissionAck, SubmissionError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn payloads(&self) -> Vec<OnboardingPayload> {
        self.payloads.lock().expect("payload mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionService for RecordingSubmissions {
    async fn submit(&self, payload: &OnboardingPayload) -> Result<SubmissionAck, SubmissionError> {
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .push(payload.clone());
        self.outcomes
            .lock()
            .expect("outcome mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(SubmissionAck {
                    reference: Some("APP-0001".to_string()),
                })
            })
    }
}

#[derive(Default)]
pub(super) struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub(super) fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reads work, writes fail.
#[derive(Default)]
pub(super) struct ReadOnlyStore {
    entries: Mutex<HashMap<String, String>>,
}

impl PersistenceStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage quota exceeded".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage quota exceeded".to_string()))
    }
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
