//! End-to-end scenarios for the onboarding wizard driven through the public session facade.
//!
//! These cover resuming a saved draft, racing document uploads, and the submission lifecycle
//! against disk-backed persistence.

mod common {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::oneshot;

    use onboarding_wizard::workflows::onboarding::{
        About, Address, ApplyForRole, Draft, FamilyMember, FileStore, FileUploader, Gender,
        Identification, LocalFile, Navigator, NotificationLog, OnboardingPayload,
        PersonalDetails, Qualification, QualificationLevel, Reference, References,
        SubmissionAck, SubmissionError, SubmissionService, UploadError, UploadedFile,
        WizardController, WizardSession, WizardSettings, WorkExperience,
    };

    pub(super) type Controller = WizardController<FileStore, NotificationLog>;
    pub(super) type Session = WizardSession<FileStore, NotificationLog>;

    pub(super) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
    }

    fn narrative(seed: &str) -> String {
        vec![seed; 52].join(" ")
    }

    pub(super) fn draft() -> Draft {
        let address = Address {
            building: "Flat 4".to_string(),
            street: "Station Road".to_string(),
            area: "Civil Lines".to_string(),
            city: "Jaipur".to_string(),
            state: "Rajasthan".to_string(),
            pincode: "302006".to_string(),
        };
        let references = (0..3)
            .map(|index| Reference {
                name: format!("Mentor {}", ["Anil", "Bina", "Chetan"][index]),
                contact_number: format!("701234567{index}"),
                email: format!("mentor{index}@school.example.in"),
                organization: "Government School".to_string(),
                designation: "Headteacher".to_string(),
                how_they_know: "Volunteered together".to_string(),
            })
            .collect();
        let family_members = ["Mother", "Father", "Sister"]
            .into_iter()
            .enumerate()
            .map(|(index, relationship)| FamilyMember {
                name: format!("Member {}", ["Lata", "Mohan", "Nisha"][index]),
                relationship: relationship.to_string(),
                occupation: "Shopkeeper".to_string(),
                age: (50 - index * 10).to_string(),
                dependent: index == 2,
            })
            .collect();

        Draft {
            personal_details: PersonalDetails {
                full_name: "Priya Sharma".to_string(),
                date_of_birth: "1998-11-03".to_string(),
                gender: Some(Gender::Female),
                phone: "8765432109".to_string(),
                whatsapp_number: "8765432109".to_string(),
                email: "priya.sharma@example.in".to_string(),
                current_address: address,
                permanent_address: Address::default(),
                permanent_same_as_current: true,
                languages: ["Hindi", "English"].into_iter().collect(),
                apply_for: Some(ApplyForRole::Mentor),
            },
            qualification: Qualification {
                highest_qualification: Some(QualificationLevel::PostGraduate),
                work_experience: vec![WorkExperience {
                    company_name: "Pratham".to_string(),
                    years: "2".to_string(),
                }],
            },
            about: About {
                motivation: narrative("teach"),
                experience: narrative("mentor"),
                aspirations: narrative("grow"),
                hours_per_day: "5".to_string(),
                interests: ["Reading", "Science"].into_iter().collect(),
                joining_availability_days: "14".to_string(),
            },
            references: References::new(references),
            identification: Identification {
                aadhar_number: "987654321098".to_string(),
                pan_number: "pqrst6789k".to_string(),
                emergency_contact: "9988776655".to_string(),
                family_members,
                ..Identification::default()
            },
        }
    }

    pub(super) fn controller(root: &std::path::Path) -> (Controller, Arc<NotificationLog>) {
        let notifications = Arc::new(NotificationLog::default());
        let controller = WizardController::rehydrate(
            Arc::new(FileStore::new(root)),
            notifications.clone(),
            WizardSettings::for_owner("cand-7"),
        )
        .with_today(today());
        (controller, notifications)
    }

    /// Writes every section through the controller and walks to the final step.
    pub(super) fn fill_and_advance(controller: &mut Controller) {
        let draft = draft();
        controller.update_personal_details(|current| *current = draft.personal_details);
        controller.update_qualification(|current| *current = draft.qualification);
        controller.update_about(|current| *current = draft.about);
        controller.update_references(|current| *current = draft.references.entries().to_vec());
        controller.update_identification(|current| *current = draft.identification);
        for _ in 0..4 {
            let transition = controller.next().expect("not on the final step");
            assert!(transition.accepted, "section {:?} should validate", transition.from);
        }
    }

    pub(super) fn png(name: &str) -> LocalFile {
        LocalFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G', b'\r', b'\n'])
    }

    type UploadOutcome = Result<UploadedFile, UploadError>;

    /// Holds each named upload until the test releases it.
    #[derive(Default)]
    pub(super) struct GatedUploader {
        gates: Mutex<HashMap<String, oneshot::Receiver<UploadOutcome>>>,
    }

    impl GatedUploader {
        pub(super) fn gate(&self, name: &str) -> oneshot::Sender<UploadOutcome> {
            let (sender, receiver) = oneshot::channel();
            self.gates
                .lock()
                .expect("gate mutex poisoned")
                .insert(name.to_string(), receiver);
            sender
        }
    }

    #[async_trait]
    impl FileUploader for GatedUploader {
        async fn upload(&self, file: &LocalFile, owner_id: &str) -> UploadOutcome {
            let gate = self
                .gates
                .lock()
                .expect("gate mutex poisoned")
                .remove(&file.name);
            match gate {
                Some(receiver) => receiver
                    .await
                    .unwrap_or_else(|_| Err(UploadError::Transport("gate dropped".to_string()))),
                None => Ok(UploadedFile {
                    url: format!("https://cdn.example.in/{owner_id}/{}", file.name),
                }),
            }
        }
    }

    type SubmitOutcome = Result<SubmissionAck, SubmissionError>;

    /// Signals when a submission arrives and waits for the test to answer it.
    #[derive(Default)]
    pub(super) struct GatedSubmissions {
        started: Mutex<Option<oneshot::Sender<()>>>,
        release: Mutex<Option<oneshot::Receiver<SubmitOutcome>>>,
        payloads: Mutex<Vec<OnboardingPayload>>,
    }

    impl GatedSubmissions {
        pub(super) fn arm(&self) -> (oneshot::Receiver<()>, oneshot::Sender<SubmitOutcome>) {
            let (started_tx, started_rx) = oneshot::channel();
            let (release_tx, release_rx) = oneshot::channel();
            *self.started.lock().expect("mutex poisoned") = Some(started_tx);
            *self.release.lock().expect("mutex poisoned") = Some(release_rx);
            (started_rx, release_tx)
        }

        pub(super) fn payloads(&self) -> Vec<OnboardingPayload> {
            self.payloads.lock().expect("mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl SubmissionService for GatedSubmissions {
        async fn submit(&self, payload: &OnboardingPayload) -> SubmitOutcome {
            self.payloads
                .lock()
                .expect("mutex poisoned")
                .push(payload.clone());
            let started = self.started.lock().expect("mutex poisoned").take();
            if let Some(started) = started {
                let _ = started.send(());
            }
            let release = self.release.lock().expect("mutex poisoned").take();
            match release {
                Some(receiver) => receiver
                    .await
                    .unwrap_or_else(|_| Err(SubmissionError::Transport("released".to_string()))),
                None => Ok(SubmissionAck {
                    reference: Some("ONB-1".to_string()),
                }),
            }
        }
    }

    #[derive(Default)]
    pub(super) struct CountingNavigator {
        redirects: AtomicUsize,
    }

    impl CountingNavigator {
        pub(super) fn redirects(&self) -> usize {
            self.redirects.load(Ordering::SeqCst)
        }
    }

    impl Navigator for CountingNavigator {
        fn redirect(&self) {
            self.redirects.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(super) fn session(
        controller: Controller,
        uploader: Arc<GatedUploader>,
        submissions: Arc<GatedSubmissions>,
        navigator: Arc<CountingNavigator>,
    ) -> Arc<Session> {
        Arc::new(WizardSession::new(controller, uploader, submissions, navigator))
    }

    /// Yields to background tasks until the controller satisfies `ready`.
    pub(super) async fn wait_for(session: &Session, mut ready: impl FnMut(&Controller) -> bool) {
        for _ in 0..1_000 {
            if ready(&*session.lock().await) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("session never reached the expected state");
    }
}

use std::sync::Arc;

use common::*;
use onboarding_wizard::workflows::onboarding::{
    DocumentSlot, DocumentState, NotificationKind, SubmissionAck, SubmissionError, SubmitError,
    UploadResolution, UploadedFile, WizardStep,
};

#[test]
fn saved_progress_resumes_in_a_new_controller() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut first, _) = controller(dir.path());
    let expected = draft();
    first.update_personal_details(|current| *current = expected.personal_details.clone());
    first.update_qualification(|current| *current = expected.qualification.clone());
    assert!(first.next().expect("step 1").accepted);
    assert!(first.next().expect("step 2").accepted);
    assert_eq!(first.step(), WizardStep::About);
    drop(first);

    let (resumed, notifications) = controller(dir.path());

    assert_eq!(resumed.step(), WizardStep::About);
    assert_eq!(resumed.draft().personal_details, expected.personal_details);
    assert_eq!(resumed.draft().qualification, expected.qualification);
    assert!(notifications.snapshot().is_empty());
}

#[tokio::test]
async fn later_document_selection_wins_the_race() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (controller, _) = controller(dir.path());
    let uploader = Arc::new(GatedUploader::default());
    let session = session(
        controller,
        uploader.clone(),
        Arc::new(GatedSubmissions::default()),
        Arc::new(CountingNavigator::default()),
    );
    let slot = DocumentSlot::AadharFront;
    let first_gate = uploader.gate("first.png");
    let second_gate = uploader.gate("second.png");

    let first = session
        .spawn_upload(slot, png("first.png"))
        .await
        .expect("first accepted");
    let second = session
        .spawn_upload(slot, png("second.png"))
        .await
        .expect("second accepted");

    match session.lock().await.document(slot) {
        DocumentState::Uploading { preview, previous } => {
            assert!(preview.ends_with("second.png"));
            assert_eq!(previous, &None);
        }
        other => panic!("expected upload in flight, got {other:?}"),
    }

    second_gate
        .send(Ok(UploadedFile {
            url: "https://cdn.example.in/cand-7/second.png".to_string(),
        }))
        .expect("second upload waiting");
    let second_resolution = second.await.expect("task completes");
    assert!(matches!(second_resolution, UploadResolution::Committed { .. }));

    first_gate
        .send(Ok(UploadedFile {
            url: "https://cdn.example.in/cand-7/first.png".to_string(),
        }))
        .expect("first upload waiting");
    let first_resolution = first.await.expect("task completes");
    assert!(matches!(first_resolution, UploadResolution::Stale { .. }));

    assert_eq!(
        session.lock().await.document(slot).durable_url(),
        Some("https://cdn.example.in/cand-7/second.png")
    );
}

#[tokio::test]
async fn full_application_submits_and_clears_saved_draft() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut controller, notifications) = controller(dir.path());
    fill_and_advance(&mut controller);
    let uploader = Arc::new(GatedUploader::default());
    let submissions = Arc::new(GatedSubmissions::default());
    let navigator = Arc::new(CountingNavigator::default());
    let session = session(controller, uploader, submissions.clone(), navigator.clone());

    for slot in DocumentSlot::ALL {
        let resolution = session
            .upload_document(slot, png(&format!("{}.png", slot.key())))
            .await
            .expect("png accepted");
        assert!(matches!(resolution, UploadResolution::Committed { .. }));
    }

    let ack = session.submit().await.expect("submission accepted");

    assert_eq!(ack.reference.as_deref(), Some("ONB-1"));
    let payload = &submissions.payloads()[0];
    assert_eq!(payload.identification.pan_number, "PQRST6789K");
    assert_eq!(
        payload.identification.documents.pan_back.as_deref(),
        Some("https://cdn.example.in/cand-7/pan_back.png")
    );
    assert_eq!(payload.references.len(), 3);
    assert_eq!(payload.identification.family_members["member3"].dependent, "yes");
    assert_eq!(notifications.count(NotificationKind::Success), 1);
    assert_eq!(navigator.redirects(), 1);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("data dir exists")
        .collect();
    assert!(leftovers.is_empty(), "draft files removed after submission");
}

#[tokio::test]
async fn edits_continue_while_submission_is_in_flight() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut controller, notifications) = controller(dir.path());
    fill_and_advance(&mut controller);
    let submissions = Arc::new(GatedSubmissions::default());
    let navigator = Arc::new(CountingNavigator::default());
    let session = session(
        controller,
        Arc::new(GatedUploader::default()),
        submissions.clone(),
        navigator.clone(),
    );
    let (started, release) = submissions.arm();

    let in_flight = {
        let session = session.clone();
        tokio::spawn(async move { session.submit().await })
    };
    started.await.expect("submission reached the service");

    {
        let mut controller = session.lock().await;
        assert!(controller.is_submitting());
        controller.update_about(|about| about.hours_per_day = "6".to_string());
        assert!(matches!(
            controller.prepare_submission(),
            Err(SubmitError::AlreadySubmitting)
        ));
    }

    release
        .send(Err(SubmissionError::Rejected("duplicate aadhaar".to_string())))
        .expect("submission waiting");
    let outcome = in_flight.await.expect("task completes");

    assert!(matches!(outcome, Err(SubmitError::Service(_))));
    assert_eq!(navigator.redirects(), 0);
    assert!(notifications.count(NotificationKind::Error) >= 1);

    let ack = session.submit().await.expect("retry accepted");
    assert_eq!(ack, SubmissionAck { reference: Some("ONB-1".to_string()) });
    assert_eq!(submissions.payloads()[1].about.hours_per_day, 6);
}

#[tokio::test]
async fn abandoned_submit_request_still_settles_and_allows_retry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut controller, notifications) = controller(dir.path());
    fill_and_advance(&mut controller);
    let submissions = Arc::new(GatedSubmissions::default());
    let navigator = Arc::new(CountingNavigator::default());
    let session = session(
        controller,
        Arc::new(GatedUploader::default()),
        submissions.clone(),
        navigator.clone(),
    );
    let (started, release) = submissions.arm();

    let caller = {
        let session = session.clone();
        tokio::spawn(async move { session.submit().await })
    };
    started.await.expect("submission reached the service");
    caller.abort();
    assert!(caller.await.expect_err("caller was aborted").is_cancelled());
    assert!(session.lock().await.is_submitting());

    release
        .send(Err(SubmissionError::Transport("gateway timeout".to_string())))
        .expect("backend call outlives the caller");
    wait_for(&session, |controller| !controller.is_submitting()).await;
    assert_eq!(notifications.count(NotificationKind::Error), 1);

    let ack = session.submit().await.expect("retry accepted");
    assert_eq!(ack.reference.as_deref(), Some("ONB-1"));
    assert_eq!(submissions.payloads().len(), 2);
    assert_eq!(navigator.redirects(), 1);
}

#[tokio::test]
async fn abandoned_upload_request_still_commits_the_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (controller, _) = controller(dir.path());
    let uploader = Arc::new(GatedUploader::default());
    let session = session(
        controller,
        uploader.clone(),
        Arc::new(GatedSubmissions::default()),
        Arc::new(CountingNavigator::default()),
    );
    let slot = DocumentSlot::PanFront;
    let gate = uploader.gate("pan.png");

    let caller = {
        let session = session.clone();
        tokio::spawn(async move { session.upload_document(slot, png("pan.png")).await })
    };
    wait_for(&session, |controller| {
        matches!(controller.document(slot), DocumentState::Uploading { .. })
    })
    .await;
    caller.abort();
    assert!(caller.await.expect_err("caller was aborted").is_cancelled());

    gate.send(Ok(UploadedFile {
        url: "https://cdn.example.in/cand-7/pan.png".to_string(),
    }))
    .expect("storage call outlives the caller");
    wait_for(&session, |controller| {
        matches!(controller.document(slot), DocumentState::Committed { .. })
    })
    .await;
    assert_eq!(
        session.lock().await.document(slot).durable_url(),
        Some("https://cdn.example.in/cand-7/pan.png")
    );

    let replaced = session
        .upload_document(slot, png("pan-rescan.png"))
        .await
        .expect("png accepted");
    assert!(matches!(replaced, UploadResolution::Committed { .. }));
}
