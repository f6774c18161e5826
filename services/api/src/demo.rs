use crate::infra::{InMemorySubmissionService, InMemoryUploader, LoggingNavigator};
use clap::Args;
use onboarding_wizard::error::AppError;
use onboarding_wizard::workflows::onboarding::{
    About, Address, ApplyForRole, DocumentSlot, Draft, FamilyMember, Gender, Identification,
    LocalFile, MemoryStore, Notification, NotificationLog, PersonalDetails, Qualification,
    QualificationLevel, Reference, References, WizardController, WizardSession, WizardSettings,
    WizardStep, WorkExperience,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the backend payload produced at submission.
    #[arg(long)]
    pub(crate) show_payload: bool,
    /// Leave the family member list one short to demonstrate a blocked submission.
    #[arg(long)]
    pub(crate) incomplete: bool,
}

const DEMO_OWNER: &str = "demo-candidate";

// 1x1 transparent PNG.
const SAMPLE_PNG: [u8; 67] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

fn narrative(topic: &str) -> String {
    let sentence = format!(
        "I care deeply about {topic} because every child deserves patient guidance and \
         a mentor who listens before speaking."
    );
    vec![sentence.as_str(); 4].join(" ")
}

pub(crate) fn sample_draft() -> Draft {
    let address = Address {
        building: "House 17".to_string(),
        street: "Temple Street".to_string(),
        area: "Malleswaram".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560003".to_string(),
    };
    let references = vec![
        Reference {
            name: "Meera Iyer".to_string(),
            contact_number: "9845012345".to_string(),
            email: "meera.iyer@example.org".to_string(),
            organization: "Akshara Foundation".to_string(),
            designation: "Program Lead".to_string(),
            how_they_know: "Supervised my fellowship".to_string(),
        },
        Reference {
            name: "Rahul Menon".to_string(),
            contact_number: "9845012346".to_string(),
            email: "rahul.menon@example.org".to_string(),
            organization: "City Library Trust".to_string(),
            designation: "Librarian".to_string(),
            how_they_know: "Reading program volunteer".to_string(),
        },
        Reference {
            name: "Farah Khan".to_string(),
            contact_number: "9845012347".to_string(),
            email: "farah.khan@example.org".to_string(),
            organization: "St. Joseph's College".to_string(),
            designation: "Professor".to_string(),
            how_they_know: "Thesis advisor".to_string(),
        },
    ];
    let family_members = vec![
        FamilyMember {
            name: "Lakshmi Rao".to_string(),
            relationship: "Mother".to_string(),
            occupation: "Teacher".to_string(),
            age: "52".to_string(),
            dependent: false,
        },
        FamilyMember {
            name: "Venkat Rao".to_string(),
            relationship: "Father".to_string(),
            occupation: "Retired".to_string(),
            age: "61".to_string(),
            dependent: true,
        },
        FamilyMember {
            name: "Divya Rao".to_string(),
            relationship: "Sister".to_string(),
            occupation: "Student".to_string(),
            age: "17".to_string(),
            dependent: true,
        },
    ];

    Draft {
        personal_details: PersonalDetails {
            full_name: "Ananya Rao".to_string(),
            date_of_birth: "1997-08-21".to_string(),
            gender: Some(Gender::Female),
            phone: "9900112233".to_string(),
            whatsapp_number: "9900112233".to_string(),
            email: "ananya.rao@example.org".to_string(),
            current_address: address,
            permanent_address: Address::default(),
            permanent_same_as_current: true,
            languages: ["Kannada", "English", "Hindi"].into_iter().collect(),
            apply_for: Some(ApplyForRole::Teacher),
        },
        qualification: Qualification {
            highest_qualification: Some(QualificationLevel::PostGraduate),
            work_experience: vec![WorkExperience {
                company_name: "Akshara Foundation".to_string(),
                years: "2".to_string(),
            }],
        },
        about: About {
            motivation: narrative("early literacy"),
            experience: narrative("classroom practice"),
            aspirations: narrative("community learning"),
            hours_per_day: "5".to_string(),
            interests: ["Mathematics", "Storytelling"].into_iter().collect(),
            joining_availability_days: "15".to_string(),
        },
        references: References::new(references),
        identification: Identification {
            aadhar_number: "234567890123".to_string(),
            pan_number: "BNZPR4321K".to_string(),
            emergency_contact: "9900445566".to_string(),
            family_members,
            ..Identification::default()
        },
    }
}

fn print_notifications(notifications: &[Notification]) {
    for notification in notifications {
        println!("  [{:?}] {}", notification.kind, notification.message);
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let notifications = Arc::new(NotificationLog::default());
    let mut controller = WizardController::rehydrate(
        Arc::new(MemoryStore::default()),
        notifications.clone(),
        WizardSettings::for_owner(DEMO_OWNER),
    );

    println!("Onboarding wizard demo for `{DEMO_OWNER}`");
    println!("\nStep 1 with an empty form:");
    if let Ok(transition) = controller.next() {
        println!(
            "  advanced: {} ({} problems)",
            transition.accepted,
            controller
                .errors(WizardStep::PersonalDetails)
                .map(|report| report.error_count())
                .unwrap_or_default()
        );
    }
    notifications.drain();

    let mut draft = sample_draft();
    if args.incomplete {
        draft.identification.family_members.truncate(2);
    }
    controller.update_personal_details(|current| *current = draft.personal_details);
    controller.update_qualification(|current| *current = draft.qualification);
    controller.update_about(|current| *current = draft.about);
    controller.update_references(|current| *current = draft.references.entries().to_vec());
    controller.update_identification(|current| *current = draft.identification);

    println!("\nWalking the wizard:");
    while controller.step() != WizardStep::LAST {
        let Ok(transition) = controller.next() else {
            break;
        };
        println!(
            "  step {} -> step {} ({})",
            transition.from.number(),
            transition.to.number(),
            if transition.accepted { "ok" } else { "blocked" }
        );
        if !transition.accepted {
            print_notifications(&notifications.drain());
            return Ok(());
        }
    }

    let uploader = Arc::new(InMemoryUploader::default());
    let submissions = Arc::new(InMemorySubmissionService::default());
    let session = Arc::new(WizardSession::new(
        controller,
        uploader.clone(),
        submissions.clone(),
        Arc::new(LoggingNavigator::new("/dashboard")),
    ));

    println!("\nUploading documents:");
    for slot in DocumentSlot::ALL {
        let file = LocalFile::new(format!("{}.png", slot.key()), "image/png", SAMPLE_PNG.to_vec());
        match session.upload_document(slot, file).await {
            Ok(resolution) => println!("  {}: {resolution:?}", slot.display_name()),
            Err(rejected) => println!("  {}: rejected ({rejected})", slot.display_name()),
        }
    }
    println!("  stored {} file(s)", uploader.stored().len());

    println!("\nSubmitting:");
    match session.submit().await {
        Ok(ack) => println!("  accepted, reference {:?}", ack.reference),
        Err(err) => println!("  not submitted: {err}"),
    }
    print_notifications(&notifications.drain());

    if args.show_payload {
        if let Some(payload) = submissions.payloads().last() {
            println!("\n{}", serde_json::to_string_pretty(payload)?);
        }
    }

    Ok(())
}
