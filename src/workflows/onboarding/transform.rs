//! Maps the flat wizard draft onto the nested payload the backend expects.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::{
    Address, DocumentSlot, Documents, Draft, FamilyMember, Reference, MIN_FAMILY_MEMBERS,
};
use super::validators::normalize_pan;

/// Questions paired with the three narrative answers, in submission order.
pub const ABOUT_QUESTIONS: [&str; 3] = [
    "Why do you want to join us?",
    "Describe your experience working with learners or communities.",
    "What do you hope to achieve with us over the next two years?",
];

pub const REFERENCE_KEY_PREFIX: &str = "person";
pub const FAMILY_MEMBER_KEY_PREFIX: &str = "member";

/// How document slots that were never committed appear in the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MissingDocumentPolicy {
    #[default]
    Null,
    Placeholder(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub missing_documents: MissingDocumentPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} is not a whole number: '{value}'")]
    NotANumber { field: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingPayload {
    pub personal_details: PersonalDetailsPayload,
    pub qualification: QualificationPayload,
    pub about: AboutPayload,
    pub references: BTreeMap<String, ReferencePayload>,
    pub identification: IdentificationPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetailsPayload {
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub phone: String,
    pub whatsapp_number: String,
    pub email: String,
    pub current_address: AddressPayload,
    pub permanent_address: AddressPayload,
    pub languages: Vec<String>,
    pub apply_for: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub building: String,
    pub street: String,
    pub area: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationPayload {
    pub highest_qualification: String,
    pub work_experience: Vec<WorkExperiencePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperiencePayload {
    pub company_name: String,
    pub years: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutPayload {
    pub answers: Vec<QuestionAnswer>,
    pub hours_per_day: u8,
    pub interests: Vec<String>,
    pub joining_availability_days: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePayload {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub organization: String,
    pub designation: String,
    pub how_they_know: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationPayload {
    pub aadhar_number: String,
    pub pan_number: String,
    pub emergency_contact: String,
    pub documents: DocumentsPayload,
    pub family_members: BTreeMap<String, FamilyMemberPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsPayload {
    pub profile_photo: Option<String>,
    pub aadhar_front: Option<String>,
    pub aadhar_back: Option<String>,
    pub pan_front: Option<String>,
    pub pan_back: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberPayload {
    pub name: String,
    pub relationship: String,
    pub occupation: String,
    /// `None` only for unchecked members whose age was not a number.
    pub age: Option<u8>,
    /// The backend expects the literal strings `"yes"` / `"no"`.
    pub dependent: String,
}

/// Keys items by 1-based position: `prefix1`, `prefix2`, ...
pub fn keyed_by_position<T>(
    prefix: &str,
    items: impl IntoIterator<Item = T>,
) -> BTreeMap<String, T> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (format!("{prefix}{}", index + 1), item))
        .collect()
}

/// Pure mapping from draft to payload. Expects a draft that already passed validation.
pub fn to_backend(
    draft: &Draft,
    options: &TransformOptions,
) -> Result<OnboardingPayload, TransformError> {
    let personal = &draft.personal_details;
    let personal_details = PersonalDetailsPayload {
        full_name: personal.full_name.trim().to_string(),
        date_of_birth: personal.date_of_birth.trim().to_string(),
        gender: personal
            .gender
            .ok_or(TransformError::Missing { field: "gender" })?
            .label()
            .to_string(),
        phone: personal.phone.trim().to_string(),
        whatsapp_number: personal.whatsapp_number.trim().to_string(),
        email: personal.email.trim().to_string(),
        current_address: address_payload(&personal.current_address),
        permanent_address: address_payload(personal.effective_permanent_address()),
        languages: personal.languages.as_slice().to_vec(),
        apply_for: personal
            .apply_for
            .ok_or(TransformError::Missing { field: "apply_for" })?
            .label()
            .to_string(),
    };

    let qualification = QualificationPayload {
        highest_qualification: draft
            .qualification
            .highest_qualification
            .ok_or(TransformError::Missing {
                field: "highest_qualification",
            })?
            .label()
            .to_string(),
        work_experience: draft
            .qualification
            .work_experience
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Ok(WorkExperiencePayload {
                    company_name: entry.company_name.trim().to_string(),
                    years: parse_number(&format!("work_experience[{index}].years"), &entry.years)?,
                })
            })
            .collect::<Result<Vec<_>, TransformError>>()?,
    };

    let about = &draft.about;
    let about = AboutPayload {
        answers: ABOUT_QUESTIONS
            .iter()
            .zip(about.narratives())
            .map(|(question, answer)| QuestionAnswer {
                question: (*question).to_string(),
                answer: answer.trim().to_string(),
            })
            .collect(),
        hours_per_day: parse_number("hours_per_day", &about.hours_per_day)?,
        interests: about.interests.as_slice().to_vec(),
        joining_availability_days: parse_number(
            "joining_availability_days",
            &about.joining_availability_days,
        )?,
    };

    let references = keyed_by_position(
        REFERENCE_KEY_PREFIX,
        draft.references.required().iter().map(reference_payload),
    );

    let identification = &draft.identification;
    let members = identification
        .family_members
        .iter()
        .enumerate()
        .filter(|(index, member)| *index < MIN_FAMILY_MEMBERS || !is_blank(member))
        .map(|(_, member)| family_member_payload(member));
    let identification = IdentificationPayload {
        aadhar_number: identification.aadhar_number.trim().to_string(),
        pan_number: normalize_pan(&identification.pan_number),
        emergency_contact: identification.emergency_contact.trim().to_string(),
        documents: documents_payload(&identification.documents, &options.missing_documents),
        family_members: keyed_by_position(FAMILY_MEMBER_KEY_PREFIX, members),
    };

    Ok(OnboardingPayload {
        personal_details,
        qualification,
        about,
        references,
        identification,
    })
}

fn address_payload(address: &Address) -> AddressPayload {
    AddressPayload {
        building: address.building.trim().to_string(),
        street: address.street.trim().to_string(),
        area: address.area.trim().to_string(),
        city: address.city.trim().to_string(),
        state: address.state.trim().to_string(),
        pincode: address.pincode.trim().to_string(),
    }
}

fn reference_payload(reference: &Reference) -> ReferencePayload {
    ReferencePayload {
        name: reference.name.trim().to_string(),
        phone: reference.contact_number.trim().to_string(),
        email: reference.email.trim().to_string(),
        organization: reference.organization.trim().to_string(),
        designation: reference.designation.trim().to_string(),
        how_they_know: reference.how_they_know.trim().to_string(),
    }
}

fn family_member_payload(member: &FamilyMember) -> FamilyMemberPayload {
    FamilyMemberPayload {
        name: member.name.trim().to_string(),
        relationship: member.relationship.trim().to_string(),
        occupation: member.occupation.trim().to_string(),
        age: member.age.trim().parse().ok(),
        dependent: if member.dependent { "yes" } else { "no" }.to_string(),
    }
}

fn is_blank(member: &FamilyMember) -> bool {
    member.name.trim().is_empty()
        && member.relationship.trim().is_empty()
        && member.occupation.trim().is_empty()
        && member.age.trim().is_empty()
}

fn documents_payload(documents: &Documents, policy: &MissingDocumentPolicy) -> DocumentsPayload {
    let resolve = |slot: DocumentSlot| match documents.get(slot).durable_url() {
        Some(url) => Some(url.to_string()),
        None => match policy {
            MissingDocumentPolicy::Null => None,
            MissingDocumentPolicy::Placeholder(url) => Some(url.clone()),
        },
    };

    DocumentsPayload {
        profile_photo: resolve(DocumentSlot::ProfilePhoto),
        aadhar_front: resolve(DocumentSlot::AadharFront),
        aadhar_back: resolve(DocumentSlot::AadharBack),
        pan_front: resolve(DocumentSlot::PanFront),
        pan_back: resolve(DocumentSlot::PanBack),
    }
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T, TransformError> {
    value.trim().parse().map_err(|_| TransformError::NotANumber {
        field: field.to_string(),
        value: value.to_string(),
    })
}
