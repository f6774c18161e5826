use serde::{Deserialize, Serialize};

/// Minimum number of references collected and validated for every application.
pub const MIN_REFERENCES: usize = 3;
/// Family member list bounds enforced before submission.
pub const MIN_FAMILY_MEMBERS: usize = 3;
pub const MAX_FAMILY_MEMBERS: usize = 5;

/// The five sequential sections of the onboarding wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalDetails,
    Qualification,
    About,
    References,
    Identification,
}

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep::PersonalDetails;
    pub const LAST: WizardStep = WizardStep::Identification;
    pub const ALL: [WizardStep; 5] = [
        WizardStep::PersonalDetails,
        WizardStep::Qualification,
        WizardStep::About,
        WizardStep::References,
        WizardStep::Identification,
    ];

    /// One-based position shown to the candidate and stored by persistence.
    pub const fn number(self) -> u8 {
        match self {
            WizardStep::PersonalDetails => 1,
            WizardStep::Qualification => 2,
            WizardStep::About => 3,
            WizardStep::References => 4,
            WizardStep::Identification => 5,
        }
    }

    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(WizardStep::PersonalDetails),
            2 => Some(WizardStep::Qualification),
            3 => Some(WizardStep::About),
            4 => Some(WizardStep::References),
            5 => Some(WizardStep::Identification),
            _ => None,
        }
    }

    pub const fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub const fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::PersonalDetails => "personal_details",
            WizardStep::Qualification => "qualification",
            WizardStep::About => "about",
            WizardStep::References => "references",
            WizardStep::Identification => "identification",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|step| step.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// The complete in-progress application for one wizard session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub personal_details: PersonalDetails,
    pub qualification: Qualification,
    pub about: About,
    pub references: References,
    pub identification: Identification,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub full_name: String,
    /// ISO `YYYY-MM-DD`, kept as entered until validation.
    pub date_of_birth: String,
    pub gender: Option<Gender>,
    pub phone: String,
    pub whatsapp_number: String,
    pub email: String,
    pub current_address: Address,
    pub permanent_address: Address,
    #[serde(default)]
    pub permanent_same_as_current: bool,
    pub languages: SelectionSet,
    pub apply_for: Option<ApplyForRole>,
}

impl PersonalDetails {
    /// Address submitted as the permanent residence.
    pub fn effective_permanent_address(&self) -> &Address {
        if self.permanent_same_as_current {
            &self.current_address
        } else {
            &self.permanent_address
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub building: String,
    pub street: String,
    pub area: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    PreferNotToSay,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::NonBinary => "non_binary",
            Gender::PreferNotToSay => "prefer_not_to_say",
        }
    }
}

/// Role the candidate is applying for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyForRole {
    Teacher,
    Mentor,
    Volunteer,
    Intern,
}

impl ApplyForRole {
    pub const fn label(self) -> &'static str {
        match self {
            ApplyForRole::Teacher => "teacher",
            ApplyForRole::Mentor => "mentor",
            ApplyForRole::Volunteer => "volunteer",
            ApplyForRole::Intern => "intern",
        }
    }
}

/// Order-preserving, duplicate-free list of selected options.
///
/// Values are trimmed and compared case-insensitively; the first spelling wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SelectionSet(Vec<String>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, returning `false` when it was blank or already selected.
    pub fn insert(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.0.push(value.to_string());
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.0.len();
        let value = value.trim();
        self.0.retain(|existing| !existing.eq_ignore_ascii_case(value));
        before != self.0.len()
    }

    /// Flips the selection state of `value`; returns whether it is now selected.
    pub fn toggle(&mut self, value: &str) -> bool {
        if self.remove(value) {
            false
        } else {
            self.insert(value)
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        let value = value.trim();
        self.0.iter().any(|existing| existing.eq_ignore_ascii_case(value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SelectionSet {
    fn from(values: Vec<String>) -> Self {
        values.iter().map(String::as_str).collect()
    }
}

impl From<SelectionSet> for Vec<String> {
    fn from(set: SelectionSet) -> Self {
        set.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SelectionSet::new();
        for value in iter {
            set.insert(value.as_ref());
        }
        set
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub highest_qualification: Option<QualificationLevel>,
    pub work_experience: Vec<WorkExperience>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationLevel {
    Secondary,
    HigherSecondary,
    Diploma,
    Graduate,
    PostGraduate,
    Doctorate,
}

impl QualificationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            QualificationLevel::Secondary => "secondary",
            QualificationLevel::HigherSecondary => "higher_secondary",
            QualificationLevel::Diploma => "diploma",
            QualificationLevel::Graduate => "graduate",
            QualificationLevel::PostGraduate => "post_graduate",
            QualificationLevel::Doctorate => "doctorate",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company_name: String,
    /// Whole years as entered.
    pub years: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct About {
    pub motivation: String,
    pub experience: String,
    pub aspirations: String,
    pub hours_per_day: String,
    pub interests: SelectionSet,
    pub joining_availability_days: String,
}

impl About {
    /// Narrative answers in question order.
    pub fn narratives(&self) -> [&str; 3] {
        [&self.motivation, &self.experience, &self.aspirations]
    }
}

/// Reference list, always padded to at least [`MIN_REFERENCES`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Reference>", into = "Vec<Reference>")]
pub struct References(Vec<Reference>);

impl References {
    pub fn new(entries: Vec<Reference>) -> Self {
        let mut references = Self(entries);
        references.normalize();
        references
    }

    pub fn entries(&self) -> &[Reference] {
        &self.0
    }

    /// The entries that are validated and submitted.
    pub fn required(&self) -> &[Reference] {
        let end = self.0.len().min(MIN_REFERENCES);
        &self.0[..end]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Reference> {
        &mut self.0
    }

    pub(crate) fn normalize(&mut self) {
        while self.0.len() < MIN_REFERENCES {
            self.0.push(Reference::default());
        }
    }
}

impl Default for References {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Reference>> for References {
    fn from(entries: Vec<Reference>) -> Self {
        Self::new(entries)
    }
}

impl From<References> for Vec<Reference> {
    fn from(references: References) -> Self {
        references.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub contact_number: String,
    pub email: String,
    pub organization: String,
    pub designation: String,
    pub how_they_know: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub aadhar_number: String,
    /// Stored upper-cased.
    pub pan_number: String,
    pub emergency_contact: String,
    #[serde(default)]
    pub documents: Documents,
    pub family_members: Vec<FamilyMember>,
}

impl Default for Identification {
    fn default() -> Self {
        Self {
            aadhar_number: String::new(),
            pan_number: String::new(),
            emergency_contact: String::new(),
            documents: Documents::default(),
            family_members: vec![FamilyMember::default(); MIN_FAMILY_MEMBERS],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub name: String,
    pub relationship: String,
    pub occupation: String,
    pub age: String,
    pub dependent: bool,
}

/// One of the five document upload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    ProfilePhoto,
    AadharFront,
    AadharBack,
    PanFront,
    PanBack,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 5] = [
        DocumentSlot::ProfilePhoto,
        DocumentSlot::AadharFront,
        DocumentSlot::AadharBack,
        DocumentSlot::PanFront,
        DocumentSlot::PanBack,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            DocumentSlot::ProfilePhoto => "profile_photo",
            DocumentSlot::AadharFront => "aadhar_front",
            DocumentSlot::AadharBack => "aadhar_back",
            DocumentSlot::PanFront => "pan_front",
            DocumentSlot::PanBack => "pan_back",
        }
    }

    /// Name used in candidate-facing notifications.
    pub const fn display_name(self) -> &'static str {
        match self {
            DocumentSlot::ProfilePhoto => "Profile photo",
            DocumentSlot::AadharFront => "Aadhaar card (front)",
            DocumentSlot::AadharBack => "Aadhaar card (back)",
            DocumentSlot::PanFront => "PAN card (front)",
            DocumentSlot::PanBack => "PAN card (back)",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|slot| slot.key().eq_ignore_ascii_case(&key))
    }
}

/// Lifecycle of a single document slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentState {
    #[default]
    Empty,
    LocalPreview {
        preview: String,
        previous: Option<String>,
    },
    Uploading {
        preview: String,
        previous: Option<String>,
    },
    Committed {
        url: String,
    },
}

impl DocumentState {
    /// Only committed uploads count as provided.
    pub fn durable_url(&self) -> Option<&str> {
        match self {
            DocumentState::Committed { url } => Some(url),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            DocumentState::LocalPreview { .. } | DocumentState::Uploading { .. }
        )
    }

    /// Collapses preview states back to the last durable value.
    pub fn settled(&self) -> DocumentState {
        match self {
            DocumentState::LocalPreview { previous, .. }
            | DocumentState::Uploading { previous, .. } => match previous {
                Some(url) => DocumentState::Committed { url: url.clone() },
                None => DocumentState::Empty,
            },
            other => other.clone(),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            DocumentState::Empty => "empty",
            DocumentState::LocalPreview { .. } => "local_preview",
            DocumentState::Uploading { .. } => "uploading",
            DocumentState::Committed { .. } => "committed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documents {
    profile_photo: DocumentState,
    aadhar_front: DocumentState,
    aadhar_back: DocumentState,
    pan_front: DocumentState,
    pan_back: DocumentState,
}

impl Documents {
    pub fn get(&self, slot: DocumentSlot) -> &DocumentState {
        match slot {
            DocumentSlot::ProfilePhoto => &self.profile_photo,
            DocumentSlot::AadharFront => &self.aadhar_front,
            DocumentSlot::AadharBack => &self.aadhar_back,
            DocumentSlot::PanFront => &self.pan_front,
            DocumentSlot::PanBack => &self.pan_back,
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: DocumentSlot) -> &mut DocumentState {
        match slot {
            DocumentSlot::ProfilePhoto => &mut self.profile_photo,
            DocumentSlot::AadharFront => &mut self.aadhar_front,
            DocumentSlot::AadharBack => &mut self.aadhar_back,
            DocumentSlot::PanFront => &mut self.pan_front,
            DocumentSlot::PanBack => &mut self.pan_back,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentSlot, &DocumentState)> {
        DocumentSlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    pub fn has_in_flight(&self) -> bool {
        self.iter().any(|(_, state)| state.is_in_flight())
    }

    /// Drops any preview/uploading state; used when rehydrating a draft.
    pub(crate) fn settle_in_flight(&mut self) {
        for slot in DocumentSlot::ALL {
            let settled = self.get(slot).settled();
            *self.slot_mut(slot) = settled;
        }
    }
}
