//! Section models: each slice of the draft validates itself against the field rules.

mod about;
mod identification;
mod personal;
mod qualification;
mod references;

pub use about::MIN_NARRATIVE_WORDS;
pub use qualification::MAX_EXPERIENCE_YEARS;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::domain::{Draft, WizardStep};
use super::validators::{FieldFailure, FieldResult};

/// Capability the wizard controller pulls from every section.
pub trait Validatable {
    fn step(&self) -> WizardStep;
    fn validate(&self, ctx: &ValidationContext) -> ValidationReport;
}

/// Inputs validators need beyond the field values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub today: NaiveDate,
    /// When set, family members beyond the first three are validated too.
    pub validate_all_family_members: bool,
}

impl ValidationContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            validate_all_family_members: false,
        }
    }

    pub fn current() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn with_all_family_members(mut self, enabled: bool) -> Self {
        self.validate_all_family_members = enabled;
        self
    }
}

/// A rule over a whole collection rather than one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListViolation {
    #[error("each reference needs a different contact number")]
    DuplicateContactNumbers,
    #[error("each reference needs a different email address")]
    DuplicateEmails,
    #[error("at least {min} references are required (found {found})")]
    TooFewReferences { min: usize, found: usize },
    #[error("at least {min} family members are required (found {found})")]
    TooFewFamilyMembers { min: usize, found: usize },
    #[error("no more than {max} family members can be listed (found {found})")]
    TooManyFamilyMembers { max: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Stable path such as `references[1].email`.
    pub field: String,
    /// Human label used in notifications.
    pub label: String,
    pub failure: FieldFailure,
}

impl FieldError {
    pub fn message(&self) -> String {
        format!("{} {}", self.label, self.failure)
    }
}

/// Outcome of validating one section. Each run produces a fresh report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub step: WizardStep,
    pub list_violations: Vec<ListViolation>,
    pub field_errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new(step: WizardStep) -> Self {
        Self {
            step,
            list_violations: Vec::new(),
            field_errors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.list_violations.is_empty() && self.field_errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.list_violations.len() + self.field_errors.len()
    }

    pub fn field_error(&self, field: &str) -> Option<&FieldError> {
        self.field_errors.iter().find(|error| error.field == field)
    }

    pub fn field_messages(&self) -> Vec<String> {
        self.field_errors.iter().map(FieldError::message).collect()
    }

    /// All list violations folded into one message, if there are any.
    pub fn list_message(&self) -> Option<String> {
        if self.list_violations.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .list_violations
            .iter()
            .map(ToString::to_string)
            .collect();
        Some(capitalize(&parts.join("; ")))
    }

    pub(crate) fn check(
        &mut self,
        field: impl Into<String>,
        label: impl Into<String>,
        result: FieldResult,
    ) {
        if let Err(failure) = result {
            self.field_errors.push(FieldError {
                field: field.into(),
                label: label.into(),
                failure,
            });
        }
    }

    pub(crate) fn violate(&mut self, violation: ListViolation) {
        self.list_violations.push(violation);
    }
}

/// Validates every section of the draft in wizard order.
pub fn validate_draft(draft: &Draft, ctx: &ValidationContext) -> Vec<ValidationReport> {
    WizardStep::ALL
        .into_iter()
        .map(|step| section_for(draft, step).validate(ctx))
        .collect()
}

/// Section model backing a wizard step.
pub fn section_for(draft: &Draft, step: WizardStep) -> &dyn Validatable {
    match step {
        WizardStep::PersonalDetails => &draft.personal_details,
        WizardStep::Qualification => &draft.qualification,
        WizardStep::About => &draft.about,
        WizardStep::References => &draft.references,
        WizardStep::Identification => &draft.identification,
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
