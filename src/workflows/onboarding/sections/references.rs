use std::collections::HashSet;

use super::{ListViolation, ValidationContext, ValidationReport, Validatable};
use crate::workflows::onboarding::domain::{Reference, References, WizardStep, MIN_REFERENCES};
use crate::workflows::onboarding::validators;

impl Validatable for References {
    fn step(&self) -> WizardStep {
        WizardStep::References
    }

    fn validate(&self, _ctx: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport::new(self.step());

        if self.len() < MIN_REFERENCES {
            report.violate(ListViolation::TooFewReferences {
                min: MIN_REFERENCES,
                found: self.len(),
            });
            return report;
        }

        // List-wide uniqueness short-circuits the per-field checks.
        if has_duplicates(self.entries(), |reference| {
            reference.contact_number.trim().to_string()
        }) {
            report.violate(ListViolation::DuplicateContactNumbers);
            return report;
        }
        if has_duplicates(self.entries(), |reference| {
            reference.email.trim().to_lowercase()
        }) {
            report.violate(ListViolation::DuplicateEmails);
            return report;
        }

        for (index, reference) in self.required().iter().enumerate() {
            let position = index + 1;
            let fields = [
                ("name", "name", validators::person_name(&reference.name)),
                (
                    "contact_number",
                    "contact number",
                    validators::mobile_number(&reference.contact_number),
                ),
                ("email", "email", validators::email(&reference.email)),
                (
                    "organization",
                    "organization",
                    validators::required(&reference.organization),
                ),
                (
                    "designation",
                    "designation",
                    validators::required(&reference.designation),
                ),
                (
                    "how_they_know",
                    "relationship",
                    validators::required(&reference.how_they_know),
                ),
            ];
            for (key, name, result) in fields {
                report.check(
                    format!("references[{index}].{key}"),
                    format!("Reference {position} {name}"),
                    result,
                );
            }
        }

        report
    }
}

/// Blank values are ignored; they are reported by the per-field checks.
fn has_duplicates<F>(entries: &[Reference], key: F) -> bool
where
    F: Fn(&Reference) -> String,
{
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(key)
        .filter(|value| !value.is_empty())
        .any(|value| !seen.insert(value))
}
