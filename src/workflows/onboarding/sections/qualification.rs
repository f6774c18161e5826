use super::{ValidationContext, ValidationReport, Validatable};
use crate::workflows::onboarding::domain::{Qualification, WizardStep};
use crate::workflows::onboarding::validators::{self, FieldFailure};

/// Upper bound for a single work experience entry, in years.
pub const MAX_EXPERIENCE_YEARS: i64 = 50;

impl Validatable for Qualification {
    fn step(&self) -> WizardStep {
        WizardStep::Qualification
    }

    fn validate(&self, _ctx: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport::new(self.step());

        report.check(
            "highest_qualification",
            "Highest qualification",
            self.highest_qualification
                .map(|_| ())
                .ok_or(FieldFailure::Required),
        );

        for (index, entry) in self.work_experience.iter().enumerate() {
            let position = index + 1;
            report.check(
                format!("work_experience[{index}].company_name"),
                format!("Experience {position} company name"),
                validators::required(&entry.company_name),
            );
            report.check(
                format!("work_experience[{index}].years"),
                format!("Experience {position} years"),
                validators::integer_in_range(&entry.years, 0..=MAX_EXPERIENCE_YEARS),
            );
        }

        report
    }
}
