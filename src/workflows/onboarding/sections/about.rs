use super::{ValidationContext, ValidationReport, Validatable};
use crate::workflows::onboarding::domain::{About, WizardStep};
use crate::workflows::onboarding::validators;

/// Word floor applied to each narrative answer.
pub const MIN_NARRATIVE_WORDS: usize = 50;

impl Validatable for About {
    fn step(&self) -> WizardStep {
        WizardStep::About
    }

    fn validate(&self, _ctx: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport::new(self.step());

        let narratives = [
            ("motivation", "Motivation", &self.motivation),
            ("experience", "Experience", &self.experience),
            ("aspirations", "Aspirations", &self.aspirations),
        ];
        for (field, label, answer) in narratives {
            report.check(field, label, validators::min_words(answer, MIN_NARRATIVE_WORDS));
        }

        report.check(
            "hours_per_day",
            "Hours per day",
            validators::integer_in_range(&self.hours_per_day, 1..=24),
        );
        report.check(
            "interests",
            "Interests",
            validators::non_empty_selection(self.interests.len()),
        );
        report.check(
            "joining_availability_days",
            "Joining availability (days)",
            validators::integer_in_range(&self.joining_availability_days, 0..=365),
        );

        report
    }
}
