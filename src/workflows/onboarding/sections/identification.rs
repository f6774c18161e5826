use super::{ListViolation, ValidationContext, ValidationReport, Validatable};
use crate::workflows::onboarding::domain::{
    Identification, WizardStep, MAX_FAMILY_MEMBERS, MIN_FAMILY_MEMBERS,
};
use crate::workflows::onboarding::validators;

impl Validatable for Identification {
    fn step(&self) -> WizardStep {
        WizardStep::Identification
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport::new(self.step());

        report.check(
            "aadhar_number",
            "Aadhaar number",
            validators::aadhar_number(&self.aadhar_number),
        );
        report.check("pan_number", "PAN", validators::pan_number(&self.pan_number));
        report.check(
            "emergency_contact",
            "Emergency contact",
            validators::mobile_number(&self.emergency_contact),
        );

        let count = self.family_members.len();
        if count < MIN_FAMILY_MEMBERS {
            report.violate(ListViolation::TooFewFamilyMembers {
                min: MIN_FAMILY_MEMBERS,
                found: count,
            });
            return report;
        }
        if count > MAX_FAMILY_MEMBERS {
            report.violate(ListViolation::TooManyFamilyMembers {
                max: MAX_FAMILY_MEMBERS,
                found: count,
            });
            return report;
        }

        // Members past the minimum are collected but only checked when the policy asks for it.
        let checked = if ctx.validate_all_family_members {
            count
        } else {
            MIN_FAMILY_MEMBERS
        };
        for (index, member) in self.family_members.iter().take(checked).enumerate() {
            let position = index + 1;
            report.check(
                format!("family_members[{index}].name"),
                format!("Family member {position} name"),
                validators::person_name(&member.name),
            );
            report.check(
                format!("family_members[{index}].relationship"),
                format!("Family member {position} relationship"),
                validators::required(&member.relationship),
            );
            report.check(
                format!("family_members[{index}].occupation"),
                format!("Family member {position} occupation"),
                validators::required(&member.occupation),
            );
            report.check(
                format!("family_members[{index}].age"),
                format!("Family member {position} age"),
                validators::integer_in_range(&member.age, 1..=120),
            );
        }

        report
    }
}
