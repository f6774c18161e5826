use super::{ValidationContext, ValidationReport, Validatable};
use crate::workflows::onboarding::domain::{Address, PersonalDetails, WizardStep};
use crate::workflows::onboarding::validators::{self, FieldFailure};

impl Validatable for PersonalDetails {
    fn step(&self) -> WizardStep {
        WizardStep::PersonalDetails
    }

    fn validate(&self, ctx: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport::new(self.step());

        report.check("full_name", "Full name", validators::person_name(&self.full_name));
        report.check(
            "date_of_birth",
            "Date of birth",
            validators::date_of_birth(&self.date_of_birth, ctx.today),
        );
        report.check(
            "gender",
            "Gender",
            self.gender.map(|_| ()).ok_or(FieldFailure::Required),
        );
        report.check("phone", "Phone number", validators::mobile_number(&self.phone));
        report.check(
            "whatsapp_number",
            "WhatsApp number",
            validators::mobile_number(&self.whatsapp_number),
        );
        report.check("email", "Email", validators::email(&self.email));

        check_address(&mut report, "current_address", "Current address", &self.current_address);
        if !self.permanent_same_as_current {
            check_address(
                &mut report,
                "permanent_address",
                "Permanent address",
                &self.permanent_address,
            );
        }

        report.check(
            "languages",
            "Languages",
            validators::non_empty_selection(self.languages.len()),
        );
        report.check(
            "apply_for",
            "Apply for",
            self.apply_for.map(|_| ()).ok_or(FieldFailure::Required),
        );

        report
    }
}

fn check_address(report: &mut ValidationReport, prefix: &str, label: &str, address: &Address) {
    let text_fields = [
        ("building", "building", &address.building),
        ("street", "street", &address.street),
        ("area", "area", &address.area),
        ("city", "city", &address.city),
        ("state", "state", &address.state),
    ];
    for (key, name, value) in text_fields {
        report.check(
            format!("{prefix}.{key}"),
            format!("{label} {name}"),
            validators::required(value),
        );
    }
    report.check(
        format!("{prefix}.pincode"),
        format!("{label} pincode"),
        validators::pincode(&address.pincode),
    );
}
