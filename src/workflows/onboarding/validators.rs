//! Field-level predicates shared by the section models.
//!
//! Every validator is total: malformed input is reported through [`FieldFailure`],
//! never by panicking.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern compiles");
    static ref MOBILE_PATTERN: Regex =
        Regex::new(r"^[6-9][0-9]{9}$").expect("mobile pattern compiles");
    static ref PINCODE_PATTERN: Regex =
        Regex::new(r"^[1-9][0-9]{5}$").expect("pincode pattern compiles");
    static ref AADHAR_PATTERN: Regex = Regex::new(r"^[0-9]{12}$").expect("aadhar pattern compiles");
    static ref PAN_PATTERN: Regex =
        Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("pan pattern compiles");
    static ref NAME_PATTERN: Regex =
        Regex::new(r"^[\p{L}][\p{L} .'-]*$").expect("name pattern compiles");
}

/// Reason a single field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldFailure {
    #[error("is required")]
    Required,
    #[error("must be a whole number")]
    NotAnInteger,
    #[error("must be between {min} and {max}")]
    OutOfRange { min: i64, max: i64 },
    #[error("must contain at least {min} words (currently {found})")]
    TooFewWords { min: usize, found: usize },
    #[error("is not a valid {expected}")]
    InvalidFormat { expected: &'static str },
    #[error("cannot be in the future")]
    DateInFuture,
    #[error("needs at least one selection")]
    NothingSelected,
}

pub type FieldResult = Result<(), FieldFailure>;

pub fn required(value: &str) -> FieldResult {
    if value.trim().is_empty() {
        Err(FieldFailure::Required)
    } else {
        Ok(())
    }
}

/// Counts whitespace-separated, non-empty tokens.
pub fn word_count(value: &str) -> usize {
    value.split_whitespace().count()
}

pub fn min_words(value: &str, min: usize) -> FieldResult {
    required(value)?;
    let found = word_count(value);
    if found < min {
        Err(FieldFailure::TooFewWords { min, found })
    } else {
        Ok(())
    }
}

/// Empty input, non-integers, and out-of-range integers fail with distinct reasons.
pub fn integer_in_range(value: &str, range: RangeInclusive<i64>) -> FieldResult {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldFailure::Required);
    }
    let parsed: i64 = trimmed.parse().map_err(|_| FieldFailure::NotAnInteger)?;
    if range.contains(&parsed) {
        Ok(())
    } else {
        Err(FieldFailure::OutOfRange {
            min: *range.start(),
            max: *range.end(),
        })
    }
}

pub fn person_name(value: &str) -> FieldResult {
    matches_pattern(value, &NAME_PATTERN, "name")
}

pub fn mobile_number(value: &str) -> FieldResult {
    matches_pattern(value, &MOBILE_PATTERN, "10-digit mobile number")
}

pub fn email(value: &str) -> FieldResult {
    matches_pattern(value, &EMAIL_PATTERN, "email address")
}

pub fn pincode(value: &str) -> FieldResult {
    matches_pattern(value, &PINCODE_PATTERN, "6-digit pincode")
}

pub fn aadhar_number(value: &str) -> FieldResult {
    matches_pattern(value, &AADHAR_PATTERN, "12-digit Aadhaar number")
}

/// Checks the upper-cased form, so `abcde1234f` is accepted.
pub fn pan_number(value: &str) -> FieldResult {
    let normalized = normalize_pan(value);
    matches_pattern(&normalized, &PAN_PATTERN, "PAN (e.g. ABCDE1234F)")
}

pub fn normalize_pan(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

pub fn date_of_birth(value: &str, today: NaiveDate) -> FieldResult {
    required(value)?;
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        FieldFailure::InvalidFormat {
            expected: "date (YYYY-MM-DD)",
        }
    })?;
    if date.year() < 1900 {
        return Err(FieldFailure::InvalidFormat {
            expected: "date of birth",
        });
    }
    if date > today {
        return Err(FieldFailure::DateInFuture);
    }
    Ok(())
}

pub fn non_empty_selection(selected: usize) -> FieldResult {
    if selected == 0 {
        Err(FieldFailure::NothingSelected)
    } else {
        Ok(())
    }
}

fn matches_pattern(value: &str, pattern: &Regex, expected: &'static str) -> FieldResult {
    required(value)?;
    if pattern.is_match(value.trim()) {
        Ok(())
    } else {
        Err(FieldFailure::InvalidFormat { expected })
    }
}
