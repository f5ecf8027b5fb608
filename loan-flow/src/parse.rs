//! Lenient parsing and validation of the free-text answers.

use chrono::{Datelike, NaiveDate};

use crate::tasks::types::EmploymentType;

pub const MIN_TENURE_MONTHS: i64 = 6;
pub const MAX_TENURE_MONTHS: i64 = 84;
pub const MIN_ID_LENGTH: usize = 6;
const MIN_BIRTH_YEAR: i32 = 1900;

/// Keep only digits and decimal points, then parse what is left.
///
/// Currency symbols, separators and surrounding words are discarded, so
/// `"₹1,50,000"` is 150000 and `"about 12 months"` is 12.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Tenure in whole months (fraction truncated), if within the accepted range.
pub fn parse_tenure(text: &str) -> Option<u32> {
    let months = parse_number(text)?.trunc() as i64;
    (MIN_TENURE_MONTHS..=MAX_TENURE_MONTHS)
        .contains(&months)
        .then_some(months as u32)
}

/// Title-cased name, if the text has at least one alphabetic character.
pub fn normalize_name(text: &str) -> Option<String> {
    let text = text.trim();
    if !text.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(title_case(text))
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DobError {
    /// Not a `DD-MM-YYYY` calendar date
    Format,
    /// Before 1900 or after today
    OutOfRange,
}

pub fn parse_dob(text: &str, today: NaiveDate) -> Result<NaiveDate, DobError> {
    let date = NaiveDate::parse_from_str(text.trim(), "%d-%m-%Y")
        .map_err(|_| DobError::Format)?;
    if date.year() < MIN_BIRTH_YEAR || date > today {
        return Err(DobError::OutOfRange);
    }
    Ok(date)
}

pub fn is_valid_id_number(text: &str) -> bool {
    text.trim().chars().count() >= MIN_ID_LENGTH
}

pub fn parse_employment(text: &str) -> Option<EmploymentType> {
    let lower = text.to_lowercase();
    if lower.contains("salar") {
        Some(EmploymentType::Salaried)
    } else if lower.contains("self") {
        Some(EmploymentType::SelfEmployed)
    } else {
        None
    }
}
