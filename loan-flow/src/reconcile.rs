//! Salary slip reconciliation.
//!
//! Nothing here reads the document for real: the salary is whatever long
//! digit run shows up in the file name or, failing that, in the file bytes.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::{eligibility::EligibilityPolicy, task::Upload};

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{3,9}").expect("digit run pattern is valid"));

/// Where the detected salary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalarySource {
    FileName,
    FileContent,
    /// Nothing usable found; registered income assumed
    Assumed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryCheck {
    pub detected: f64,
    /// Detected value as a monthly figure
    pub monthly: f64,
    pub source: SalarySource,
    pub within_tolerance: bool,
}

/// Longest run of 3–9 digits in `text` (first one wins a tie).
pub fn longest_digit_run(text: &str) -> Option<f64> {
    let mut best: Option<&str> = None;
    for m in DIGIT_RUN.find_iter(text) {
        if best.is_none_or(|b| m.as_str().len() > b.len()) {
            best = Some(m.as_str());
        }
    }
    best.and_then(|digits| digits.parse().ok())
}

/// Decode bytes with the first candidate encoding that accepts them:
/// UTF-8, then UTF-16 (byte order mark required), then Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    if let Some(text) = decode_utf16(bytes) {
        return text;
    }
    bytes.iter().copied().map(char::from).collect()
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, little_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, true),
        [0xFE, 0xFF, rest @ ..] => (rest, false),
        _ => return None,
    };
    if body.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

/// Salary figure found in the upload, file name first.
pub fn detect_salary(upload: &Upload) -> Option<(f64, SalarySource)> {
    if let Some(value) = longest_digit_run(&upload.file_name) {
        return Some((value, SalarySource::FileName));
    }
    longest_digit_run(&decode_text(&upload.bytes)).map(|value| (value, SalarySource::FileContent))
}

/// Compare the salary on the slip against `registered_income`.
///
/// Returns `None` when there is no positive registered income to compare with.
pub fn reconcile(
    policy: &EligibilityPolicy,
    registered_income: f64,
    upload: &Upload,
) -> Option<SalaryCheck> {
    if registered_income <= 0.0 {
        return None;
    }

    let (detected, source) = match detect_salary(upload) {
        Some((value, source)) if value <= policy.max_plausible_salary => (value, source),
        Some((value, _)) => {
            debug!(value, "Discarding implausible salary figure");
            (registered_income, SalarySource::Assumed)
        }
        None => (registered_income, SalarySource::Assumed),
    };

    let monthly = if detected > policy.annual_salary_multiplier * registered_income {
        detected / 12.0
    } else {
        detected
    };

    let low = registered_income * (1.0 - policy.salary_tolerance);
    let high = registered_income * (1.0 + policy.salary_tolerance);

    Some(SalaryCheck {
        detected,
        monthly,
        source,
        within_tolerance: (low..=high).contains(&monthly),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn longest_run_wins_and_ties_keep_first() {
        assert_eq!(longest_digit_run("slip_2024_52000.pdf"), Some(52000.0));
        assert_eq!(longest_digit_run("a123b456"), Some(123.0));
        assert_eq!(longest_digit_run("no digits 12"), None);
        // a 12 digit run splits into 9 + 3
        assert_eq!(longest_digit_run("123456789012"), Some(123456789.0));
    }

    #[test]
    fn file_name_takes_precedence_over_content() {
        let found = detect_salary(&upload("salary_48000.pdf", b"Net pay 99999"));
        assert_eq!(found, Some((48000.0, SalarySource::FileName)));

        let found = detect_salary(&upload("slip.pdf", b"Net pay: 51,000 -> 51000"));
        assert_eq!(found, Some((51000.0, SalarySource::FileContent)));
    }

    #[test]
    fn content_decoding_falls_back_through_encodings() {
        let utf16: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("Net 47000".encode_utf16().flat_map(u16::to_le_bytes))
            .collect();
        assert_eq!(decode_text(&utf16), "Net 47000");

        let latin1 = [b'P', b'a', b'y', 0xA3, b'5', b'5', b'0', b'0', b'0', 0xFF];
        assert_eq!(longest_digit_run(&decode_text(&latin1)), Some(55000.0));
    }

    #[test]
    fn annual_figures_are_divided_by_twelve() {
        let policy = EligibilityPolicy::default();
        let check = reconcile(&policy, 50_000.0, &upload("ctc_600000.pdf", b"")).unwrap();
        assert_eq!(check.monthly, 50_000.0);
        assert!(check.within_tolerance);

        // 8x exactly stays monthly
        let check = reconcile(&policy, 50_000.0, &upload("400000.pdf", b"")).unwrap();
        assert_eq!(check.monthly, 400_000.0);
        assert!(!check.within_tolerance);
    }

    #[test]
    fn tolerance_band_is_inclusive() {
        let policy = EligibilityPolicy::default();
        for (name, inside) in [
            ("35000.pdf", true),
            ("65000.pdf", true),
            ("34999.pdf", false),
            ("65001.pdf", false),
        ] {
            let check = reconcile(&policy, 50_000.0, &upload(name, b"")).unwrap();
            assert_eq!(check.within_tolerance, inside, "{name}");
        }
    }

    #[test]
    fn missing_or_implausible_figures_assume_registered_income() {
        let policy = EligibilityPolicy::default();
        let check = reconcile(&policy, 50_000.0, &upload("slip.pdf", b"no numbers")).unwrap();
        assert_eq!(check.source, SalarySource::Assumed);
        assert!(check.within_tolerance);

        let check = reconcile(&policy, 50_000.0, &upload("987654321.pdf", b"")).unwrap();
        assert_eq!(check.source, SalarySource::Assumed);
        assert_eq!(check.monthly, 50_000.0);
    }

    #[test]
    fn no_registered_income_cannot_reconcile() {
        let policy = EligibilityPolicy::default();
        assert!(reconcile(&policy, 0.0, &upload("50000.pdf", b"")).is_none());
    }
}
