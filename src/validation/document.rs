//! Brazilian taxpayer document numbers (CPF and CNPJ).
//!
//! Both documents end in two check digits computed with mod-11 weighted
//! sums. Inputs may carry any punctuation; only the digits are considered.

use serde::{Deserialize, Serialize};

use super::{all_same_digit, clean_number, to_digits};
use crate::api::types::UserType;

/// Digits in a CPF (individual taxpayer registry).
pub const CPF_LENGTH: usize = 11;

/// Digits in a CNPJ (corporate taxpayer registry).
pub const CNPJ_LENGTH: usize = 14;

/// Which document a number is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Cpf,
    Cnpj,
}

impl DocumentKind {
    /// Students register with a CPF, companies with a CNPJ.
    pub fn for_user_type(user_type: UserType) -> Self {
        match user_type {
            UserType::Student => Self::Cpf,
            UserType::Company => Self::Cnpj,
        }
    }

    pub fn digit_count(&self) -> usize {
        match self {
            Self::Cpf => CPF_LENGTH,
            Self::Cnpj => CNPJ_LENGTH,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpf => write!(f, "CPF"),
            Self::Cnpj => write!(f, "CNPJ"),
        }
    }
}

/// Guess the document kind from the cleaned digit count.
pub fn detect_kind(raw: &str) -> Option<DocumentKind> {
    match clean_number(raw).len() {
        CPF_LENGTH => Some(DocumentKind::Cpf),
        CNPJ_LENGTH => Some(DocumentKind::Cnpj),
        _ => None,
    }
}

pub fn is_valid_document(kind: DocumentKind, raw: &str) -> bool {
    match kind {
        DocumentKind::Cpf => is_valid_cpf(raw),
        DocumentKind::Cnpj => is_valid_cnpj(raw),
    }
}

pub fn format_document(kind: DocumentKind, raw: &str) -> String {
    match kind {
        DocumentKind::Cpf => format_cpf(raw),
        DocumentKind::Cnpj => format_cnpj(raw),
    }
}

/// CPF check digit over `digits`, weights descending from `len + 1` to 2.
/// A remainder of 10 (or 11) maps to 0.
fn cpf_check_digit(digits: &[u8]) -> u8 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| d as u32 * (top - i as u32))
        .sum();

    let remainder = (sum * 10) % 11;
    if remainder >= 10 {
        0
    } else {
        remainder as u8
    }
}

/// Validate a CPF: 11 digits, not all identical, both check digits match.
pub fn is_valid_cpf(raw: &str) -> bool {
    let cleaned = clean_number(raw);
    if cleaned.len() != CPF_LENGTH {
        return false;
    }

    let digits = to_digits(&cleaned);
    if all_same_digit(&digits) {
        return false;
    }

    if cpf_check_digit(&digits[..9]) != digits[9] {
        return false;
    }
    cpf_check_digit(&digits[..10]) == digits[10]
}

/// CNPJ check digit over `digits`.
///
/// The weight pointer starts at `len - 7` and walks down one per digit,
/// wrapping back to 9 whenever it drops below 2.
fn cnpj_check_digit(digits: &[u8]) -> u8 {
    let mut pos = digits.len() as u32 - 7;
    let mut sum: u32 = 0;

    for &d in digits {
        sum += d as u32 * pos;
        pos -= 1;
        if pos < 2 {
            pos = 9;
        }
    }

    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        (11 - remainder) as u8
    }
}

/// Validate a CNPJ: 14 digits, not all identical, both check digits match.
pub fn is_valid_cnpj(raw: &str) -> bool {
    let cleaned = clean_number(raw);
    if cleaned.len() != CNPJ_LENGTH {
        return false;
    }

    let digits = to_digits(&cleaned);
    if all_same_digit(&digits) {
        return false;
    }

    if cnpj_check_digit(&digits[..12]) != digits[12] {
        return false;
    }
    cnpj_check_digit(&digits[..13]) == digits[13]
}

/// Format as `XXX.XXX.XXX-XX`, or return the input unchanged if it does not
/// hold exactly 11 digits.
pub fn format_cpf(raw: &str) -> String {
    let n = clean_number(raw);
    if n.len() != CPF_LENGTH {
        return raw.to_string();
    }
    format!("{}.{}.{}-{}", &n[0..3], &n[3..6], &n[6..9], &n[9..11])
}

/// Format as `XX.XXX.XXX/XXXX-XX`, or return the input unchanged if it does
/// not hold exactly 14 digits.
pub fn format_cnpj(raw: &str) -> String {
    let n = clean_number(raw);
    if n.len() != CNPJ_LENGTH {
        return raw.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &n[0..2],
        &n[2..5],
        &n[5..8],
        &n[8..12],
        &n[12..14]
    )
}
