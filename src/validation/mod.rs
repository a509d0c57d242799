//! Input validation for the client forms
//!
//! This module handles:
//! - CPF/CNPJ checksum validation and display formatting
//! - Phone number length checks and formatting
//! - Latitude/longitude parsing for prediction requests
//! - Whole-form validation for login, registration and profile updates
//!
//! Every check here is total: malformed input yields `false`, `None`, or an
//! unformatted passthrough, never a panic.

pub mod coordinates;
pub mod document;
pub mod forms;
pub mod phone;

pub use coordinates::{parse_coordinate, Axis, Coordinates};
pub use document::{
    detect_kind, format_cnpj, format_cpf, format_document, is_valid_cnpj, is_valid_cpf,
    is_valid_document, DocumentKind,
};
pub use forms::{FieldError, LoginForm, ProfileUpdateForm, RegistrationForm};
pub use phone::{format_phone, is_valid_phone};

/// Strip every non-digit character.
pub fn clean_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when every digit equals the first one (e.g. "11111111111").
pub(crate) fn all_same_digit(digits: &[u8]) -> bool {
    match digits.first() {
        Some(first) => digits.iter().all(|d| d == first),
        None => true,
    }
}

/// Convert a cleaned digit string to numeric values.
pub(crate) fn to_digits(cleaned: &str) -> Vec<u8> {
    cleaned.bytes().map(|b| b - b'0').collect()
}
