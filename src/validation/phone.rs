//! Phone numbers: area code plus 8 or 9 digit subscriber number.

use super::clean_number;

/// Landline: 2-digit area code + 8 digits.
const LANDLINE_LENGTH: usize = 10;

/// Mobile: 2-digit area code + 9 digits.
const MOBILE_LENGTH: usize = 11;

pub fn is_valid_phone(raw: &str) -> bool {
    let len = clean_number(raw).len();
    (LANDLINE_LENGTH..=MOBILE_LENGTH).contains(&len)
}

/// Format as `(XX)XXXXX-XXXX` (mobile) or `(XX)XXXX-XXXX` (landline).
/// Any other digit count returns the input unchanged.
pub fn format_phone(raw: &str) -> String {
    let n = clean_number(raw);
    match n.len() {
        MOBILE_LENGTH => format!("({}){}-{}", &n[0..2], &n[2..7], &n[7..]),
        LANDLINE_LENGTH => format!("({}){}-{}", &n[0..2], &n[2..6], &n[6..]),
        _ => raw.to_string(),
    }
}
