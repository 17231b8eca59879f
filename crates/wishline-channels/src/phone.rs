//! Phone number normalization.
//!
//! Both WhatsApp providers expect the canonical Indian 10-digit form, so
//! numbers are cleaned before dispatch: formatting punctuation and the 91
//! country prefix are stripped, and the result must be exactly 10 digits
//! starting with 6, 7, 8, or 9.

use wishline_core::error::{Result, WishlineError};

/// Normalize a raw WhatsApp number to canonical 10 digits.
pub fn normalize_whatsapp_number(raw: &str) -> Result<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if stripped.is_empty() {
        return Err(WishlineError::Validation("empty phone number".into()));
    }

    let digits = stripped.strip_prefix('+').unwrap_or(&stripped);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WishlineError::Validation(format!(
            "phone number contains non-digit characters: {raw}"
        )));
    }

    let canonical = if digits.len() == 12 && digits.starts_with("91") {
        &digits[2..]
    } else {
        digits
    };

    if canonical.len() != 10 {
        return Err(WishlineError::Validation(format!(
            "phone number must be 10 digits: {raw}"
        )));
    }
    if !matches!(canonical.as_bytes()[0], b'6'..=b'9') {
        return Err(WishlineError::Validation(format!(
            "phone number must start with 6-9: {raw}"
        )));
    }

    Ok(canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ten_digit_numbers_pass_through() {
        for n in ["9876543210", "8765432109", "7654321098", "6543210987"] {
            assert_eq!(normalize_whatsapp_number(n).unwrap(), n);
        }
    }

    #[test]
    fn test_country_prefix_is_stripped() {
        assert_eq!(
            normalize_whatsapp_number("+919876543210").unwrap(),
            "9876543210"
        );
        assert_eq!(
            normalize_whatsapp_number("919876543210").unwrap(),
            "9876543210"
        );
    }

    #[test]
    fn test_formatting_punctuation_is_stripped() {
        assert_eq!(
            normalize_whatsapp_number("+91 98765 43210").unwrap(),
            "9876543210"
        );
        assert_eq!(
            normalize_whatsapp_number("(987) 654-3210").unwrap(),
            "9876543210"
        );
        assert_eq!(
            normalize_whatsapp_number("91-(876)-543-2109").unwrap(),
            "8765432109"
        );
        assert_eq!(
            normalize_whatsapp_number(" 9876543210 ").unwrap(),
            "9876543210"
        );
    }

    #[test]
    fn test_invalid_leading_digit_rejected() {
        for n in ["5876543210", "1234567890", "0876543210", "+915876543210"] {
            assert!(normalize_whatsapp_number(n).is_err(), "{n} should fail");
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        for n in [
            "98765",
            "987654321",
            "98765432101",
            "+9198765432101",
            "919876543210123",
        ] {
            assert!(normalize_whatsapp_number(n).is_err(), "{n} should fail");
        }
    }

    #[test]
    fn test_non_digit_characters_rejected() {
        for n in ["98765abc10", "9876.543.210", "9876#543210", ""] {
            assert!(normalize_whatsapp_number(n).is_err(), "{n:?} should fail");
        }
    }
}
