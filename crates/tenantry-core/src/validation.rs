//! Validation utilities.

use crate::DaoError;
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `DaoError` on failure.
    fn validate_payload(&self) -> Result<(), DaoError> {
        self.validate().map_err(validation_errors_to_dao_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Converts `validator::ValidationErrors` to `DaoError::Validation`,
/// flattening field errors into `field: message; field: message`.
#[must_use]
pub fn validation_errors_to_dao_error(errors: ValidationErrors) -> DaoError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                format!("{field}: {message}")
            })
        })
        .collect();
    messages.sort();

    DaoError::Validation(messages.join("; "))
}

/// Common validation functions.
pub mod rules {
    use validator::ValidationError;

    /// Validates that a string is not blank (not empty after trimming).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("not_blank"));
        }
        Ok(())
    }

    /// Validates a loose phone number: digits plus `+ - ( ) space`, at least 5 digits.
    pub fn phone_number(value: &str) -> Result<(), ValidationError> {
        let allowed = value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
        let digits = value.chars().filter(char::is_ascii_digit).count();
        if !allowed || digits < 5 {
            return Err(ValidationError::new("invalid_phone_number"));
        }
        Ok(())
    }
}
