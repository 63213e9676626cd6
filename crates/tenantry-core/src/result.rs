//! Result aliases and the outcome envelope returned at DAO boundaries.

use crate::DaoError;
use serde::{Deserialize, Serialize};

/// A specialized `Result` type for internal data-access operations.
pub type DaoResult<T> = Result<T, DaoError>;

/// Uniform outcome wrapper for every public DAO operation.
///
/// A successful envelope carries neither `error` nor `validation_error`.
/// A failed envelope carries exactly one of them, and may still carry `data`
/// when the failure is informational (for example "already exists", which
/// returns the prior state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl<T> DaoResponse<T> {
    /// Successful outcome with a payload.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            validation_error: None,
        }
    }

    /// Successful outcome with nothing to return (e.g. a lookup that matched no row).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            validation_error: None,
        }
    }

    /// Failed outcome with an error message.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            validation_error: None,
        }
    }

    /// Informational failure that still hands back the current state.
    #[must_use]
    pub fn failure_with(error: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.into()),
            validation_error: None,
        }
    }

    /// Failed outcome caused by an invalid payload shape.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: None,
            validation_error: Some(message.into()),
        }
    }

    /// Converts an error into the matching envelope slot.
    #[must_use]
    pub fn from_error(error: &DaoError) -> Self {
        match error {
            DaoError::Validation(message) => Self::validation(message.clone()),
            other => Self::failure(other.to_string()),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Maps the payload, keeping the outcome flags untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> DaoResponse<U> {
        DaoResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            validation_error: self.validation_error,
        }
    }
}

impl<T> From<DaoResult<T>> for DaoResponse<T> {
    fn from(result: DaoResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::from_error(&err),
        }
    }
}
