//! Unified error taxonomy for the data-access layer.

use std::fmt::Debug;
use thiserror::Error;

/// Error type shared by every layer between the request handlers and storage.
///
/// Internal layers propagate it with `?`; the public DAO boundaries convert it
/// into a [`DaoResponse`](crate::DaoResponse) so callers never see a raw error.
#[derive(Error, Debug)]
pub enum DaoError {
    // ============ Payload Errors ============
    /// Payload failed schema projection or validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A filter or field name that the record type does not declare.
    #[error("Unknown field '{field}' for {resource_type}")]
    UnknownField {
        resource_type: &'static str,
        field: String,
    },

    // ============ Lookup Errors ============
    /// A lookup that required presence yielded nothing.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// A single-result query matched more than one row.
    #[error("Ambiguous result: {matched} {resource_type} rows matched a single-result query")]
    AmbiguousResult {
        resource_type: &'static str,
        matched: usize,
    },

    // ============ Precondition Errors ============
    /// Uniqueness precondition violated.
    #[error("{0}")]
    AlreadyExists(String),

    /// Association precondition violated.
    #[error("{0}")]
    AlreadyLinked(String),

    // ============ Infrastructure Errors ============
    /// Storage failed while executing or committing.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected failure that aborted an orchestrated operation.
    #[error("Fatal {0}")]
    Fatal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DaoError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AmbiguousResult { .. } => "AMBIGUOUS_RESULT",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::AlreadyLinked(_) => "ALREADY_LINKED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Fatal(_) => "FATAL",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage<T: Into<String>>(message: T) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a fatal error wrapping any displayable cause.
    #[must_use]
    pub fn fatal<T: std::fmt::Display>(cause: T) -> Self {
        Self::Fatal(cause.to_string())
    }

    /// Returns true for payload-shape failures, which travel in the
    /// envelope's `validation_error` slot.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true for failures raised by the storage engine.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for DaoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    if code == "23505" || code == "1062" {
                        // PostgreSQL / MySQL unique violation
                        return Self::AlreadyExists(db_err.message().to_string());
                    }
                }
                Self::Storage(err.to_string())
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON conversion error: {}", err))
    }
}
