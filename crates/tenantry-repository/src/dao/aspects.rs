//! Aspect registry for the composite user aggregate.
//!
//! Each aspect names the payload key it reads, the schema its fields are
//! projected through, and the handler that persists them. The table is
//! iterated in declaration order.

use crate::linker::project_address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tenantry_core::{
    DaoResult, FieldMap, Schema, UserAuthInfo, UserEmergencyInfo, UserEmployerInfo,
};

/// One named sub-facet of a composite user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    EmergencyInfo,
    EmployerInfo,
    AuthInfo,
    Address,
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmergencyInfo => "emergency_info",
            Self::EmployerInfo => "employer_info",
            Self::AuthInfo => "auth_info",
            Self::Address => "address",
        };
        f.write_str(name)
    }
}

/// What happened to one aspect during a composite operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum AspectStatus {
    /// The aspect's fields were persisted.
    Applied,
    /// The payload carried nothing for this aspect.
    Skipped,
    /// The aspect failed; the rest of the operation went ahead.
    Failed(String),
}

/// Per-aspect result reported beside the composite record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectOutcome {
    pub aspect: Aspect,
    #[serde(flatten)]
    pub status: AspectStatus,
}

impl AspectOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, AspectStatus::Failed(_))
    }
}

/// How an aspect's projected fields are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AspectHandler {
    /// Merge into the base user row.
    UserColumns,
    /// Update or create-and-link an address owned by the user.
    LinkAddress,
}

type Projector = fn(&FieldMap, &'static str) -> DaoResult<Option<FieldMap>>;

pub(crate) struct AspectSpec {
    pub aspect: Aspect,
    pub payload_key: &'static str,
    pub project: Projector,
    pub handler: AspectHandler,
}

fn project_nested<S: Schema>(payload: &FieldMap, key: &'static str) -> DaoResult<Option<FieldMap>> {
    S::project(payload, Some(key))
}

fn project_nested_address(payload: &FieldMap, key: &'static str) -> DaoResult<Option<FieldMap>> {
    match payload.get(key) {
        Some(Value::Object(nested)) => project_address(nested),
        _ => Ok(None),
    }
}

pub(crate) static ASPECTS: [AspectSpec; 4] = [
    AspectSpec {
        aspect: Aspect::EmergencyInfo,
        payload_key: "user_emergency_info",
        project: project_nested::<UserEmergencyInfo>,
        handler: AspectHandler::UserColumns,
    },
    AspectSpec {
        aspect: Aspect::EmployerInfo,
        payload_key: "user_employer_info",
        project: project_nested::<UserEmployerInfo>,
        handler: AspectHandler::UserColumns,
    },
    AspectSpec {
        aspect: Aspect::AuthInfo,
        payload_key: "user_auth_info",
        project: project_nested::<UserAuthInfo>,
        handler: AspectHandler::UserColumns,
    },
    AspectSpec {
        aspect: Aspect::Address,
        payload_key: "address",
        project: project_nested_address,
        handler: AspectHandler::LinkAddress,
    },
];
