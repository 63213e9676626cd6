//! Roles and the user-role join.

use crate::serde_ext::timestamp;
use crate::{Record, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named role, addressed by its unique alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default = "Uuid::now_v7")]
    pub role_id: Uuid,
    pub alias: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a role with a fresh id.
    #[must_use]
    pub fn new(alias: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            role_id: Uuid::now_v7(),
            alias: alias.into(),
            name: name.map(ToString::to_string),
            description: None,
            created_at: timestamp::now(),
        }
    }
}

impl Record for Role {
    const TABLE: &'static str = "roles";
    const ENTITY_TYPE: &'static str = "Role";
    const PRIMARY_KEY: &'static str = "role_id";
    const FIELDS: &'static [&'static str] = &["role_id", "alias", "name", "description", "created_at"];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.role_id)
    }
}

/// Join row linking a user to a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleLink {
    #[serde(default = "Uuid::now_v7")]
    pub link_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Record for UserRoleLink {
    const TABLE: &'static str = "user_roles";
    const ENTITY_TYPE: &'static str = "UserRoleLink";
    const PRIMARY_KEY: &'static str = "link_id";
    const FIELDS: &'static [&'static str] = &["link_id", "user_id", "role_id", "created_at"];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.link_id)
    }
}
