//! User record: the base of the composite user aggregate.

use super::{Address, Role};
use crate::serde_ext::{flexible_bool, timestamp, timestamp_opt};
use crate::{Record, RecordKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted user.
///
/// Columns are grouped by the aspect that writes them: base profile,
/// emergency contact, employer, and auth. `addresses` and `roles` are
/// relation slots filled by eager loading and are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default = "Uuid::now_v7")]
    pub user_id: Uuid,

    // ---- base profile ----
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub photo_url: Option<String>,

    // ---- emergency contact ----
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_relation: Option<String>,
    #[serde(default)]
    pub emergency_contact_email: Option<String>,
    #[serde(default)]
    pub emergency_contact_number: Option<String>,

    // ---- employer ----
    #[serde(default)]
    pub employer_name: Option<String>,
    #[serde(default)]
    pub occupation_status: Option<String>,
    #[serde(default)]
    pub occupation_email: Option<String>,
    #[serde(default)]
    pub occupation_phone: Option<String>,
    #[serde(default)]
    pub occupation_location: Option<String>,

    // ---- auth ----
    #[serde(default)]
    pub login_provider: Option<String>,
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default, with = "timestamp_opt")]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub verified: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_subscribed: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_disabled: bool,

    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub updated_at: DateTime<Utc>,

    // ---- relation slots ----
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
}

impl User {
    /// Returns the display name built from the name parts that are set.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Returns true if a role with `alias` is loaded on this user.
    #[must_use]
    pub fn has_role(&self, alias: &str) -> bool {
        self.roles.iter().any(|role| role.alias == alias)
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const ENTITY_TYPE: &'static str = "User";
    const PRIMARY_KEY: &'static str = "user_id";
    const FIELDS: &'static [&'static str] = &[
        "user_id",
        "email",
        "first_name",
        "middle_name",
        "last_name",
        "phone_number",
        "gender",
        "date_of_birth",
        "photo_url",
        "emergency_contact_name",
        "emergency_contact_relation",
        "emergency_contact_email",
        "emergency_contact_number",
        "employer_name",
        "occupation_status",
        "occupation_email",
        "occupation_phone",
        "occupation_location",
        "login_provider",
        "reset_token",
        "reset_token_expiry",
        "verified",
        "is_subscribed",
        "is_disabled",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.user_id)
    }

    fn touch(&mut self) {
        self.updated_at = timestamp::now();
    }

    fn carry_relations(&mut self, previous: &mut Self) {
        self.addresses = std::mem::take(&mut previous.addresses);
        self.roles = std::mem::take(&mut previous.roles);
    }
}
