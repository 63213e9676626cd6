//! Address record and its polymorphic owner association.

use crate::serde_ext::{flexible_bool, timestamp};
use crate::{Record, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A postal address that one or more owners link to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default = "Uuid::now_v7")]
    pub address_id: Uuid,
    #[serde(default)]
    pub address_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub street_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Address {
    const TABLE: &'static str = "addresses";
    const ENTITY_TYPE: &'static str = "Address";
    const PRIMARY_KEY: &'static str = "address_id";
    const FIELDS: &'static [&'static str] = &[
        "address_id",
        "address_type",
        "title",
        "street",
        "street_2",
        "city",
        "region",
        "country",
        "postal_code",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.address_id)
    }

    fn touch(&mut self) {
        self.updated_at = timestamp::now();
    }
}

/// Association between any owner record and an address.
///
/// The owner is identified by its type discriminant plus its key rather than
/// a typed foreign key, so one table serves every owner kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAddress {
    #[serde(default = "Uuid::now_v7")]
    pub entity_address_id: Uuid,
    pub entity_type: String,
    pub entity_id: RecordKey,
    pub address_id: Uuid,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub emergency_address: bool,
    #[serde(default)]
    pub emergency_address_hash: String,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl EntityAddress {
    /// Returns true if this link belongs to the owner of type `O` with `owner_id`.
    #[must_use]
    pub fn is_owned_by<O: Record>(&self, owner_id: &RecordKey) -> bool {
        self.entity_type == O::ENTITY_TYPE && &self.entity_id == owner_id
    }
}

impl Record for EntityAddress {
    const TABLE: &'static str = "entity_address";
    const ENTITY_TYPE: &'static str = "EntityAddress";
    const PRIMARY_KEY: &'static str = "entity_address_id";
    const FIELDS: &'static [&'static str] = &[
        "entity_address_id",
        "entity_type",
        "entity_id",
        "address_id",
        "emergency_address",
        "emergency_address_hash",
        "created_at",
    ];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.entity_address_id)
    }
}
