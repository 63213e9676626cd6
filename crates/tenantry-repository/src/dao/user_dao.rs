//! Envelope-returning access to the composite user aggregate.
//!
//! Every method takes the session it runs on and converts internal failures
//! into a [`DaoResponse`]; no raw error crosses this boundary.

use super::aspects::AspectOutcome;
use crate::session::Session;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tenantry_core::{Address, DaoResponse, FieldMap, Interface, RecordKey, User, Window};

/// A user together with the outcome of every aspect the call touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeUser {
    pub user: User,
    #[serde(default)]
    pub aspects: Vec<AspectOutcome>,
}

impl CompositeUser {
    /// A user reported without aspect outcomes.
    #[must_use]
    pub const fn bare(user: User) -> Self {
        Self {
            user,
            aspects: Vec::new(),
        }
    }

    /// Outcomes of the aspects that failed.
    pub fn failures(&self) -> impl Iterator<Item = &AspectOutcome> {
        self.aspects.iter().filter(|outcome| outcome.is_failed())
    }
}

/// Data access object for composite users.
#[async_trait]
pub trait UserDao: Interface + Send + Sync {
    /// Creates the base user and every aspect present in `payload`.
    ///
    /// An existing email fails with `"User already exists"` and returns the
    /// stored user. Aspect failures do not fail the call; they are reported
    /// in [`CompositeUser::aspects`].
    async fn create_composite(
        &self,
        session: &mut dyn Session,
        payload: &FieldMap,
    ) -> DaoResponse<CompositeUser>;

    /// Applies the base fields and aspects in `payload` to `existing`.
    async fn update_composite(
        &self,
        session: &mut dyn Session,
        existing: User,
        payload: &FieldMap,
    ) -> DaoResponse<CompositeUser>;

    /// Finds a user by id with addresses and roles loaded. A missing user is
    /// a success without data.
    async fn get(&self, session: &mut dyn Session, user_id: &RecordKey) -> DaoResponse<User>;

    /// Lists users within `window`.
    async fn get_all(&self, session: &mut dyn Session, window: Window) -> DaoResponse<Vec<User>>;

    /// Finds a user by email. A missing user is a success without data.
    async fn find_by_email(&self, session: &mut dyn Session, email: &str) -> DaoResponse<User>;

    /// Deletes a user and its association rows, returning the removed user.
    async fn delete(&self, session: &mut dyn Session, user_id: &RecordKey) -> DaoResponse<User>;

    /// Links the role `alias` to the user.
    async fn link_role(
        &self,
        session: &mut dyn Session,
        user_id: &RecordKey,
        alias: &str,
    ) -> DaoResponse<User>;

    /// Updates or creates-and-links an address for the user.
    async fn link_or_create_address(
        &self,
        session: &mut dyn Session,
        user_id: &RecordKey,
        payload: &FieldMap,
    ) -> DaoResponse<Address>;
}
