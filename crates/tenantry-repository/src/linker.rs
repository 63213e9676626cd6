//! Association linking between records.
//!
//! Links are checked before they are inserted so an association row is never
//! duplicated: role links go through the roles already loaded on the user,
//! address links through a query-or-create on the full association key.

use crate::relations::{Eager, UserRelation};
use crate::session::Session;
use crate::store::RecordStore;
use serde_json::Value;
use tenantry_config::DaoConfig;
use tenantry_core::{
    carries_address_id, Address, AddressBase, AddressSchema, DaoError, DaoResponse, DaoResult,
    EntityAddress, FieldMap, Record, RecordKey, Role, Schema, User, UserRoleLink, ADDRESS_ID_FIELD,
};
use tracing::{debug, info, warn};

fn filter(field: &str, value: impl Into<Value>) -> FieldMap {
    let mut filters = FieldMap::new();
    filters.insert(field.to_string(), value.into());
    filters
}

fn canonical_address_id(raw: &Value) -> DaoResult<Value> {
    RecordKey::from_value(raw)
        .and_then(|key| key.as_uuid())
        .map(|id| RecordKey::Uuid(id).to_value())
        .ok_or_else(|| DaoError::validation(format!("Address: invalid address_id {raw}")))
}

/// Projects an address payload through the schema its shape calls for: the
/// full shape when it names an `address_id`, the creation shape otherwise.
pub fn project_address(payload: &FieldMap) -> DaoResult<Option<FieldMap>> {
    if carries_address_id(payload) {
        AddressSchema::project(payload, None)
    } else {
        AddressBase::project(payload, None)
    }
}

/// Resolves role and address associations.
#[derive(Debug, Clone, Default)]
pub struct RelationLinker {
    users: RecordStore<User>,
    roles: RecordStore<Role>,
    user_roles: RecordStore<UserRoleLink>,
    addresses: RecordStore<Address>,
    entity_addresses: RecordStore<EntityAddress>,
}

impl RelationLinker {
    /// Creates a linker whose stores use the page sizes from `config`.
    #[must_use]
    pub fn with_config(config: &DaoConfig) -> Self {
        Self {
            users: RecordStore::with_config(config),
            roles: RecordStore::with_config(config),
            user_roles: RecordStore::with_config(config),
            addresses: RecordStore::with_config(config),
            entity_addresses: RecordStore::with_config(config),
        }
    }

    /// Links the role `alias` to the user `user_id`.
    ///
    /// A pair that is already linked fails with `"Role already exists for the
    /// user"` and hands back the user with its current roles.
    pub async fn link_role<S: Session + ?Sized>(
        &self,
        session: &mut S,
        user_id: &RecordKey,
        alias: &str,
    ) -> DaoResponse<User> {
        match self.try_link_role(session, user_id, alias).await {
            Ok(response) => response,
            Err(DaoError::NotFound { .. }) => DaoResponse::failure("User or Role not found"),
            Err(err) => {
                warn!("Linking role {} to user {} failed: {}", alias, user_id, err);
                DaoResponse::from_error(&err)
            }
        }
    }

    async fn try_link_role<S: Session + ?Sized>(
        &self,
        session: &mut S,
        user_id: &RecordKey,
        alias: &str,
    ) -> DaoResult<DaoResponse<User>> {
        let user = self
            .users
            .query_one(session, &filter(User::PRIMARY_KEY, user_id.to_value()), &[UserRelation::Roles])
            .await?;
        let role = self.roles.query_one(session, &filter("alias", alias), &[]).await?;

        let (Some(mut user), Some(role)) = (user, role) else {
            return Err(DaoError::not_found(User::ENTITY_TYPE, user_id));
        };

        if user.roles.iter().any(|linked| linked.role_id == role.role_id) {
            let linked = DaoError::AlreadyLinked("Role already exists for the user".to_string());
            return Ok(DaoResponse::failure_with(linked.to_string(), user));
        }

        let mut link = filter("user_id", user.user_id.to_string());
        link.insert("role_id".to_string(), Value::from(role.role_id.to_string()));
        self.user_roles.create(session, link).await?;

        user.load(session, UserRelation::Roles).await?;
        info!("Linked role {} to user {}", alias, user.user_id);
        Ok(DaoResponse::ok(user))
    }

    /// Links an address to the owner of type `O` identified by `owner_id`.
    pub async fn link_or_create_address<O: Record, S: Session + ?Sized>(
        &self,
        session: &mut S,
        owner_id: &RecordKey,
        payload: &FieldMap,
    ) -> DaoResponse<Address> {
        self.link_or_create_address_for(session, O::ENTITY_TYPE, owner_id, payload)
            .await
    }

    /// Updates the address the payload identifies, or creates a new address
    /// and binds it to `(entity_type, owner_id)`.
    ///
    /// An existing address is updated in place and its association is left
    /// as it is. Failures come back as an envelope, never as an error.
    pub async fn link_or_create_address_for<S: Session + ?Sized>(
        &self,
        session: &mut S,
        entity_type: &str,
        owner_id: &RecordKey,
        payload: &FieldMap,
    ) -> DaoResponse<Address> {
        match self.try_link_address(session, entity_type, owner_id, payload).await {
            Ok(address) => DaoResponse::ok(address),
            Err(err) if err.is_validation() => DaoResponse::from_error(&err),
            Err(err) => {
                warn!("Linking address to {} {} failed: {}", entity_type, owner_id, err);
                DaoResponse::failure(format!("An unexpected error occurred {}", err))
            }
        }
    }

    async fn try_link_address<S: Session + ?Sized>(
        &self,
        session: &mut S,
        entity_type: &str,
        owner_id: &RecordKey,
        payload: &FieldMap,
    ) -> DaoResult<Address> {
        let mut fields = project_address(payload)?
            .ok_or_else(|| DaoError::validation("Address payload declares no address fields"))?;

        let address_id = fields.get(ADDRESS_ID_FIELD).map(canonical_address_id).transpose()?;
        if let Some(address_id) = address_id {
            // Rows hold the hyphenated lowercase form
            fields.insert(ADDRESS_ID_FIELD.to_string(), address_id.clone());
            let existing = self
                .addresses
                .query_one(session, &filter(ADDRESS_ID_FIELD, address_id), &[])
                .await?;
            if let Some(address) = existing {
                debug!("Updating existing address {}", address.address_id);
                return self.addresses.update(session, address, &fields).await;
            }
        }

        let address = self.addresses.create(session, fields).await?;

        let mut link = filter("entity_type", entity_type);
        link.insert("entity_id".to_string(), owner_id.to_value());
        link.insert(
            "address_id".to_string(),
            Value::from(address.address_id.to_string()),
        );
        link.insert("emergency_address".to_string(), Value::Bool(false));
        link.insert("emergency_address_hash".to_string(), Value::from(""));
        self.entity_addresses
            .query_or_create(session, &link, true, true)
            .await?;

        info!("Linked address {} to {} {}", address.address_id, entity_type, owner_id);
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStore, Mutation};
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    async fn seeded(store: &MemoryStore) -> User {
        let mut session = store.session();
        let user = User::from_fields(fields(json!({ "email": "a@b.com" }))).unwrap();
        session.stage(Mutation::insert(&user).unwrap()).await.unwrap();
        session.stage(Mutation::insert(&Role::new("admin", None)).unwrap()).await.unwrap();
        session.commit().await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_link_role_twice_reports_already_linked() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        let mut session = store.session();
        let linker = RelationLinker::default();

        let first = linker.link_role(&mut session, &user.key(), "admin").await;
        let second = linker.link_role(&mut session, &user.key(), "admin").await;

        assert!(first.success);
        assert!(first.data().unwrap().has_role("admin"));
        assert!(!second.success);
        assert_eq!(second.error.as_deref(), Some("Role already exists for the user"));
        assert_eq!(second.data().unwrap().roles.len(), 1);
        assert_eq!(store.count("user_roles"), 1);
    }

    #[tokio::test]
    async fn test_link_role_unknown_alias() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        let mut session = store.session();

        let response = RelationLinker::default()
            .link_role(&mut session, &user.key(), "root")
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("User or Role not found"));
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_new_address_creates_address_and_link() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        let mut session = store.session();

        let response = RelationLinker::default()
            .link_or_create_address::<User, _>(
                &mut session,
                &user.key(),
                &fields(json!({ "street": "1 Main St", "city": "Springfield" })),
            )
            .await;

        assert!(response.success);
        assert_eq!(store.count("addresses"), 1);
        let links = store.rows("entity_address");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0]["entity_type"], json!("User"));
        assert_eq!(links[0]["entity_id"], user.key().to_value());
        assert_eq!(links[0]["emergency_address"], json!(false));
    }

    #[tokio::test]
    async fn test_known_address_is_updated_in_place() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        let mut session = store.session();
        let linker = RelationLinker::default();
        let created = linker
            .link_or_create_address::<User, _>(&mut session, &user.key(), &fields(json!({ "street": "1 Main St" })))
            .await
            .into_data()
            .unwrap();

        let updated = linker
            .link_or_create_address::<User, _>(
                &mut session,
                &user.key(),
                &fields(json!({ "address_id": created.address_id.to_string(), "street": "9 Elm St" })),
            )
            .await;

        assert!(updated.success);
        assert_eq!(updated.data().unwrap().address_id, created.address_id);
        assert_eq!(store.count("addresses"), 1);
        assert_eq!(store.count("entity_address"), 1);
        assert_eq!(store.rows("addresses")[0]["street"], json!("9 Elm St"));
    }

    #[tokio::test]
    async fn test_known_address_matches_any_uuid_spelling() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        let mut session = store.session();
        let linker = RelationLinker::default();
        let created = linker
            .link_or_create_address::<User, _>(&mut session, &user.key(), &fields(json!({ "street": "1 Main St" })))
            .await
            .into_data()
            .unwrap();

        let spellings = [
            created.address_id.to_string().to_uppercase(),
            created.address_id.simple().to_string(),
        ];
        for (n, address_id) in spellings.into_iter().enumerate() {
            let street = format!("{n} Elm St");
            let updated = linker
                .link_or_create_address::<User, _>(
                    &mut session,
                    &user.key(),
                    &fields(json!({ "address_id": address_id, "street": street })),
                )
                .await;

            assert!(updated.success, "{:?}", updated.error);
            assert_eq!(updated.data().unwrap().address_id, created.address_id);
            assert_eq!(store.rows("addresses")[0]["street"], json!(street));
        }
        assert_eq!(store.count("addresses"), 1);
        assert_eq!(store.count("entity_address"), 1);
        assert_eq!(
            store.rows("addresses")[0]["address_id"],
            json!(created.address_id.to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_address_goes_to_validation_slot() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        let mut session = store.session();

        let response = RelationLinker::default()
            .link_or_create_address::<User, _>(&mut session, &user.key(), &fields(json!({ "address_id": "nope" })))
            .await;

        assert!(!response.success);
        assert!(response.error.is_none());
        assert!(response.validation_error.is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_is_caught() {
        let store = MemoryStore::with_user_schema();
        let user = seeded(&store).await;
        store.fail_commits_touching("addresses");
        let mut session = store.session();

        let response = RelationLinker::default()
            .link_or_create_address::<User, _>(&mut session, &user.key(), &fields(json!({ "street": "1 Main St" })))
            .await;

        assert!(!response.success);
        assert!(response
            .error
            .as_deref()
            .unwrap()
            .starts_with("An unexpected error occurred"));
        assert_eq!(store.count("entity_address"), 0);
    }
}
