//! Generic CRUD over one record type.

use crate::relations::Eager;
use crate::session::{Mutation, Select, Session, SessionScope};
use std::marker::PhantomData;
use tenantry_config::DaoConfig;
use tenantry_core::{DaoError, DaoResult, FieldMap, Record, RecordKey, Window};
use tracing::debug;

/// Result of a query that may be single- or multi-row.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    /// Outcome of a single-result query.
    One(Option<T>),
    /// Outcome of a multi-result query.
    Many(Vec<T>),
}

impl<T> Selection<T> {
    /// Returns true if no record was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(record) => record.is_none(),
            Self::Many(records) => records.is_empty(),
        }
    }

    /// The single record, or the first of many.
    #[must_use]
    pub fn into_one(self) -> Option<T> {
        match self {
            Self::One(record) => record,
            Self::Many(records) => records.into_iter().next(),
        }
    }

    /// Every selected record.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(record) => record.into_iter().collect(),
            Self::Many(records) => records,
        }
    }
}

/// Create/read/update/delete primitives for records of type `T`.
///
/// The store holds no connection state; every call runs on the session it is
/// handed, so one store serves any number of concurrent units of work.
#[derive(Debug)]
pub struct RecordStore<T> {
    default_page_size: usize,
    max_page_size: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            _record: PhantomData,
        }
    }
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self::with_config(&DaoConfig::default())
    }
}

impl<T> RecordStore<T> {
    /// Creates a store with the page sizes from `config`.
    #[must_use]
    pub fn with_config(config: &DaoConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            _record: PhantomData,
        }
    }

    /// The window `get_all` uses when the caller has none.
    #[must_use]
    pub const fn default_window(&self) -> Window {
        Window::new(0, self.default_page_size)
    }
}

impl<T: Eager> RecordStore<T> {
    /// Creates a store with the default page sizes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_fields(fields: &FieldMap) -> DaoResult<()> {
        match fields.keys().find(|field| !T::declares(field)) {
            Some(field) => Err(DaoError::UnknownField {
                resource_type: T::ENTITY_TYPE,
                field: field.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn commit_or_rollback<S: Session + ?Sized>(session: &mut S) -> DaoResult<()> {
        if let Err(err) = session.commit().await {
            session.rollback_quietly().await;
            return Err(err);
        }
        Ok(())
    }

    /// Instantiates a record from `fields`, persists it, and returns the
    /// stored row.
    pub async fn create<S: Session + ?Sized>(&self, session: &mut S, fields: FieldMap) -> DaoResult<T> {
        Self::check_fields(&fields)?;
        let record = T::from_fields(fields)?;
        debug!("Creating {} {}", T::ENTITY_TYPE, record.key());

        session.stage_or_rollback(Mutation::insert(&record)?).await?;
        session.commit_and_refresh(record).await
    }

    /// Looks up a record by primary key; absence is not an error.
    pub async fn get<S: Session + ?Sized>(
        &self,
        session: &mut S,
        key: impl Into<RecordKey> + Send,
    ) -> DaoResult<Option<T>> {
        session.fetch_by_key(&key.into()).await
    }

    /// Lists records in storage order within `window`, capped at the
    /// configured maximum page size.
    pub async fn get_all<S: Session + ?Sized>(&self, session: &mut S, window: Window) -> DaoResult<Vec<T>> {
        let window = window.clamped(self.max_page_size);
        debug!("Listing {} skip={} limit={}", T::ENTITY_TYPE, window.skip, window.limit);
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let select = Select::from::<T>().window(window);
        session
            .execute(&select)
            .await?
            .into_iter()
            .map(T::from_fields)
            .collect()
    }

    /// Runs a conjunctive equality query over `filters`.
    ///
    /// With `single`, zero rows yields `One(None)` and more than one row is an
    /// [`DaoError::AmbiguousResult`]. Relations in `eager` are loaded on every
    /// returned record.
    pub async fn query<S: Session + ?Sized>(
        &self,
        session: &mut S,
        filters: &FieldMap,
        single: bool,
        eager: &[T::Relation],
    ) -> DaoResult<Selection<T>> {
        Self::check_fields(filters)?;
        debug!("Querying {} on {:?}", T::ENTITY_TYPE, filters.keys().collect::<Vec<_>>());

        let select = Select::from::<T>().filters(filters);
        let mut records = session
            .execute(&select)
            .await?
            .into_iter()
            .map(T::from_fields)
            .collect::<DaoResult<Vec<T>>>()?;

        if single && records.len() > 1 {
            return Err(DaoError::AmbiguousResult {
                resource_type: T::ENTITY_TYPE,
                matched: records.len(),
            });
        }

        for record in &mut records {
            for relation in eager {
                record.load(session, *relation).await?;
            }
        }

        Ok(if single {
            Selection::One(records.pop())
        } else {
            Selection::Many(records)
        })
    }

    /// The unique record matching `filters`, if any.
    pub async fn query_one<S: Session + ?Sized>(
        &self,
        session: &mut S,
        filters: &FieldMap,
        eager: &[T::Relation],
    ) -> DaoResult<Option<T>> {
        Ok(self.query(session, filters, true, eager).await?.into_one())
    }

    /// Every record matching `filters`.
    pub async fn query_all<S: Session + ?Sized>(
        &self,
        session: &mut S,
        filters: &FieldMap,
        eager: &[T::Relation],
    ) -> DaoResult<Vec<T>> {
        Ok(self.query(session, filters, false, eager).await?.into_vec())
    }

    /// Queries `filters`; when nothing matches and `create_if_missing` is set,
    /// persists a new record built from the filter map itself.
    pub async fn query_or_create<S: Session + ?Sized>(
        &self,
        session: &mut S,
        filters: &FieldMap,
        single: bool,
        create_if_missing: bool,
    ) -> DaoResult<Selection<T>> {
        let found = self.query(session, filters, single, &[]).await?;
        if !found.is_empty() || !create_if_missing {
            return Ok(found);
        }

        let created = self.create(session, filters.clone()).await?;
        Ok(if single {
            Selection::One(Some(created))
        } else {
            Selection::Many(vec![created])
        })
    }

    /// Overwrites the declared fields present in `fields`, ignoring the rest,
    /// then commits and returns the refreshed record.
    pub async fn update<S: Session + ?Sized>(
        &self,
        session: &mut S,
        mut target: T,
        fields: &FieldMap,
    ) -> DaoResult<T> {
        let changed = target.apply(fields)?;
        debug!("Updating {} {}: {} fields changed", T::ENTITY_TYPE, target.key(), changed);
        if changed > 0 {
            session.stage_or_rollback(Mutation::update(&target)?).await?;
        }
        session.commit_and_refresh(target).await
    }

    /// Removes `target` and commits.
    pub async fn delete<S: Session + ?Sized>(&self, session: &mut S, target: &T) -> DaoResult<()> {
        debug!("Deleting {} {}", T::ENTITY_TYPE, target.key());
        session.stage_or_rollback(Mutation::delete(target)).await?;
        Self::commit_or_rollback(session).await
    }

    /// Number of records matching `filters`.
    pub async fn count<S: Session + ?Sized>(&self, session: &mut S, filters: &FieldMap) -> DaoResult<usize> {
        Self::check_fields(filters)?;
        let select = Select::from::<T>().filters(filters);
        Ok(session.execute(&select).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;
    use serde_json::json;
    use tenantry_core::{Role, User};

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let users = RecordStore::<User>::new();

        let user = users
            .create(&mut session, fields(json!({ "email": "a@b.com" })))
            .await
            .unwrap();
        let found = users.get(&mut session, user.user_id).await.unwrap();

        assert_eq!(found, Some(user));
        assert_eq!(store.count("users"), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_fields() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();

        let err = RecordStore::<User>::new()
            .create(&mut session, fields(json!({ "email": "a@b.com", "is_admin": true })))
            .await
            .unwrap_err();

        assert!(matches!(err, DaoError::UnknownField { ref field, .. } if field == "is_admin"));
        assert_eq!(store.count("users"), 0);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();

        let found = RecordStore::<User>::new()
            .get(&mut session, uuid::Uuid::now_v7())
            .await
            .unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_all_clamps_to_max_page_size() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let roles = RecordStore::<Role>::with_config(&DaoConfig {
            default_page_size: 2,
            max_page_size: 3,
        });
        for alias in ["a", "b", "c", "d"] {
            roles.create(&mut session, fields(json!({ "alias": alias }))).await.unwrap();
        }

        assert_eq!(roles.get_all(&mut session, roles.default_window()).await.unwrap().len(), 2);
        assert_eq!(roles.get_all(&mut session, Window::new(0, 50)).await.unwrap().len(), 3);
        assert_eq!(roles.get_all(&mut session, Window::new(3, 50)).await.unwrap().len(), 1);
        assert!(roles.get_all(&mut session, Window::new(0, 0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_single_reports_ambiguity() {
        let store = MemoryStore::new().with_table::<Role>(&[]);
        let mut session = store.session();
        let roles = RecordStore::<Role>::new();
        roles.create(&mut session, fields(json!({ "alias": "x", "name": "Dup" }))).await.unwrap();
        roles.create(&mut session, fields(json!({ "alias": "y", "name": "Dup" }))).await.unwrap();

        let one = roles
            .query(&mut session, &fields(json!({ "alias": "x" })), true, &[])
            .await
            .unwrap();
        let none = roles
            .query(&mut session, &fields(json!({ "alias": "z" })), true, &[])
            .await
            .unwrap();
        let err = roles
            .query(&mut session, &fields(json!({ "name": "Dup" })), true, &[])
            .await
            .unwrap_err();

        assert_eq!(one.into_one().map(|r| r.alias).as_deref(), Some("x"));
        assert_eq!(none, Selection::One(None));
        assert!(matches!(err, DaoError::AmbiguousResult { matched: 2, .. }));
    }

    #[tokio::test]
    async fn test_query_rejects_unknown_filter() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();

        let err = RecordStore::<User>::new()
            .query_all(&mut session, &fields(json!({ "nickname": "a" })), &[])
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "UNKNOWN_FIELD");
    }

    #[tokio::test]
    async fn test_query_or_create_is_idempotent() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let roles = RecordStore::<Role>::new();
        let filters = fields(json!({ "alias": "admin" }));

        let first = roles.query_or_create(&mut session, &filters, true, true).await.unwrap();
        let second = roles.query_or_create(&mut session, &filters, true, true).await.unwrap();
        let absent = roles
            .query_or_create(&mut session, &fields(json!({ "alias": "guest" })), false, false)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count("roles"), 1);
        assert_eq!(absent, Selection::Many(Vec::new()));
    }

    #[tokio::test]
    async fn test_update_with_unknown_fields_only_changes_nothing() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let users = RecordStore::<User>::new();
        let user = users
            .create(&mut session, fields(json!({ "email": "a@b.com" })))
            .await
            .unwrap();
        let before = serde_json::to_string(&user).unwrap();

        let updated = users
            .update(&mut session, user, &fields(json!({ "shoe_size": 44 })))
            .await
            .unwrap();

        assert_eq!(serde_json::to_string(&updated).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_overwrites_supplied_fields() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let users = RecordStore::<User>::new();
        let user = users
            .create(&mut session, fields(json!({ "email": "a@b.com", "first_name": "A" })))
            .await
            .unwrap();
        let id = user.user_id;

        let updated = users
            .update(&mut session, user, &fields(json!({ "last_name": "Z", "user_id": "ignored" })))
            .await
            .unwrap();

        assert_eq!(updated.user_id, id);
        assert_eq!(updated.first_name.as_deref(), Some("A"));
        assert_eq!(updated.last_name.as_deref(), Some("Z"));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let roles = RecordStore::<Role>::new();
        let admin = roles.create(&mut session, fields(json!({ "alias": "admin" }))).await.unwrap();
        roles.create(&mut session, fields(json!({ "alias": "guest" }))).await.unwrap();

        roles.delete(&mut session, &admin).await.unwrap();

        assert_eq!(roles.count(&mut session, &FieldMap::new()).await.unwrap(), 1);
        assert!(roles.get(&mut session, admin.role_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_commit_surfaces_storage_error_and_rolls_back() {
        let store = MemoryStore::with_user_schema();
        store.fail_commits_touching("roles");
        let mut session = store.session();

        let err = RecordStore::<Role>::new()
            .create(&mut session, fields(json!({ "alias": "admin" })))
            .await
            .unwrap_err();

        assert!(err.is_storage());
        assert_eq!(session.pending(), 0);
        assert_eq!(store.count("roles"), 0);
    }

    #[tokio::test]
    async fn test_rejected_stage_rolls_back_the_session() {
        let store = MemoryStore::with_user_schema();
        let mut session = store.session();
        let roles = RecordStore::<Role>::new();
        let admin = roles.create(&mut session, fields(json!({ "alias": "admin" }))).await.unwrap();
        session
            .stage(Mutation::insert(&Role::new("guest", None)).unwrap())
            .await
            .unwrap();
        store.fail_stages_touching("roles");

        let err = roles
            .update(&mut session, admin.clone(), &fields(json!({ "name": "Administrator" })))
            .await
            .unwrap_err();

        assert!(err.is_storage());
        assert_eq!(session.pending(), 0);

        store.clear_failures();
        let renamed = roles
            .update(&mut session, admin, &fields(json!({ "name": "Administrator" })))
            .await
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Administrator"));
        assert_eq!(store.count("roles"), 1);
    }
}
