//! Session-backed [`UserDao`] implementation.
//!
//! Composite create runs as a small state machine on one session:
//!
//! ```text
//! existence check ─found─▶ "User already exists" (prior user as data)
//!       │
//!   base create ─error─▶ rollback, "Fatal ..."
//!       │
//!   aspect fan-out (emergency, employer, auth, address; failures recorded)
//!       │
//!   materialize (reload with addresses, commit and refresh)
//! ```

use super::aspects::{AspectHandler, AspectOutcome, AspectStatus, ASPECTS};
use super::user_dao::{CompositeUser, UserDao};
use crate::linker::RelationLinker;
use crate::relations::UserRelation;
use crate::session::{Mutation, Select, Session, SessionScope};
use crate::store::RecordStore;
use async_trait::async_trait;
use serde_json::Value;
use shaku::Component;
use tenantry_config::DaoConfig;
use tenantry_core::{
    Address, DaoError, DaoResponse, DaoResult, EntityAddress, FieldMap, Record, RecordKey, Schema,
    User, UserBase, UserRoleLink, Window,
};
use tracing::{debug, info, warn};

const EMAIL_FIELD: &str = "email";

fn key_filter(key: &RecordKey) -> FieldMap {
    let mut filters = FieldMap::new();
    filters.insert(User::PRIMARY_KEY.to_string(), key.to_value());
    filters
}

fn email_filter(email: &str) -> FieldMap {
    let mut filters = FieldMap::new();
    filters.insert(EMAIL_FIELD.to_string(), Value::from(email));
    filters
}

/// [`UserDao`] over the generic record store and relation linker.
#[derive(Component, Debug, Clone, Default)]
#[shaku(interface = UserDao)]
pub struct CompositeUserDao {
    #[shaku(default)]
    users: RecordStore<User>,
    #[shaku(default)]
    linker: RelationLinker,
}

impl CompositeUserDao {
    /// Creates a DAO whose stores use the page sizes from `config`.
    #[must_use]
    pub fn new(config: &DaoConfig) -> Self {
        Self {
            users: RecordStore::with_config(config),
            linker: RelationLinker::with_config(config),
        }
    }

    async fn try_create(
        &self,
        session: &mut dyn Session,
        payload: &FieldMap,
    ) -> DaoResult<DaoResponse<CompositeUser>> {
        // Friendly early answer only; the unique index on email decides races.
        if let Some(email) = payload.get(EMAIL_FIELD).and_then(Value::as_str) {
            if let Some(existing) = self.existing_user(session, email).await? {
                info!("User {} already exists", email);
                return Ok(DaoResponse::failure_with(
                    "User already exists",
                    CompositeUser::bare(existing),
                ));
            }
        }

        let base = UserBase::project(payload, None)?
            .ok_or_else(|| DaoError::validation("UserBase: payload declares no base fields"))?;

        let user = match self.users.create(session, base).await {
            Ok(user) => user,
            Err(DaoError::AlreadyExists(reason)) => {
                debug!("Unique constraint rejected user: {}", reason);
                return Ok(self.lost_race(session, payload).await);
            }
            Err(err) => return Err(err),
        };
        info!("Created user {}", user.user_id);

        let (user, aspects) = self.apply_aspects(session, user, payload).await;
        let user = self.materialize(session, user).await?;
        Ok(DaoResponse::ok(CompositeUser { user, aspects }))
    }

    async fn try_update(
        &self,
        session: &mut dyn Session,
        existing: User,
        payload: &FieldMap,
    ) -> DaoResult<CompositeUser> {
        let base = UserBase::project(payload, None)?.unwrap_or_default();
        let user = self.users.update(session, existing, &base).await?;

        let (user, aspects) = self.apply_aspects(session, user, payload).await;
        let user = self.materialize(session, user).await?;
        info!("Updated user {}", user.user_id);
        Ok(CompositeUser { user, aspects })
    }

    async fn existing_user(&self, session: &mut dyn Session, email: &str) -> DaoResult<Option<User>> {
        self.users
            .query_one(session, &email_filter(email), &[UserRelation::Addresses])
            .await
    }

    /// Answer for a create that passed the existence check but lost the
    /// insert to a concurrent one.
    async fn lost_race(&self, session: &mut dyn Session, payload: &FieldMap) -> DaoResponse<CompositeUser> {
        let email = payload.get(EMAIL_FIELD).and_then(Value::as_str).unwrap_or_default();
        match self.existing_user(session, email).await {
            Ok(Some(existing)) => {
                DaoResponse::failure_with("User already exists", CompositeUser::bare(existing))
            }
            _ => DaoResponse::failure("User already exists"),
        }
    }

    /// Runs every aspect present in `payload` against `user`, in registry
    /// order. A failing aspect is recorded and the next one still runs.
    async fn apply_aspects(
        &self,
        session: &mut dyn Session,
        mut user: User,
        payload: &FieldMap,
    ) -> (User, Vec<AspectOutcome>) {
        let mut outcomes = Vec::with_capacity(ASPECTS.len());

        for spec in &ASPECTS {
            let status = match (spec.project)(payload, spec.payload_key) {
                Ok(None) => AspectStatus::Skipped,
                Err(err) => AspectStatus::Failed(err.to_string()),
                Ok(Some(fields)) => match spec.handler {
                    AspectHandler::UserColumns => {
                        match self.users.update(session, user.clone(), &fields).await {
                            Ok(updated) => {
                                user = updated;
                                AspectStatus::Applied
                            }
                            Err(err) => AspectStatus::Failed(err.to_string()),
                        }
                    }
                    AspectHandler::LinkAddress => {
                        let response = self
                            .linker
                            .link_or_create_address::<User, _>(session, &user.key(), &fields)
                            .await;
                        if response.success {
                            AspectStatus::Applied
                        } else {
                            AspectStatus::Failed(
                                response
                                    .error
                                    .or(response.validation_error)
                                    .unwrap_or_default(),
                            )
                        }
                    }
                },
            };

            if let AspectStatus::Failed(reason) = &status {
                warn!("Aspect {} failed for user {}: {}", spec.aspect, user.user_id, reason);
            }
            outcomes.push(AspectOutcome {
                aspect: spec.aspect,
                status,
            });
        }

        (user, outcomes)
    }

    /// Reloads `user` with its addresses and returns the committed view.
    async fn materialize(&self, session: &mut dyn Session, user: User) -> DaoResult<User> {
        let key = user.key();
        let loaded = self
            .users
            .query_one(session, &key_filter(&key), &[UserRelation::Addresses])
            .await?
            .ok_or_else(|| DaoError::not_found(User::ENTITY_TYPE, &key))?;
        session.commit_and_refresh(loaded).await
    }

    async fn try_delete(&self, session: &mut dyn Session, user_id: &RecordKey) -> DaoResult<User> {
        let user = self
            .users
            .get(session, user_id.clone())
            .await?
            .ok_or_else(|| DaoError::not_found(User::ENTITY_TYPE, user_id))?;

        let role_links = Select::from::<UserRoleLink>().filter("user_id", user_id.to_value());
        for row in session.execute(&role_links).await? {
            let link = UserRoleLink::from_fields(row)?;
            session.stage_or_rollback(Mutation::delete(&link)).await?;
        }

        let address_links = Select::from::<EntityAddress>()
            .filter("entity_type", User::ENTITY_TYPE)
            .filter("entity_id", user_id.to_value());
        for row in session.execute(&address_links).await? {
            let link = EntityAddress::from_fields(row)?;
            session.stage_or_rollback(Mutation::delete(&link)).await?;
        }

        session.stage_or_rollback(Mutation::delete(&user)).await?;
        if let Err(err) = session.commit().await {
            session.rollback_quietly().await;
            return Err(err);
        }
        info!("Deleted user {}", user.user_id);
        Ok(user)
    }
}

#[async_trait]
impl UserDao for CompositeUserDao {
    async fn create_composite(
        &self,
        session: &mut dyn Session,
        payload: &FieldMap,
    ) -> DaoResponse<CompositeUser> {
        match self.try_create(session, payload).await {
            Ok(response) => response,
            Err(err) if err.is_validation() => {
                session.rollback_quietly().await;
                DaoResponse::from_error(&err)
            }
            Err(err) => {
                warn!("Composite create failed: {}", err);
                session.rollback_quietly().await;
                DaoResponse::failure(DaoError::fatal(err).to_string())
            }
        }
    }

    async fn update_composite(
        &self,
        session: &mut dyn Session,
        existing: User,
        payload: &FieldMap,
    ) -> DaoResponse<CompositeUser> {
        let user_id = existing.user_id;
        match self.try_update(session, existing, payload).await {
            Ok(composite) => DaoResponse::ok(composite),
            Err(err) if err.is_validation() => {
                session.rollback_quietly().await;
                DaoResponse::from_error(&err)
            }
            Err(err) => {
                warn!("Composite update of user {} failed: {}", user_id, err);
                session.rollback_quietly().await;
                DaoResponse::failure(DaoError::fatal(format!("Update {}", err)).to_string())
            }
        }
    }

    async fn get(&self, session: &mut dyn Session, user_id: &RecordKey) -> DaoResponse<User> {
        let eager = [UserRelation::Addresses, UserRelation::Roles];
        match self.users.query_one(session, &key_filter(user_id), &eager).await {
            Ok(Some(user)) => DaoResponse::ok(user),
            Ok(None) => DaoResponse::empty(),
            Err(err) => DaoResponse::from_error(&err),
        }
    }

    async fn get_all(&self, session: &mut dyn Session, window: Window) -> DaoResponse<Vec<User>> {
        self.users.get_all(session, window).await.into()
    }

    async fn find_by_email(&self, session: &mut dyn Session, email: &str) -> DaoResponse<User> {
        match self.existing_user(session, email).await {
            Ok(Some(user)) => DaoResponse::ok(user),
            Ok(None) => DaoResponse::empty(),
            Err(err) => DaoResponse::from_error(&err),
        }
    }

    async fn delete(&self, session: &mut dyn Session, user_id: &RecordKey) -> DaoResponse<User> {
        match self.try_delete(session, user_id).await {
            Ok(user) => DaoResponse::ok(user),
            Err(err) => {
                session.rollback_quietly().await;
                DaoResponse::from_error(&err)
            }
        }
    }

    async fn link_role(
        &self,
        session: &mut dyn Session,
        user_id: &RecordKey,
        alias: &str,
    ) -> DaoResponse<User> {
        self.linker.link_role(session, user_id, alias).await
    }

    async fn link_or_create_address(
        &self,
        session: &mut dyn Session,
        user_id: &RecordKey,
        payload: &FieldMap,
    ) -> DaoResponse<Address> {
        self.linker
            .link_or_create_address::<User, _>(session, user_id, payload)
            .await
    }
}
