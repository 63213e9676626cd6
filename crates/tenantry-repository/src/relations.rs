//! Eager relation loading.
//!
//! Relations are never columns: each record type names the relations it can
//! load through its own enum, and the store fills the matching slots after the
//! base query returns.

use crate::session::{Select, Session, SessionScope};
use async_trait::async_trait;
use std::fmt::Debug;
use tenantry_core::{
    Address, Contract, ContractType, DaoResult, EntityAddress, Record, RecordKey, Role, User,
    UserRoleLink,
};
use tracing::debug;

/// A record that can populate relation slots after it is read.
#[async_trait]
pub trait Eager: Record {
    /// The relations this record can load.
    type Relation: Copy + Debug + Send + Sync + 'static;

    /// Fills the slot for `relation` from `session`.
    async fn load<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        relation: Self::Relation,
    ) -> DaoResult<()>;
}

/// Relation type for records without relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRelation {}

macro_rules! without_relations {
    ($($record:ty),* $(,)?) => {
        $(
            #[async_trait]
            impl Eager for $record {
                type Relation = NoRelation;

                async fn load<S: Session + ?Sized>(
                    &mut self,
                    _session: &mut S,
                    relation: NoRelation,
                ) -> DaoResult<()> {
                    match relation {}
                }
            }
        )*
    };
}

without_relations!(Address, EntityAddress, Role, UserRoleLink, Contract, ContractType);

/// Relations of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRelation {
    /// Addresses linked through `entity_address`.
    Addresses,
    /// Roles linked through `user_roles`.
    Roles,
}

#[async_trait]
impl Eager for User {
    type Relation = UserRelation;

    async fn load<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        relation: UserRelation,
    ) -> DaoResult<()> {
        match relation {
            UserRelation::Addresses => {
                let addresses = addresses_for(session, &*self).await?;
                self.addresses = addresses;
            }
            UserRelation::Roles => {
                let roles = roles_of(session, &self.key()).await?;
                self.roles = roles;
            }
        }
        Ok(())
    }
}

/// Association rows binding the owner `(entity_type, owner)` to addresses.
pub async fn address_links<S: Session + ?Sized>(
    session: &mut S,
    entity_type: &str,
    owner: &RecordKey,
) -> DaoResult<Vec<EntityAddress>> {
    let select = Select::from::<EntityAddress>()
        .filter("entity_type", entity_type)
        .filter("entity_id", owner.to_value());
    session
        .execute(&select)
        .await?
        .into_iter()
        .map(EntityAddress::from_fields)
        .collect()
}

/// Addresses linked to the owner `(entity_type, owner)`, in link order.
pub async fn addresses_of<S: Session + ?Sized>(
    session: &mut S,
    entity_type: &str,
    owner: &RecordKey,
) -> DaoResult<Vec<Address>> {
    let links = address_links(session, entity_type, owner).await?;
    let mut addresses = Vec::with_capacity(links.len());
    for link in links {
        match session
            .fetch_by_key::<Address>(&RecordKey::Uuid(link.address_id))
            .await?
        {
            Some(address) => addresses.push(address),
            None => debug!("Dangling address link {} for {} {}", link.address_id, entity_type, owner),
        }
    }
    Ok(addresses)
}

/// Addresses linked to `owner`, using its type discriminant.
pub async fn addresses_for<O: Record, S: Session + ?Sized>(
    session: &mut S,
    owner: &O,
) -> DaoResult<Vec<Address>> {
    addresses_of(session, O::ENTITY_TYPE, &owner.key()).await
}

/// Roles linked to the user `user_id`.
pub async fn roles_of<S: Session + ?Sized>(
    session: &mut S,
    user_id: &RecordKey,
) -> DaoResult<Vec<Role>> {
    let select = Select::from::<UserRoleLink>().filter("user_id", user_id.to_value());
    let links = session
        .execute(&select)
        .await?
        .into_iter()
        .map(UserRoleLink::from_fields)
        .collect::<DaoResult<Vec<_>>>()?;

    let mut roles = Vec::with_capacity(links.len());
    for link in links {
        if let Some(role) = session.fetch_by_key::<Role>(&RecordKey::Uuid(link.role_id)).await? {
            roles.push(role);
        }
    }
    Ok(roles)
}
