//! Commit/refresh helpers layered over any [`Session`].

use super::{Mutation, Select, Session};
use async_trait::async_trait;
use tenantry_core::{DaoError, DaoResult, Record, RecordKey};
use tracing::{debug, warn};

/// Scoped transactional helpers available on every session.
#[async_trait]
pub trait SessionScope: Session {
    /// Loads a record of type `T` by primary key.
    async fn fetch_by_key<T: Record>(&mut self, key: &RecordKey) -> DaoResult<Option<T>> {
        let select = Select::from::<T>().filter(T::PRIMARY_KEY, key.to_value());
        let mut rows = self.execute(&select).await?;
        match rows.len() {
            0 => Ok(None),
            1 => T::from_fields(rows.remove(0)).map(Some),
            matched => Err(DaoError::AmbiguousResult {
                resource_type: T::ENTITY_TYPE,
                matched,
            }),
        }
    }

    /// Re-reads `record` from storage, keeping its loaded relations.
    async fn refresh<T: Record>(&mut self, mut record: T) -> DaoResult<T> {
        let key = record.key();
        let mut fresh: T = self
            .fetch_by_key(&key)
            .await?
            .ok_or_else(|| DaoError::not_found(T::ENTITY_TYPE, &key))?;
        fresh.carry_relations(&mut record);
        Ok(fresh)
    }

    /// Commits the transaction and returns the refreshed record.
    ///
    /// A failed commit is rolled back once and surfaces as a storage error
    /// (unique-constraint violations keep their `AlreadyExists` kind).
    async fn commit_and_refresh<T: Record>(&mut self, record: T) -> DaoResult<T> {
        if let Err(err) = self.commit().await {
            warn!("Commit failed for {} {}: {}", T::ENTITY_TYPE, record.key(), err);
            self.rollback_quietly().await;
            return Err(match err {
                DaoError::Storage(_) | DaoError::AlreadyExists(_) => err,
                other => DaoError::Storage(format!("Error committing data: {}", other)),
            });
        }
        debug!("Committed {} {}", T::ENTITY_TYPE, record.key());
        self.refresh(record).await
    }

    /// Stages `mutation`, rolling the transaction back if storage rejects it.
    ///
    /// Backends that write eagerly surface constraint violations here rather
    /// than at commit.
    async fn stage_or_rollback(&mut self, mutation: Mutation) -> DaoResult<()> {
        let table = mutation.table();
        if let Err(err) = self.stage(mutation).await {
            warn!("Staging on {} failed: {}", table, err);
            self.rollback_quietly().await;
            return Err(err);
        }
        Ok(())
    }

    /// Rolls back, logging instead of propagating a rollback failure.
    async fn rollback_quietly(&mut self) {
        if let Err(err) = self.rollback().await {
            warn!("Rollback failed: {}", err);
        }
    }
}

impl<S: Session + ?Sized> SessionScope for S {}
