//! Transactional session abstraction.
//!
//! A [`Session`] is one unit of work against storage: mutations are staged,
//! reads see the session's own staged writes, and `commit`/`rollback` end the
//! current transaction. A session is never shared between concurrent
//! operations; callers hand it down by `&mut`.

mod memory;
mod mysql;
mod scope;

pub use memory::{MemorySession, MemoryStore};
pub use mysql::MySqlSession;
pub use scope::SessionScope;

use async_trait::async_trait;
use serde_json::Value;
use tenantry_core::{DaoResult, FieldMap, Record, RecordKey, Window};

/// A staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a new row.
    Insert { table: &'static str, row: FieldMap },
    /// Overwrite the row whose `key_field` equals `key`.
    Update {
        table: &'static str,
        key_field: &'static str,
        key: RecordKey,
        row: FieldMap,
    },
    /// Remove the row whose `key_field` equals `key`.
    Delete {
        table: &'static str,
        key_field: &'static str,
        key: RecordKey,
    },
}

impl Mutation {
    /// Insert of `record`'s full row.
    pub fn insert<T: Record>(record: &T) -> DaoResult<Self> {
        Ok(Self::Insert {
            table: T::TABLE,
            row: record.to_fields()?,
        })
    }

    /// Full-row update of `record`.
    pub fn update<T: Record>(record: &T) -> DaoResult<Self> {
        Ok(Self::Update {
            table: T::TABLE,
            key_field: T::PRIMARY_KEY,
            key: record.key(),
            row: record.to_fields()?,
        })
    }

    /// Removal of `record` by primary key.
    #[must_use]
    pub fn delete<T: Record>(record: &T) -> Self {
        Self::Delete {
            table: T::TABLE,
            key_field: T::PRIMARY_KEY,
            key: record.key(),
        }
    }

    /// Table this mutation writes to.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => *table,
        }
    }
}

/// Conjunctive equality query over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub filters: FieldMap,
    pub window: Window,
}

impl Select {
    /// Selects every column of `T` with no filters.
    #[must_use]
    pub fn from<T: Record>() -> Self {
        Self {
            table: T::TABLE,
            columns: T::FIELDS,
            filters: FieldMap::new(),
            window: Window::unbounded(),
        }
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Adds every pair of `filters` as an equality condition.
    #[must_use]
    pub fn filters(mut self, filters: &FieldMap) -> Self {
        for (field, value) in filters {
            self.filters.insert(field.clone(), value.clone());
        }
        self
    }

    /// Restricts the result to `window`.
    #[must_use]
    pub const fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Returns true if `row` satisfies every filter.
    #[must_use]
    pub fn matches(&self, row: &FieldMap) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| row.get(field).unwrap_or(&Value::Null) == expected)
    }
}

/// Transactional unit of work against storage.
#[async_trait]
pub trait Session: Send {
    /// Stages a write in the current transaction.
    async fn stage(&mut self, mutation: Mutation) -> DaoResult<()>;

    /// Runs a query, seeing this session's staged writes.
    async fn execute(&mut self, select: &Select) -> DaoResult<Vec<FieldMap>>;

    /// Makes every staged write durable.
    async fn commit(&mut self) -> DaoResult<()>;

    /// Discards every staged write.
    async fn rollback(&mut self) -> DaoResult<()>;
}
