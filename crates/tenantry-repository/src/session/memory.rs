//! In-process storage engine.
//!
//! [`MemoryStore`] holds committed tables behind a lock; each
//! [`MemorySession`] buffers its mutations and replays them onto the shared
//! state at commit, enforcing primary-key and declared unique constraints.
//! Reads inside a session see committed rows overlaid with its own staged
//! writes.

use super::{Mutation, Select, Session};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tenantry_core::{
    Address, DaoError, DaoResult, EntityAddress, FieldMap, Record, RecordKey, Role, User,
    UserRoleLink,
};
use tracing::debug;

type Table = Vec<FieldMap>;

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<&'static str, Table>,
    primary_keys: HashMap<&'static str, &'static str>,
    unique: HashMap<&'static str, Vec<&'static [&'static str]>>,
    failing_tables: HashSet<String>,
    failing_stage_tables: HashSet<String>,
    commits: u64,
}

/// Shared in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Creates an empty store with no constraints beyond primary keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the constraints the migrations declare for the
    /// user aggregate tables.
    #[must_use]
    pub fn with_user_schema() -> Self {
        Self::new()
            .with_table::<User>(&[&["email"]])
            .with_table::<Address>(&[])
            .with_table::<EntityAddress>(&[&["entity_type", "entity_id", "address_id"]])
            .with_table::<Role>(&[&["alias"]])
            .with_table::<UserRoleLink>(&[&["user_id", "role_id"]])
    }

    /// Declares the table for `T` with the given unique column groups.
    #[must_use]
    pub fn with_table<T: Record>(self, unique: &[&'static [&'static str]]) -> Self {
        {
            let mut state = self.state.lock();
            state.tables.entry(T::TABLE).or_default();
            state.primary_keys.insert(T::TABLE, T::PRIMARY_KEY);
            state.unique.insert(T::TABLE, unique.to_vec());
        }
        self
    }

    /// Opens a new session over this store.
    #[must_use]
    pub fn session(&self) -> MemorySession {
        MemorySession {
            store: self.clone(),
            pending: Vec::new(),
        }
    }

    /// Makes every later commit that writes to `table` fail.
    pub fn fail_commits_touching(&self, table: &str) {
        self.state.lock().failing_tables.insert(table.to_string());
    }

    /// Makes every later write staged on `table` fail immediately, the way an
    /// eagerly writing backend reports a constraint violation.
    pub fn fail_stages_touching(&self, table: &str) {
        self.state.lock().failing_stage_tables.insert(table.to_string());
    }

    /// Removes every injected failure.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_tables.clear();
        state.failing_stage_tables.clear();
    }

    /// Committed rows of `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<FieldMap> {
        self.state.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Number of committed rows in `table`.
    #[must_use]
    pub fn count(&self, table: &str) -> usize {
        self.state.lock().tables.get(table).map_or(0, Vec::len)
    }

    /// Number of successful commits so far.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.state.lock().commits
    }
}

/// One unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    store: MemoryStore,
    pending: Vec<Mutation>,
}

impl MemorySession {
    /// Number of staged, uncommitted mutations.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

fn key_matches(row: &FieldMap, key_field: &str, key: &RecordKey) -> bool {
    row.get(key_field)
        .and_then(RecordKey::from_value)
        .is_some_and(|found| &found == key)
}

/// Applies one mutation to `tables`. Strict mode rejects updates and deletes
/// of missing rows; the read overlay uses lenient mode.
fn apply(tables: &mut HashMap<&'static str, Table>, mutation: &Mutation, strict: bool) -> DaoResult<()> {
    match mutation {
        Mutation::Insert { table, row } => {
            tables.entry(*table).or_default().push(row.clone());
        }
        Mutation::Update {
            table,
            key_field,
            key,
            row,
        } => {
            let rows = tables.entry(*table).or_default();
            match rows.iter_mut().find(|r| key_matches(r, key_field, key)) {
                Some(existing) => *existing = row.clone(),
                None if strict => {
                    return Err(DaoError::storage(format!("{} row {} no longer exists", table, key)));
                }
                None => {}
            }
        }
        Mutation::Delete { table, key_field, key } => {
            let rows = tables.entry(*table).or_default();
            let before = rows.len();
            rows.retain(|r| !key_matches(r, key_field, key));
            if strict && rows.len() == before {
                return Err(DaoError::storage(format!("{} row {} no longer exists", table, key)));
            }
        }
    }
    Ok(())
}

fn check_unique(
    table: &'static str,
    rows: &[FieldMap],
    groups: impl IntoIterator<Item = Vec<&'static str>>,
) -> DaoResult<()> {
    for columns in groups {
        let mut seen = HashSet::new();
        for row in rows {
            let values: Vec<&Value> = columns
                .iter()
                .map(|c| row.get(*c).unwrap_or(&Value::Null))
                .collect();
            // NULLs never collide, as in SQL
            if values.iter().any(|v| v.is_null()) {
                continue;
            }
            let fingerprint = serde_json::to_string(&values)?;
            if !seen.insert(fingerprint) {
                return Err(DaoError::AlreadyExists(format!(
                    "Duplicate entry for {}({})",
                    table,
                    columns.join(", ")
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Session for MemorySession {
    async fn stage(&mut self, mutation: Mutation) -> DaoResult<()> {
        let table = mutation.table();
        let rejected = self.store.state.lock().failing_stage_tables.contains(table);
        if rejected {
            return Err(DaoError::storage(format!("write rejected by {}", table)));
        }
        debug!("Staging mutation on {}", table);
        self.pending.push(mutation);
        Ok(())
    }

    async fn execute(&mut self, select: &Select) -> DaoResult<Vec<FieldMap>> {
        let mut view: HashMap<&'static str, Table> = HashMap::new();
        view.insert(select.table, self.store.rows(select.table));
        for mutation in self.pending.iter().filter(|m| m.table() == select.table) {
            apply(&mut view, mutation, false)?;
        }

        let rows = view.remove(select.table).unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| select.matches(row))
            .skip(select.window.skip)
            .take(select.window.limit)
            .map(|mut row| {
                row.retain(|k, _| select.columns.contains(&k.as_str()));
                row
            })
            .collect())
    }

    async fn commit(&mut self) -> DaoResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut state = self.store.state.lock();
        if let Some(table) = self
            .pending
            .iter()
            .map(Mutation::table)
            .find(|t| state.failing_tables.contains(*t))
        {
            return Err(DaoError::storage(format!("commit rejected by {}", table)));
        }

        let mut tables = state.tables.clone();
        let mut touched = HashSet::new();
        for mutation in &self.pending {
            apply(&mut tables, mutation, true)?;
            touched.insert(mutation.table());
        }

        for table in touched {
            let rows = tables.get(table).map_or(&[][..], Vec::as_slice);
            let mut groups: Vec<Vec<&'static str>> = state
                .unique
                .get(table)
                .map(|g| g.iter().map(|cols| cols.to_vec()).collect())
                .unwrap_or_default();
            if let Some(pk) = state.primary_keys.get(table) {
                groups.push(vec![*pk]);
            }
            check_unique(table, rows, groups)?;
        }

        state.tables = tables;
        state.commits += 1;
        debug!("Committed {} mutations", self.pending.len());
        self.pending.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> DaoResult<()> {
        if !self.pending.is_empty() {
            debug!("Rolling back {} mutations", self.pending.len());
        }
        self.pending.clear();
        Ok(())
    }
}
