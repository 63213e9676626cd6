//! MySQL session over a SQLx transaction.
//!
//! SQL is built from record metadata: table and column identifiers come from
//! `Record` constants, every value is bound. Rows are read back through
//! `JSON_OBJECT` so they arrive in the same shape the in-memory backend uses.

use super::{Mutation, Select, Session};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Row, Transaction};
use tenantry_core::{DaoError, DaoResult, FieldMap};
use tracing::debug;

/// Largest row count MySQL accepts in `LIMIT`.
const MAX_LIMIT: u64 = u64::MAX;

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// A session whose transaction is opened lazily on first use and reopened
/// after every commit or rollback.
pub struct MySqlSession {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
}

impl MySqlSession {
    /// Creates a session over `pool`.
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool, tx: None }
    }

    async fn transaction(&mut self) -> DaoResult<&mut Transaction<'static, MySql>> {
        if self.tx.is_none() {
            debug!("Beginning MySQL transaction");
            self.tx = Some(self.pool.begin().await?);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| DaoError::storage("transaction unavailable"))
    }
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession")
            .field("in_transaction", &self.tx.is_some())
            .finish()
    }
}

fn quote_ident(ident: &str) -> DaoResult<String> {
    if ident.is_empty() || !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DaoError::validation(format!("Illegal identifier '{}'", ident)));
    }
    Ok(format!("`{}`", ident))
}

fn bind_value<'q>(query: MySqlQuery<'q>, value: &Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(Json(other.clone())),
    }
}

fn insert_sql(table: &str, row: &FieldMap) -> DaoResult<String> {
    let columns = row
        .keys()
        .map(|c| quote_ident(c))
        .collect::<DaoResult<Vec<_>>>()?;
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table)?,
        columns.join(", "),
        placeholders
    ))
}

fn update_sql(table: &str, key_field: &str, row: &FieldMap) -> DaoResult<String> {
    let assignments = row
        .keys()
        .map(|c| quote_ident(c).map(|q| format!("{} = ?", q)))
        .collect::<DaoResult<Vec<_>>>()?;
    Ok(format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote_ident(table)?,
        assignments.join(", "),
        quote_ident(key_field)?
    ))
}

fn select_sql(select: &Select) -> DaoResult<String> {
    let projection = select
        .columns
        .iter()
        .map(|c| quote_ident(c).map(|q| format!("'{}', {}", c, q)))
        .collect::<DaoResult<Vec<_>>>()?;

    let mut sql = format!(
        "SELECT JSON_OBJECT({}) AS row_json FROM {}",
        projection.join(", "),
        quote_ident(select.table)?
    );

    if !select.filters.is_empty() {
        // `<=>` is NULL-safe equality, matching the in-memory backend
        let conditions = select
            .filters
            .keys()
            .map(|f| quote_ident(f).map(|q| format!("{} <=> ?", q)))
            .collect::<DaoResult<Vec<_>>>()?;
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    Ok(sql)
}

#[async_trait]
impl Session for MySqlSession {
    async fn stage(&mut self, mutation: Mutation) -> DaoResult<()> {
        let tx = self.transaction().await?;
        match &mutation {
            Mutation::Insert { table, row } => {
                let sql = insert_sql(table, row)?;
                debug!("{}", sql);
                let query = row.values().fold(sqlx::query(&sql), bind_value);
                query.execute(&mut **tx).await?;
            }
            Mutation::Update {
                table,
                key_field,
                key,
                row,
            } => {
                let sql = update_sql(table, key_field, row)?;
                debug!("{}", sql);
                let query = row.values().fold(sqlx::query(&sql), bind_value);
                let result = bind_value(query, &key.to_value()).execute(&mut **tx).await?;
                if result.rows_affected() == 0 {
                    debug!("Update of {} {} matched no changed row", table, key);
                }
            }
            Mutation::Delete { table, key_field, key } => {
                let sql = format!(
                    "DELETE FROM {} WHERE {} = ?",
                    quote_ident(table)?,
                    quote_ident(key_field)?
                );
                debug!("{}", sql);
                bind_value(sqlx::query(&sql), &key.to_value())
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }

    async fn execute(&mut self, select: &Select) -> DaoResult<Vec<FieldMap>> {
        let sql = select_sql(select)?;
        debug!("{}", sql);

        let limit = u64::try_from(select.window.limit).unwrap_or(MAX_LIMIT);
        let offset = u64::try_from(select.window.skip).unwrap_or(MAX_LIMIT);

        let tx = self.transaction().await?;
        let query = select.filters.values().fold(sqlx::query(&sql), bind_value);
        let rows = query.bind(limit).bind(offset).fetch_all(&mut **tx).await?;

        rows.into_iter()
            .map(|row| {
                let Json(value): Json<Value> = row.try_get("row_json")?;
                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(DaoError::storage(format!("Unexpected row shape: {}", other))),
                }
            })
            .collect()
    }

    async fn commit(&mut self) -> DaoResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!("MySQL transaction committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> DaoResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("MySQL transaction rolled back");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantry_core::{Record, User, Window};

    #[test]
    fn test_select_sql() {
        let select = Select::from::<tenantry_core::Role>()
            .filter("alias", "admin")
            .window(Window::new(0, 10));
        let sql = select_sql(&select).unwrap();
        assert_eq!(
            sql,
            "SELECT JSON_OBJECT('role_id', `role_id`, 'alias', `alias`, 'name', `name`, \
             'description', `description`, 'created_at', `created_at`) AS row_json \
             FROM `roles` WHERE `alias` <=> ? LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn test_insert_and_update_sql() {
        let mut row = FieldMap::new();
        row.insert("email".to_string(), Value::from("a@b.com"));
        row.insert("first_name".to_string(), Value::from("A"));

        assert_eq!(
            insert_sql(User::TABLE, &row).unwrap(),
            "INSERT INTO `users` (`email`, `first_name`) VALUES (?, ?)"
        );
        assert_eq!(
            update_sql(User::TABLE, User::PRIMARY_KEY, &row).unwrap(),
            "UPDATE `users` SET `email` = ?, `first_name` = ? WHERE `user_id` = ?"
        );
    }

    #[test]
    fn test_identifiers_are_checked() {
        assert!(quote_ident("users; DROP TABLE users").is_err());
        assert!(quote_ident("").is_err());
        assert_eq!(quote_ident("user_id").unwrap(), "`user_id`");
    }
}
