// ABOUTME: SQLite-backed document store implementation
// ABOUTME: Stores JSON documents in a single table with json_extract filtering
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! SQLite document store backend
//!
//! Every collection shares one `documents` table. Payloads are JSON text and
//! query predicates compile to `json_extract` expressions; envelope fields
//! (`id`, `owner_subject_id`, `created_at`, `updated_at`, `version`) map to
//! real columns. Timestamps are stored as fixed-width RFC 3339 UTC strings so
//! lexicographic order is chronological order.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{Cursor, DocumentStore, NewRecord, Page, Patch, Query, Record};
use crate::errors::{AppError, AppResult};
use crate::store::FilterOp;

/// SQLite document store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

const SELECT_COLUMNS: &str = "id, owner_subject_id, created_at, updated_at, version, body";

impl SqliteStore {
    /// Open (and create if missing) a SQLite database
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("invalid sqlite url: {e}")))?
            .create_if_missing(true);

        // A pooled in-memory database would hand each connection its own
        // empty database, so keep a single connection in that case.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Access the underlying pool (used by maintenance binaries)
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Fixed-width RFC 3339 rendering used for all stored timestamps
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("corrupt timestamp in store: {e}")))
}

fn row_to_record(row: &SqliteRow) -> AppResult<Record> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let body: String = row.try_get("body")?;
    let payload: Value = serde_json::from_str(&body)
        .map_err(|e| AppError::database(format!("corrupt document body: {e}")))?;

    Ok(Record {
        id: row.try_get("id")?,
        owner_subject_id: row.try_get("owner_subject_id")?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        version: row.try_get("version")?,
        payload,
    })
}

/// SQL expression addressing a record field, either an envelope column or a
/// JSON payload path
fn field_expr(field: &str) -> AppResult<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::invalid_input(format!(
            "invalid field name: {field:?}"
        )));
    }
    Ok(match field {
        "id" | "owner_subject_id" | "created_at" | "updated_at" | "version" => field.to_owned(),
        _ => format!("json_extract(body, '$.{field}')"),
    })
}

const fn op_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "!=",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
        // ArrayContains is expanded separately
        FilterOp::ArrayContains => "=",
    }
}

/// Bind a JSON value with its native SQLite type
fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) -> AppResult<()> {
    match value {
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                builder.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                builder.push_bind(f);
            } else {
                return Err(AppError::invalid_input("unsupported numeric filter value"));
            }
        }
        Value::Bool(b) => {
            builder.push_bind(i64::from(*b));
        }
        Value::Null | Value::Array(_) | Value::Object(_) => {
            return Err(AppError::invalid_input(
                "filter values must be strings, numbers, or booleans",
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection        TEXT NOT NULL,
                id                TEXT NOT NULL,
                owner_subject_id  TEXT NOT NULL,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL,
                version           INTEGER NOT NULL DEFAULT 1,
                body              TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_owner
             ON documents (collection, owner_subject_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_created
             ON documents (collection, created_at, id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create(&self, collection: &str, record: NewRecord) -> AppResult<Record> {
        if !record.payload.is_object() {
            return Err(AppError::invalid_input(
                "document payload must be a JSON object",
            ));
        }

        let id = record.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        // Truncate to the stored microsecond precision so the returned record
        // equals what a subsequent read yields.
        let now = Utc::now().trunc_subsecs(6);
        let body = serde_json::to_string(&record.payload)
            .map_err(|e| AppError::internal(format!("failed to serialize payload: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO documents
             (collection, id, owner_subject_id, created_at, updated_at, version, body)
             VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(&record.owner_subject_id)
        .bind(format_ts(now))
        .bind(format_ts(now))
        .bind(&body)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Record {
                id,
                owner_subject_id: record.owner_subject_id,
                created_at: now,
                updated_at: now,
                version: 1,
                payload: record.payload,
            }),
            Err(e) => {
                let unique = e
                    .as_database_error()
                    .is_some_and(sqlx::error::DatabaseError::is_unique_violation);
                if unique {
                    Err(AppError::already_exists(format!("{collection}/{id}"))
                        .with_resource_id(id))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn read(&self, collection: &str, id: &str) -> AppResult<Record> {
        self.read_opt(collection, id).await?.ok_or_else(|| {
            AppError::not_found(format!("{collection}/{id}")).with_resource_id(id)
        })
    }

    async fn read_opt(&self, collection: &str, id: &str) -> AppResult<Option<Record>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE collection = ? AND id = ?"
        ))
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> AppResult<Record> {
        let current = self.read(collection, id).await?;

        if let Some(expected) = patch.expected_version {
            if expected != current.version {
                return Err(AppError::version_conflict(format!(
                    "expected version {expected}, found {}",
                    current.version
                ))
                .with_resource_id(id));
            }
        }

        let mut payload = match current.payload {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in patch.fields {
            payload.insert(key, value);
        }
        let payload = Value::Object(payload);
        let body = serde_json::to_string(&payload)
            .map_err(|e| AppError::internal(format!("failed to serialize payload: {e}")))?;

        let now = Utc::now().trunc_subsecs(6);
        let new_version = current.version + 1;

        // Guarded write: if another request advanced the version between our
        // read and this statement, zero rows match and the caller retries.
        let result = sqlx::query(
            "UPDATE documents SET body = ?, updated_at = ?, version = ?
             WHERE collection = ? AND id = ? AND version = ?",
        )
        .bind(&body)
        .bind(format_ts(now))
        .bind(new_version)
        .bind(collection)
        .bind(id)
        .bind(current.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::version_conflict(format!(
                "{collection}/{id} was modified concurrently"
            ))
            .with_resource_id(id));
        }

        Ok(Record {
            id: current.id,
            owner_subject_id: current.owner_subject_id,
            created_at: current.created_at,
            updated_at: now,
            version: new_version,
            payload,
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("{collection}/{id}")).with_resource_id(id));
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: Query) -> AppResult<Page> {
        let order_expr = field_expr(&query.order.field)?;
        let limit = query.limit.clamp(1, Query::MAX_LIMIT);

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {SELECT_COLUMNS}, json_quote({order_expr}) AS order_key \
             FROM documents WHERE collection = "
        ));
        builder.push_bind(collection.to_owned());

        for filter in &query.filters {
            let expr = field_expr(&filter.field)?;
            if filter.op == FilterOp::ArrayContains {
                if !expr.starts_with("json_extract") {
                    return Err(AppError::invalid_input(
                        "array_contains only applies to payload fields",
                    ));
                }
                builder.push(format!(
                    " AND EXISTS (SELECT 1 FROM json_each({expr}) WHERE json_each.value = "
                ));
                push_value(&mut builder, &filter.value)?;
                builder.push(")");
            } else {
                builder.push(format!(" AND {expr} {} ", op_sql(filter.op)));
                push_value(&mut builder, &filter.value)?;
            }
        }

        if let Some(cursor) = &query.cursor {
            let (cmp, tie_cmp) = if query.order.descending {
                ("<", "<")
            } else {
                (">", ">")
            };
            if cursor.order_value.is_null() {
                // Records missing the order field sort as SQL NULL: first in
                // ascending order, last in descending. A null-keyed cursor
                // resumes within that run on the id tiebreak.
                builder.push(format!(" AND (({order_expr} IS NULL AND id {tie_cmp} "));
                builder.push_bind(cursor.id.clone());
                builder.push(")");
                if !query.order.descending {
                    builder.push(format!(" OR {order_expr} IS NOT NULL"));
                }
                builder.push(")");
            } else {
                builder.push(format!(" AND ({order_expr} {cmp} "));
                push_value(&mut builder, &cursor.order_value)?;
                builder.push(format!(" OR ({order_expr} = "));
                push_value(&mut builder, &cursor.order_value)?;
                builder.push(format!(" AND id {tie_cmp} "));
                builder.push_bind(cursor.id.clone());
                builder.push(")");
                if query.order.descending {
                    // NULL keys sort after every value in descending order and
                    // would otherwise be skipped once the cursor passes the
                    // last keyed row.
                    builder.push(format!(" OR {order_expr} IS NULL"));
                }
                builder.push(")");
            }
        }

        let direction = if query.order.descending { "DESC" } else { "ASC" };
        builder.push(format!(
            " ORDER BY {order_expr} {direction}, id {direction} LIMIT "
        ));
        // Over-fetch one row to learn whether another page exists.
        builder.push_bind(i64::from(limit) + 1);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let has_more = rows.len() > limit as usize;

        let mut records = Vec::with_capacity(rows.len().min(limit as usize));
        let mut last_order_key: Option<Value> = None;
        for row in rows.iter().take(limit as usize) {
            let record = row_to_record(row)?;
            let order_key: Option<String> = row.try_get("order_key")?;
            last_order_key = Some(match order_key {
                Some(raw) => serde_json::from_str(&raw)
                    .map_err(|e| AppError::database(format!("corrupt order key: {e}")))?,
                None => Value::Null,
            });
            records.push(record);
        }

        let next_cursor = if has_more {
            match (records.last(), last_order_key) {
                (Some(last), Some(order_value)) => Some(Cursor {
                    order_value,
                    id: last.id.clone(),
                }),
                _ => None,
            }
        } else {
            None
        };

        Ok(Page {
            records,
            next_cursor,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
