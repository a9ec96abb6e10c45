// ABOUTME: Entity repository facade over the external document store
// ABOUTME: Uniform create/read/update/delete/query interface parameterized by collection
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Entity Repository Facade
//!
//! A uniform interface over the document store. Collections are named per
//! entity type and every record carries the same envelope: id, owner,
//! timestamps, a version counter, and a schema-specific JSON payload.
//!
//! The facade holds no state and performs no caching; correctness over the
//! store's consistency model takes priority over local speed. The only
//! concurrency control is single-document optimistic versioning on `update`.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AppError, AppResult};

pub mod factory;
pub mod sqlite;

pub use factory::Store;

/// Collection names, one per entity type
pub mod collections {
    /// End-user profiles, keyed by subject id
    pub const USERS: &str = "users";
    /// Trainer profiles, keyed by subject id
    pub const TRAINERS: &str = "trainers";
    /// Gym admin profiles, keyed by subject id
    pub const GYM_ADMINS: &str = "gym_admins";
    /// Gym records
    pub const GYMS: &str = "gyms";
    /// Social feed posts
    pub const POSTS: &str = "posts";
    /// Comments on posts
    pub const COMMENTS: &str = "comments";
    /// Post likes, keyed `post_{post_id}_{subject_id}`
    pub const LIKES: &str = "likes";
    /// Connection requests between members
    pub const CONNECTIONS: &str = "connections";
    /// Chat conversations
    pub const CONVERSATIONS: &str = "conversations";
    /// Chat messages
    pub const MESSAGES: &str = "messages";
    /// Per-user notifications
    pub const NOTIFICATIONS: &str = "notifications";
    /// Achievement catalog
    pub const ACHIEVEMENTS: &str = "achievements";
    /// Unlocked achievements per user
    pub const USER_ACHIEVEMENTS: &str = "user_achievements";
    /// Challenges created by trainers and gym admins
    pub const CHALLENGES: &str = "challenges";
    /// Challenge participation records
    pub const CHALLENGE_PARTICIPANTS: &str = "challenge_participants";
    /// Point-earning activity log for milestones
    pub const MILESTONE_ACTIVITIES: &str = "milestone_activities";
}

/// A stored document with its envelope fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Unique id within the collection
    pub id: String,
    /// Subject id of the owning principal
    pub owner_subject_id: String,
    /// Server-assigned creation time
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update
    pub updated_at: DateTime<Utc>,
    /// Monotonic version for optimistic concurrency, starts at 1
    pub version: i64,
    /// Schema-specific fields
    pub payload: Value,
}

impl Record {
    /// Deserialize the payload into a typed model
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload does not match the model shape.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| AppError::internal(format!("stored document has unexpected shape: {e}")))
    }

    /// Read a string field from the payload
    #[must_use]
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}

/// Input for `create`: server assigns id (when absent) and timestamps
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Explicit id when the collection has a natural key (e.g. subject id for
    /// profile collections); `None` lets the store assign a fresh UUID
    pub id: Option<String>,
    /// Owning principal
    pub owner_subject_id: String,
    /// Schema-specific fields
    pub payload: Value,
}

impl NewRecord {
    /// Record with a store-assigned id
    #[must_use]
    pub fn assigned(owner_subject_id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: None,
            owner_subject_id: owner_subject_id.into(),
            payload,
        }
    }

    /// Record keyed by a natural id
    #[must_use]
    pub fn keyed(
        id: impl Into<String>,
        owner_subject_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: Some(id.into()),
            owner_subject_id: owner_subject_id.into(),
            payload,
        }
    }
}

/// Partial patch for `update`
///
/// Only the supplied top-level fields are overwritten; `updated_at` is always
/// refreshed and `version` always advances. When `expected_version` is set and
/// stale, the update fails with a version conflict instead of clobbering a
/// concurrent write.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    /// Top-level payload fields to overwrite
    pub fields: serde_json::Map<String, Value>,
    /// Optimistic concurrency check; `None` means last-write-wins
    pub expected_version: Option<i64>,
}

impl Patch {
    /// Patch overwriting the given fields, last-write-wins
    #[must_use]
    pub fn fields(fields: serde_json::Map<String, Value>) -> Self {
        Self {
            fields,
            expected_version: None,
        }
    }

    /// Add an optimistic version check
    #[must_use]
    pub const fn expecting_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Single-field patch helper
    #[must_use]
    pub fn single(field: &str, value: Value) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert(field.to_owned(), value);
        Self::fields(fields)
    }
}

/// Comparison operator for query filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Field equals value
    Eq,
    /// Field differs from value
    Ne,
    /// Field greater than value
    Gt,
    /// Field greater than or equal to value
    Gte,
    /// Field less than value
    Lt,
    /// Field less than or equal to value
    Lte,
    /// Array-valued field contains value
    ArrayContains,
}

/// One query predicate: `{field, op, value}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// Payload field name, or one of the envelope fields
    /// (`id`, `owner_subject_id`, `created_at`, `updated_at`)
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: Value,
}

impl Filter {
    /// Equality filter helper
    #[must_use]
    pub fn eq(field: &str, value: Value) -> Self {
        Self {
            field: field.to_owned(),
            op: FilterOp::Eq,
            value,
        }
    }

    /// Array-membership filter helper
    #[must_use]
    pub fn array_contains(field: &str, value: Value) -> Self {
        Self {
            field: field.to_owned(),
            op: FilterOp::ArrayContains,
            value,
        }
    }
}

/// Sort order for queries; ties always break on `id` so paging is stable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOrder {
    /// Field to order by
    pub field: String,
    /// Descending when true
    pub descending: bool,
}

impl QueryOrder {
    /// Ascending order on a field
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            descending: false,
        }
    }

    /// Descending order on a field
    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            descending: true,
        }
    }
}

/// Opaque resumption point for `query`
///
/// Encodes the `(order value, id)` pair of the last record of the previous
/// page. Repeating a query with the cursor yields no duplicated or skipped
/// records relative to that page, assuming no concurrent writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cursor {
    /// Order-field value at the page boundary
    pub order_value: Value,
    /// Id at the page boundary, the tie-breaker
    pub id: String,
}

impl Cursor {
    /// Encode into an opaque URL-safe token
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a client-supplied token
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the token is not a cursor this store issued.
    pub fn decode(token: &str) -> AppResult<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| AppError::invalid_input("Malformed page cursor"))?;
        serde_json::from_slice(&bytes).map_err(|_| AppError::invalid_input("Malformed page cursor"))
    }
}

/// One page of query results
#[derive(Debug, Clone)]
pub struct Page {
    /// Records in stable `(order field, id)` order
    pub records: Vec<Record>,
    /// Cursor for the next page; `None` when the sequence is exhausted
    pub next_cursor: Option<Cursor>,
}

/// Query description passed to the facade
#[derive(Debug, Clone)]
pub struct Query {
    /// Conjunctive predicates
    pub filters: Vec<Filter>,
    /// Sort order; defaults to ascending `created_at`
    pub order: QueryOrder,
    /// Page size, clamped to [`Query::MAX_LIMIT`]
    pub limit: u32,
    /// Resume from a previous page boundary
    pub cursor: Option<Cursor>,
}

impl Query {
    /// Hard page-size ceiling
    pub const MAX_LIMIT: u32 = 200;
    /// Default page size
    pub const DEFAULT_LIMIT: u32 = 20;

    /// Query with filters and default ordering
    #[must_use]
    pub fn filtered(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            order: QueryOrder::asc("created_at"),
            limit: Self::DEFAULT_LIMIT,
            cursor: None,
        }
    }

    /// Set the sort order
    #[must_use]
    pub fn ordered_by(mut self, order: QueryOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the page size
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = if limit > Self::MAX_LIMIT {
            Self::MAX_LIMIT
        } else {
            limit
        };
        self
    }

    /// Resume from a cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Core document store abstraction
///
/// All backends must implement this trait to provide a consistent interface
/// for the authorization gateway and route handlers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run schema setup; idempotent
    async fn migrate(&self) -> AppResult<()>;

    /// Insert a record; fails with `ResourceAlreadyExists` when the id (the
    /// collection's natural key) is already present
    async fn create(&self, collection: &str, record: NewRecord) -> AppResult<Record>;

    /// Fetch a record by id; fails with `ResourceNotFound` when absent
    async fn read(&self, collection: &str, id: &str) -> AppResult<Record>;

    /// Fetch a record by id, `None` when absent
    async fn read_opt(&self, collection: &str, id: &str) -> AppResult<Option<Record>>;

    /// Apply a partial patch; fails with `ResourceNotFound` when absent and
    /// `VersionConflict` when the optimistic version check is stale
    async fn update(&self, collection: &str, id: &str, patch: Patch) -> AppResult<Record>;

    /// Delete a record; fails with `ResourceNotFound` when absent
    async fn delete(&self, collection: &str, id: &str) -> AppResult<()>;

    /// Run a filtered, stably-ordered, cursor-resumable query
    async fn query(&self, collection: &str, query: Query) -> AppResult<Page>;

    /// Liveness probe for health checks
    async fn ping(&self) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor {
            order_value: serde_json::json!("2025-03-01T00:00:00Z"),
            id: "abc".to_owned(),
        };
        let token = cursor.encode();
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn garbage_cursor_is_invalid_input() {
        let err = Cursor::decode("!!!not-base64!!!").unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::InvalidInput);
    }

    #[test]
    fn query_limit_is_clamped() {
        let q = Query::filtered(vec![]).with_limit(10_000);
        assert_eq!(q.limit, Query::MAX_LIMIT);
    }
}
