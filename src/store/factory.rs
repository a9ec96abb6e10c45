// ABOUTME: Store factory and backend abstraction for runtime backend selection
// ABOUTME: Detects the backend from the connection string and delegates trait calls
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Store factory
//!
//! Creates the concrete document-store backend from a connection string. Only
//! SQLite ships today; the enum wrapper keeps the call sites backend-agnostic.

use async_trait::async_trait;
use tracing::{debug, info};

use super::sqlite::SqliteStore;
use super::{DocumentStore, NewRecord, Page, Patch, Query, Record};
use crate::errors::{AppError, AppResult};

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Embedded SQLite database
    Sqlite,
}

/// Store instance wrapper that delegates to the appropriate backend
#[derive(Clone)]
pub enum Store {
    /// SQLite backend
    Sqlite(SqliteStore),
}

impl Store {
    /// Create a store from a connection string
    ///
    /// # Errors
    ///
    /// Returns an error if the URL scheme is unsupported or the connection
    /// fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        debug!("detecting store backend from url");
        let store_type = detect_store_type(database_url)?;
        info!("store backend: {store_type:?}");

        match store_type {
            StoreType::Sqlite => {
                let store = SqliteStore::new(database_url).await?;
                Ok(Self::Sqlite(store))
            }
        }
    }

    /// Descriptive backend string for startup logging
    #[must_use]
    pub const fn backend_info(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "SQLite (embedded)",
        }
    }
}

/// Detect the backend from the connection string
fn detect_store_type(database_url: &str) -> AppResult<StoreType> {
    if database_url.starts_with("sqlite:") || database_url.ends_with(".db") {
        Ok(StoreType::Sqlite)
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Err(AppError::config(
            "PostgreSQL backend is not compiled into this build",
        ))
    } else {
        Err(AppError::config(format!(
            "unsupported database url: {database_url}"
        )))
    }
}

#[async_trait]
impl DocumentStore for Store {
    async fn migrate(&self) -> AppResult<()> {
        match self {
            Self::Sqlite(store) => store.migrate().await,
        }
    }

    async fn create(&self, collection: &str, record: NewRecord) -> AppResult<Record> {
        match self {
            Self::Sqlite(store) => store.create(collection, record).await,
        }
    }

    async fn read(&self, collection: &str, id: &str) -> AppResult<Record> {
        match self {
            Self::Sqlite(store) => store.read(collection, id).await,
        }
    }

    async fn read_opt(&self, collection: &str, id: &str) -> AppResult<Option<Record>> {
        match self {
            Self::Sqlite(store) => store.read_opt(collection, id).await,
        }
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> AppResult<Record> {
        match self {
            Self::Sqlite(store) => store.update(collection, id, patch).await,
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        match self {
            Self::Sqlite(store) => store.delete(collection, id).await,
        }
    }

    async fn query(&self, collection: &str, query: Query) -> AppResult<Page> {
        match self {
            Self::Sqlite(store) => store.query(collection, query).await,
        }
    }

    async fn ping(&self) -> AppResult<()> {
        match self {
            Self::Sqlite(store) => store.ping().await,
        }
    }
}
