// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides common store, resource, and profile seeding helpers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]

//! Shared test utilities for `gympulse`

use std::path::PathBuf;
use std::sync::{Arc, Once};

use chrono::Duration;
use gympulse::{
    auth::mint_token,
    config::{Environment, LogLevel, ServerConfig},
    context::ServerResources,
    store::{collections, DocumentStore, NewRecord, Store},
};

/// Shared secret standing in for the identity provider's signing key
pub const TEST_SECRET: &[u8] = b"integration-test-provider-secret";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fresh in-memory store with the schema applied
pub async fn create_test_store() -> Arc<Store> {
    init_test_logging();
    let store = Store::new("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    Arc::new(store)
}

/// Test server configuration pointing at throwaway locations
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".to_owned(),
        provider_secret: String::from_utf8_lossy(TEST_SECRET).into_owned(),
        token_cache_size: 64,
        media_root: PathBuf::from(std::env::temp_dir()).join("gympulse-test-media"),
        environment: Environment::Testing,
        log_level: LogLevel::Warn,
    }
}

/// Full resource container over a fresh in-memory store
pub async fn create_test_resources() -> Arc<ServerResources> {
    let store = create_test_store().await;
    Arc::new(ServerResources::new(test_config(), store))
}

/// Mint a valid credential for a subject
pub fn mint_test_token(subject_id: &str) -> String {
    mint_token(
        TEST_SECRET,
        subject_id,
        Duration::hours(1),
        serde_json::Map::new(),
    )
    .unwrap()
}

/// `Authorization` header value for a subject
pub fn bearer(subject_id: &str) -> String {
    format!("Bearer {}", mint_test_token(subject_id))
}

/// Seed a member profile keyed by subject id
pub async fn seed_user(store: &Store, subject_id: &str, gym_id: Option<&str>) {
    let payload = serde_json::json!({
        "display_name": format!("User {subject_id}"),
        "email": format!("{subject_id}@example.com"),
        "gym_id": gym_id,
        "is_online": false,
        "experience_points": 0,
        "level": 1,
    });
    store
        .create(
            collections::USERS,
            NewRecord::keyed(subject_id, subject_id, payload),
        )
        .await
        .unwrap();
}

/// Seed a trainer profile keyed by subject id
pub async fn seed_trainer(store: &Store, subject_id: &str, gym_id: Option<&str>) {
    let payload = serde_json::json!({
        "display_name": format!("Trainer {subject_id}"),
        "email": format!("{subject_id}@example.com"),
        "gym_id": gym_id,
        "specialties": ["strength"],
        "is_online": false,
    });
    store
        .create(
            collections::TRAINERS,
            NewRecord::keyed(subject_id, subject_id, payload),
        )
        .await
        .unwrap();
}

/// Seed a gym admin profile keyed by subject id
pub async fn seed_gym_admin(store: &Store, subject_id: &str, gym_id: Option<&str>) {
    let payload = serde_json::json!({
        "display_name": format!("Admin {subject_id}"),
        "email": format!("{subject_id}@example.com"),
        "gym_id": gym_id,
        "is_online": false,
    });
    store
        .create(
            collections::GYM_ADMINS,
            NewRecord::keyed(subject_id, subject_id, payload),
        )
        .await
        .unwrap();
}
