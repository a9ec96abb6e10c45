// ABOUTME: HTTP route modules and shared response envelopes
// ABOUTME: Composes per-feature routers into the full application router
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # HTTP Routes
//!
//! One module per feature area. Every handler follows the same shape: pull
//! the shared [`ServerResources`] out of router state, authorize through the
//! access gateway, then talk to the store. Responses wrap the stored payload
//! in an [`EntityResponse`] envelope carrying the record metadata.

use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::context::ServerResources;
use crate::errors::AppResult;
use crate::models::NotificationKind;
use crate::store::{collections, Cursor, DocumentStore, NewRecord, Query, Record};

pub mod chat;
pub mod connections;
pub mod gyms;
pub mod health;
pub mod media;
pub mod milestones;
pub mod notifications;
pub mod social;
pub mod trainers;
pub mod users;

/// Build the full application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::HealthRoutes::routes(Arc::clone(&resources)))
        .merge(users::UserRoutes::routes(Arc::clone(&resources)))
        .merge(trainers::TrainerRoutes::routes(Arc::clone(&resources)))
        .merge(gyms::GymRoutes::routes(Arc::clone(&resources)))
        .merge(social::SocialRoutes::routes(Arc::clone(&resources)))
        .merge(connections::ConnectionRoutes::routes(Arc::clone(
            &resources,
        )))
        .merge(chat::ChatRoutes::routes(Arc::clone(&resources)))
        .merge(milestones::MilestoneRoutes::routes(Arc::clone(&resources)))
        .merge(notifications::NotificationRoutes::routes(Arc::clone(
            &resources,
        )))
        .merge(media::MediaRoutes::routes(resources))
}

/// Response envelope wrapping a stored record's payload with its metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct EntityResponse<T> {
    /// Record id
    pub id: String,
    /// Owning subject id
    pub owner_id: String,
    /// Creation time
    pub created_at: String,
    /// Last update time
    pub updated_at: String,
    /// Version counter for optimistic concurrency
    pub version: i64,
    /// Entity fields
    #[serde(flatten)]
    pub data: T,
}

impl<T: serde::de::DeserializeOwned> EntityResponse<T> {
    /// Build the envelope from a stored record
    ///
    /// # Errors
    ///
    /// Fails when the stored payload does not match the expected shape.
    pub fn from_record(record: &Record) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            owner_id: record.owner_subject_id.clone(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            version: record.version,
            data: record.parse()?,
        })
    }
}

/// One page of entity responses
#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Records on this page
    pub items: Vec<EntityResponse<T>>,
    /// Token resuming after the last record, absent on the final page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T: serde::de::DeserializeOwned> PageResponse<T> {
    /// Build a page response from store records and an optional cursor
    ///
    /// # Errors
    ///
    /// Fails when any stored payload does not match the expected shape.
    pub fn new(records: &[Record], next_cursor: Option<&Cursor>) -> AppResult<Self> {
        Ok(Self {
            items: records
                .iter()
                .map(EntityResponse::from_record)
                .collect::<AppResult<Vec<_>>>()?,
            next_cursor: next_cursor.map(Cursor::encode),
        })
    }
}

/// Common pagination query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Page size
    pub limit: Option<u32>,
    /// Opaque resumption token from a previous page
    pub cursor: Option<String>,
}

impl PageParams {
    /// Apply limit and cursor to a store query
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the cursor token is malformed.
    pub fn apply(&self, query: Query) -> AppResult<Query> {
        let cursor = self.cursor.as_deref().map(Cursor::decode).transpose()?;
        Ok(query
            .with_limit(self.limit.unwrap_or(Query::DEFAULT_LIMIT))
            .with_cursor(cursor))
    }
}

/// Reject registration when the subject already holds a profile
///
/// Probing every profile collection keeps the one-collection invariant
/// enforceable at the only point where a profile comes into existence.
pub(crate) async fn ensure_unregistered(
    resources: &ServerResources,
    subject_id: &str,
) -> AppResult<()> {
    for role in crate::roles::Role::ALL {
        if resources
            .store
            .read_opt(role.profile_collection(), subject_id)
            .await?
            .is_some()
        {
            return Err(crate::errors::AppError::already_exists(format!(
                "A {role} profile for this account"
            ))
            .with_subject_id(subject_id.to_owned()));
        }
    }
    Ok(())
}

/// Best-effort notification delivery
///
/// Notifications are advisory; a delivery failure never fails the request
/// that triggered it.
pub(crate) async fn notify(
    resources: &ServerResources,
    recipient_id: &str,
    kind: NotificationKind,
    reference_id: Option<String>,
    text: String,
) {
    let notification = crate::models::Notification::new(kind, reference_id, text);
    let payload = match serde_json::to_value(&notification) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!("failed to serialize notification: {e}");
            return;
        }
    };

    if let Err(e) = resources
        .store
        .create(
            collections::NOTIFICATIONS,
            NewRecord::assigned(recipient_id, payload),
        )
        .await
    {
        tracing::debug!(
            recipient_id = %recipient_id,
            "failed to deliver notification: {e}"
        );
    }
}
