// ABOUTME: Route handlers for per-user notifications
// ABOUTME: Listing, read flags, and removal, always scoped to the recipient
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Notification routes

use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::{EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::Notification;
use crate::store::{collections, DocumentStore, Filter, Patch, Query, QueryOrder};

/// Query parameters for listing notifications
#[derive(Debug, Default, Deserialize)]
struct ListNotificationsParams {
    /// Only unread notifications when true
    unread_only: Option<bool>,
    /// Pagination
    limit: Option<u32>,
    /// Pagination cursor
    cursor: Option<String>,
}

/// Notification routes handler
pub struct NotificationRoutes;

impl NotificationRoutes {
    /// Create all notification routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/notifications", get(Self::handle_list))
            .route("/api/notifications/read-all", post(Self::handle_read_all))
            .route("/api/notifications/:id/read", post(Self::handle_mark_read))
            .route("/api/notifications/:id", delete(Self::handle_delete))
            .with_state(resources)
    }

    /// Handle GET /api/notifications - list the caller's notifications
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<ListNotificationsParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let mut filters = vec![Filter::eq(
            "owner_subject_id",
            Value::String(principal.subject_id.clone()),
        )];
        if params.unread_only.unwrap_or(false) {
            filters.push(Filter::eq("read", Value::Bool(false)));
        }

        let page_params = PageParams {
            limit: params.limit,
            cursor: params.cursor,
        };
        let query = page_params
            .apply(Query::filtered(filters).ordered_by(QueryOrder::desc("created_at")))?;

        let page = resources
            .store
            .query(collections::NOTIFICATIONS, query)
            .await?;
        let response =
            PageResponse::<Notification>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/notifications/:id/read
    async fn handle_mark_read(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let (_, _) = resources
            .gateway
            .authorize_target(
                &headers,
                &AccessPolicy::OWNER,
                collections::NOTIFICATIONS,
                &id,
            )
            .await?;

        let updated = resources
            .store
            .update(
                collections::NOTIFICATIONS,
                &id,
                Patch::single("read", Value::Bool(true)),
            )
            .await?;

        let response = EntityResponse::<Notification>::from_record(&updated)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/notifications/read-all - mark every unread one read
    async fn handle_read_all(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let mut marked = 0usize;
        loop {
            let page = resources
                .store
                .query(
                    collections::NOTIFICATIONS,
                    Query::filtered(vec![
                        Filter::eq(
                            "owner_subject_id",
                            Value::String(principal.subject_id.clone()),
                        ),
                        Filter::eq("read", Value::Bool(false)),
                    ])
                    .with_limit(Query::MAX_LIMIT),
                )
                .await?;
            if page.records.is_empty() {
                break;
            }
            for record in &page.records {
                resources
                    .store
                    .update(
                        collections::NOTIFICATIONS,
                        &record.id,
                        Patch::single("read", Value::Bool(true)),
                    )
                    .await?;
                marked += 1;
            }
            if page.next_cursor.is_none() {
                break;
            }
        }

        Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "marked_read": marked })),
        )
            .into_response())
    }

    /// Handle DELETE /api/notifications/:id
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize_target(
                &headers,
                &AccessPolicy::OWNER,
                collections::NOTIFICATIONS,
                &id,
            )
            .await?;

        resources
            .store
            .delete(collections::NOTIFICATIONS, &id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
