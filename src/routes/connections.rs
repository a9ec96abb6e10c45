// ABOUTME: Route handlers for member-to-member connection requests
// ABOUTME: Request, accept, decline, and removal with notifications
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Connection routes
//!
//! Accept and decline are recipient-only transitions out of `pending`; any
//! other starting status conflicts. Either participant can remove the
//! connection afterwards.

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

use super::{notify, EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::{
    to_payload, Connection, ConnectionRequest, ConnectionStatus, NotificationKind,
};
use crate::roles::Role;
use crate::store::{collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder};

/// Query parameters for listing connections
#[derive(Debug, Default, Deserialize)]
struct ListConnectionsParams {
    /// Restrict to one lifecycle status
    status: Option<String>,
    /// Pagination
    limit: Option<u32>,
    /// Pagination cursor
    cursor: Option<String>,
}

/// Connection routes handler
pub struct ConnectionRoutes;

impl ConnectionRoutes {
    /// Create all connection routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/connections", post(Self::handle_request))
            .route("/api/connections", get(Self::handle_list))
            .route("/api/connections/:id/accept", post(Self::handle_accept))
            .route("/api/connections/:id/decline", post(Self::handle_decline))
            .route("/api/connections/:id", delete(Self::handle_remove))
            .with_state(resources)
    }

    /// Whether a live (pending or accepted) connection already links the two
    async fn existing_connection(
        resources: &ServerResources,
        a: &str,
        b: &str,
    ) -> Result<bool, AppError> {
        let query = Query::filtered(vec![Filter::array_contains(
            "user_ids",
            Value::String(a.to_owned()),
        )])
        .with_limit(Query::MAX_LIMIT);

        let page = resources.store.query(collections::CONNECTIONS, query).await?;
        for record in &page.records {
            let connection: Connection = record.parse()?;
            if connection.involves(b)
                && matches!(
                    connection.status,
                    ConnectionStatus::Pending | ConnectionStatus::Accepted
                )
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Handle POST /api/connections - send a connection request
    async fn handle_request(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<ConnectionRequest>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        body.validate()?;

        if body.recipient_id == principal.subject_id {
            return Err(AppError::invalid_input(
                "Cannot send a connection request to yourself",
            ));
        }

        // The recipient must be a registered member or trainer.
        let mut recipient_exists = false;
        for role in [Role::User, Role::Trainer] {
            if resources
                .store
                .read_opt(role.profile_collection(), &body.recipient_id)
                .await?
                .is_some()
            {
                recipient_exists = true;
                break;
            }
        }
        if !recipient_exists {
            return Err(AppError::not_found("recipient profile")
                .with_resource_id(body.recipient_id.clone()));
        }

        if Self::existing_connection(&resources, &principal.subject_id, &body.recipient_id).await? {
            return Err(AppError::already_exists("A connection between these accounts"));
        }

        let connection = Connection::new(
            principal.subject_id.clone(),
            body.recipient_id.clone(),
            body.message,
        );
        let record = resources
            .store
            .create(
                collections::CONNECTIONS,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&connection)?),
            )
            .await?;

        notify(
            &resources,
            &body.recipient_id,
            NotificationKind::ConnectionRequest,
            Some(record.id.clone()),
            "You received a new connection request".to_owned(),
        )
        .await;

        let response = EntityResponse::<Connection>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/connections - list the caller's connections
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<ListConnectionsParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let mut filters = vec![Filter::array_contains(
            "user_ids",
            Value::String(principal.subject_id.clone()),
        )];
        if let Some(status) = &params.status {
            // Reject unknown statuses up front rather than silently matching
            // nothing.
            let status: ConnectionStatus = status.parse()?;
            filters.push(Filter::eq(
                "status",
                Value::String(status.as_str().to_owned()),
            ));
        }

        let page_params = PageParams {
            limit: params.limit,
            cursor: params.cursor,
        };
        let query = page_params
            .apply(Query::filtered(filters).ordered_by(QueryOrder::desc("created_at")))?;

        let page = resources
            .store
            .query(collections::CONNECTIONS, query)
            .await?;
        let response = PageResponse::<Connection>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Transition a pending connection; only the recipient may do this
    async fn transition(
        resources: &ServerResources,
        headers: &HeaderMap,
        id: &str,
        next: ConnectionStatus,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(headers, &AccessPolicy::ANY)
            .await?;

        let record = resources.store.read(collections::CONNECTIONS, id).await?;
        let connection: Connection = record.parse()?;

        if connection.recipient_id != principal.subject_id {
            return Err(AppError::not_owner(
                "Only the recipient can act on a connection request",
            )
            .with_subject_id(principal.subject_id)
            .with_resource_id(id.to_owned()));
        }
        if connection.status != ConnectionStatus::Pending {
            return Err(AppError::version_conflict(format!(
                "Connection is already {}",
                connection.status
            )));
        }

        let updated = resources
            .store
            .update(
                collections::CONNECTIONS,
                id,
                Patch::single("status", Value::String(next.as_str().to_owned()))
                    .expecting_version(record.version),
            )
            .await?;

        if next == ConnectionStatus::Accepted {
            notify(
                resources,
                &connection.requester_id,
                NotificationKind::ConnectionAccepted,
                Some(id.to_owned()),
                "Your connection request was accepted".to_owned(),
            )
            .await;
        }

        let response = EntityResponse::<Connection>::from_record(&updated)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/connections/:id/accept
    async fn handle_accept(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        Self::transition(&resources, &headers, &id, ConnectionStatus::Accepted).await
    }

    /// Handle POST /api/connections/:id/decline
    async fn handle_decline(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        Self::transition(&resources, &headers, &id, ConnectionStatus::Declined).await
    }

    /// Handle DELETE /api/connections/:id - either participant removes it
    async fn handle_remove(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let record = resources.store.read(collections::CONNECTIONS, &id).await?;
        let connection: Connection = record.parse()?;
        if !connection.involves(&principal.subject_id) {
            return Err(AppError::not_owner(
                "Only a participant can remove a connection",
            )
            .with_subject_id(principal.subject_id)
            .with_resource_id(id.clone()));
        }

        resources.store.delete(collections::CONNECTIONS, &id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
