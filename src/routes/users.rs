// ABOUTME: Route handlers for member profiles
// ABOUTME: Registration, own-profile access, lookup, and gym-scoped listing
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Member profile routes
//!
//! Registration runs under `authenticate_only`: the caller holds a valid
//! credential but no profile yet, so full authorization would bounce it with
//! `no_profile`. Every other endpoint goes through the access gateway.

use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use super::{ensure_unregistered, EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::{to_payload, ProfileUpdate, RegisterProfile, UserProfile};
use crate::roles::Role;
use crate::store::{collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder};

/// Member profile routes handler
pub struct UserRoutes;

impl UserRoutes {
    /// Create all member profile routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/users", post(Self::handle_register))
            .route("/api/users", get(Self::handle_list))
            .route("/api/users/me", get(Self::handle_get_me))
            .route("/api/users/me", put(Self::handle_update_me))
            .route("/api/users/:id", get(Self::handle_get))
            .route("/api/users/:id", delete(Self::handle_delete))
            .with_state(resources)
    }

    /// Handle POST /api/users - register a member profile
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<RegisterProfile>,
    ) -> Result<Response, AppError> {
        let claim = resources.gateway.authenticate_only(&headers)?;
        ensure_unregistered(&resources, &claim.subject_id).await?;
        body.validate()?;

        let profile = body.into_user_profile();
        let record = resources
            .store
            .create(
                collections::USERS,
                NewRecord::keyed(
                    claim.subject_id.clone(),
                    claim.subject_id.clone(),
                    to_payload(&profile)?,
                ),
            )
            .await?;

        tracing::info!(subject_id = %claim.subject_id, "member profile registered");
        let response = EntityResponse::<UserProfile>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/users/me - own profile
    async fn handle_get_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::User]))
            .await?;

        let response = EntityResponse::<UserProfile>::from_record(&principal.profile)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle PUT /api/users/me - update own profile
    async fn handle_update_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<ProfileUpdate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::User]))
            .await?;
        body.validate()?;

        let record = resources
            .store
            .update(
                collections::USERS,
                &principal.subject_id,
                Patch::fields(body.into_patch_fields()),
            )
            .await?;

        let response = EntityResponse::<UserProfile>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/users/:id - look up a member profile
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let record = resources.store.read(collections::USERS, &id).await?;
        let response = EntityResponse::<UserProfile>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/users - gym admins list the members of their own gym
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::GymAdmin]))
            .await?;

        let Some(gym_id) = principal.gym_id() else {
            return Err(AppError::forbidden(
                "Admin is not attached to a gym",
            )
            .with_subject_id(principal.subject_id));
        };

        let query = params.apply(
            Query::filtered(vec![Filter::eq(
                "gym_id",
                serde_json::Value::String(gym_id.to_owned()),
            )])
            .ordered_by(QueryOrder::asc("created_at")),
        )?;

        let page = resources.store.query(collections::USERS, query).await?;
        let response =
            PageResponse::<UserProfile>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle DELETE /api/users/:id - remove a member profile
    ///
    /// Allowed for the member itself, or a gym admin whose gym the member
    /// belongs to.
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
                collections::USERS,
                &id,
            )
            .await?;

        resources.store.delete(collections::USERS, &id).await?;
        tracing::info!(subject_id = %id, "member profile deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
