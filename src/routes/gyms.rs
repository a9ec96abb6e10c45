// ABOUTME: Route handlers for gym records and gym admin registration
// ABOUTME: Gym creation attaches the creating admin to the new gym
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Gym routes
//!
//! Creating a gym also patches the creating admin's profile with the new
//! gym id. That attachment is what scopes the admin's elevation: it may act
//! on entities owned by the members and trainers of that gym, and only that
//! gym.

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
use crate::models::{to_payload, Gym, GymAdminProfile, GymCreate, GymUpdate, RegisterProfile};
use crate::roles::Role;
use crate::store::{collections, DocumentStore, NewRecord, Patch, Query, QueryOrder};

/// Gym routes handler
pub struct GymRoutes;

impl GymRoutes {
    /// Create all gym routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/gym-admins", post(Self::handle_register_admin))
            .route("/api/gyms", post(Self::handle_create))
            .route("/api/gyms", get(Self::handle_list))
            .route("/api/gyms/:id", get(Self::handle_get))
            .route("/api/gyms/:id", put(Self::handle_update))
            .route("/api/gyms/:id", delete(Self::handle_delete))
            .with_state(resources)
    }

    /// Handle POST /api/gym-admins - register a gym admin profile
    async fn handle_register_admin(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<RegisterProfile>,
    ) -> Result<Response, AppError> {
        let claim = resources.gateway.authenticate_only(&headers)?;
        ensure_unregistered(&resources, &claim.subject_id).await?;
        body.validate()?;

        let profile = body.into_gym_admin_profile();
        let record = resources
            .store
            .create(
                collections::GYM_ADMINS,
                NewRecord::keyed(
                    claim.subject_id.clone(),
                    claim.subject_id.clone(),
                    to_payload(&profile)?,
                ),
            )
            .await?;

        tracing::info!(subject_id = %claim.subject_id, "gym admin profile registered");
        let response = EntityResponse::<GymAdminProfile>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle POST /api/gyms - create a gym and attach the admin to it
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<GymCreate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::GymAdmin]))
            .await?;
        body.validate()?;

        let gym = body.into_gym();
        let record = resources
            .store
            .create(
                collections::GYMS,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&gym)?),
            )
            .await?;

        resources
            .store
            .update(
                collections::GYM_ADMINS,
                &principal.subject_id,
                Patch::single("gym_id", serde_json::Value::String(record.id.clone())),
            )
            .await?;

        tracing::info!(gym_id = %record.id, admin = %principal.subject_id, "gym created");
        let response = EntityResponse::<Gym>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/gyms - list gyms
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let query =
            params.apply(Query::filtered(vec![]).ordered_by(QueryOrder::asc("created_at")))?;
        let page = resources.store.query(collections::GYMS, query).await?;
        let response = PageResponse::<Gym>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/gyms/:id
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let record = resources.store.read(collections::GYMS, &id).await?;
        let response = EntityResponse::<Gym>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle PUT /api/gyms/:id - update a gym the caller administers
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<GymUpdate>,
    ) -> Result<Response, AppError> {
        let (_, target) = resources
            .gateway
            .authorize_target(
                &headers,
                &AccessPolicy::roles(&[Role::GymAdmin]).owning(),
                collections::GYMS,
                &id,
            )
            .await?;
        body.validate()?;

        let record = resources
            .store
            .update(
                collections::GYMS,
                &id,
                Patch::fields(body.into_patch_fields()).expecting_version(target.version),
            )
            .await?;

        let response = EntityResponse::<Gym>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle DELETE /api/gyms/:id - delete a gym the caller administers
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let (principal, _) = resources
            .gateway
            .authorize_target(
                &headers,
                &AccessPolicy::roles(&[Role::GymAdmin]).owning(),
                collections::GYMS,
                &id,
            )
            .await?;

        resources.store.delete(collections::GYMS, &id).await?;

        // Detach the admin so a stale gym id cannot grant elevation over
        // members of a gym that no longer exists. An admin who has since
        // moved on to another gym keeps that attachment.
        if principal.gym_id() == Some(id.as_str()) {
            resources
                .store
                .update(
                    collections::GYM_ADMINS,
                    &principal.subject_id,
                    Patch::single("gym_id", serde_json::Value::Null),
                )
                .await?;
        }

        tracing::info!(gym_id = %id, "gym deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
