// ABOUTME: Route handlers for trainer profiles
// ABOUTME: Registration, own-profile access, lookup, and gym-scoped listing
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Trainer profile routes

use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::{ensure_unregistered, EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::{to_payload, ProfileUpdate, RegisterProfile, TrainerProfile};
use crate::roles::Role;
use crate::store::{collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder};

/// Query parameters for listing trainers
#[derive(Debug, Default, Deserialize)]
struct ListTrainersParams {
    /// Restrict to trainers of one gym
    gym_id: Option<String>,
    /// Pagination
    limit: Option<u32>,
    /// Pagination cursor
    cursor: Option<String>,
}

/// Trainer profile routes handler
pub struct TrainerRoutes;

impl TrainerRoutes {
    /// Create all trainer profile routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/trainers", post(Self::handle_register))
            .route("/api/trainers", get(Self::handle_list))
            .route("/api/trainers/me", get(Self::handle_get_me))
            .route("/api/trainers/me", put(Self::handle_update_me))
            .route("/api/trainers/:id", get(Self::handle_get))
            .with_state(resources)
    }

    /// Handle POST /api/trainers - register a trainer profile
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<RegisterProfile>,
    ) -> Result<Response, AppError> {
        let claim = resources.gateway.authenticate_only(&headers)?;
        ensure_unregistered(&resources, &claim.subject_id).await?;
        body.validate()?;

        let profile = body.into_trainer_profile();
        let record = resources
            .store
            .create(
                collections::TRAINERS,
                NewRecord::keyed(
                    claim.subject_id.clone(),
                    claim.subject_id.clone(),
                    to_payload(&profile)?,
                ),
            )
            .await?;

        tracing::info!(subject_id = %claim.subject_id, "trainer profile registered");
        let response = EntityResponse::<TrainerProfile>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/trainers/me - own profile
    async fn handle_get_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::Trainer]))
            .await?;

        let response = EntityResponse::<TrainerProfile>::from_record(&principal.profile)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle PUT /api/trainers/me - update own profile
    async fn handle_update_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<ProfileUpdate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::Trainer]))
            .await?;
        body.validate()?;

        let record = resources
            .store
            .update(
                collections::TRAINERS,
                &principal.subject_id,
                Patch::fields(body.into_patch_fields()),
            )
            .await?;

        let response = EntityResponse::<TrainerProfile>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/trainers/:id - look up a trainer profile
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let record = resources.store.read(collections::TRAINERS, &id).await?;
        let response = EntityResponse::<TrainerProfile>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/trainers - list trainers, optionally by gym
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<ListTrainersParams>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let filters = params
            .gym_id
            .map(|gym_id| vec![Filter::eq("gym_id", serde_json::Value::String(gym_id))])
            .unwrap_or_default();

        let page_params = PageParams {
            limit: params.limit,
            cursor: params.cursor,
        };
        let query = page_params
            .apply(Query::filtered(filters).ordered_by(QueryOrder::asc("created_at")))?;

        let page = resources.store.query(collections::TRAINERS, query).await?;
        let response =
            PageResponse::<TrainerProfile>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
