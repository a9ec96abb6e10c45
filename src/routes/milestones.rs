// ABOUTME: Route handlers for milestone progress, achievements, and challenges
// ABOUTME: Activity reports advance experience points and levels
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Milestone routes
//!
//! Members report point-earning activities; the handler folds the points into
//! the profile and advances the level while the accumulated points cover the
//! next level's cost. The profile patch carries the version read at the start
//! so two concurrent reports cannot silently drop points.

use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::{notify, EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::milestone::points_for_next_level;
use crate::models::{
    to_payload, Achievement, ActivityReport, Challenge, ChallengeCreate, MilestoneSummary,
    NotificationKind, UserAchievement, UserProfile,
};
use crate::roles::Role;
use crate::store::{collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder};

/// Query parameters for listing challenges
#[derive(Debug, Default, Deserialize)]
struct ListChallengesParams {
    /// Restrict to challenges of one gym
    gym_id: Option<String>,
    /// Pagination
    limit: Option<u32>,
    /// Pagination cursor
    cursor: Option<String>,
}

/// Milestone routes handler
pub struct MilestoneRoutes;

impl MilestoneRoutes {
    /// Create all milestone routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/milestones/me", get(Self::handle_summary))
            .route(
                "/api/milestones/activities",
                post(Self::handle_report_activity),
            )
            .route("/api/achievements", get(Self::handle_list_achievements))
            .route("/api/achievements/me", get(Self::handle_my_achievements))
            .route("/api/challenges", post(Self::handle_create_challenge))
            .route("/api/challenges", get(Self::handle_list_challenges))
            .route("/api/challenges/:id/join", post(Self::handle_join_challenge))
            .with_state(resources)
    }

    /// Handle GET /api/milestones/me - the caller's progress summary
    async fn handle_summary(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::User]))
            .await?;

        let profile: UserProfile = principal.profile.parse()?;
        let summary = MilestoneSummary::from_points(profile.level, profile.experience_points);
        Ok((StatusCode::OK, Json(summary)).into_response())
    }

    /// Handle POST /api/milestones/activities - report a point-earning activity
    async fn handle_report_activity(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<ActivityReport>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::User]))
            .await?;
        body.validate()?;

        resources
            .store
            .create(
                collections::MILESTONE_ACTIVITIES,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&body)?),
            )
            .await?;

        let profile: UserProfile = principal.profile.parse()?;
        let mut points = profile.experience_points + body.points;
        let mut level = profile.level;
        while points >= points_for_next_level(level) {
            points -= points_for_next_level(level);
            level += 1;
        }
        let leveled_up = level > profile.level;

        let mut fields = serde_json::Map::new();
        fields.insert("experience_points".to_owned(), Value::from(points));
        fields.insert("level".to_owned(), Value::from(level));
        resources
            .store
            .update(
                collections::USERS,
                &principal.subject_id,
                Patch::fields(fields).expecting_version(principal.profile.version),
            )
            .await?;

        if leveled_up {
            tracing::info!(
                subject_id = %principal.subject_id,
                level,
                "member leveled up"
            );
            notify(
                &resources,
                &principal.subject_id,
                NotificationKind::LevelUp,
                None,
                format!("You reached level {level}"),
            )
            .await;
        }

        let summary = MilestoneSummary::from_points(level, points);
        Ok((StatusCode::OK, Json(summary)).into_response())
    }

    /// Handle GET /api/achievements - the achievement catalog
    async fn handle_list_achievements(
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
        let page = resources
            .store
            .query(collections::ACHIEVEMENTS, query)
            .await?;
        let response = PageResponse::<Achievement>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/achievements/me - the caller's unlocked achievements
    async fn handle_my_achievements(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::User]))
            .await?;

        let query = params.apply(
            Query::filtered(vec![Filter::eq(
                "owner_subject_id",
                Value::String(principal.subject_id.clone()),
            )])
            .ordered_by(QueryOrder::asc("created_at")),
        )?;
        let page = resources
            .store
            .query(collections::USER_ACHIEVEMENTS, query)
            .await?;
        let response =
            PageResponse::<UserAchievement>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/challenges - trainers and gym admins create challenges
    async fn handle_create_challenge(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<ChallengeCreate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(
                &headers,
                &AccessPolicy::roles(&[Role::Trainer, Role::GymAdmin]),
            )
            .await?;
        body.validate()?;

        let challenge = body.into_challenge();
        let record = resources
            .store
            .create(
                collections::CHALLENGES,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&challenge)?),
            )
            .await?;

        tracing::info!(challenge_id = %record.id, "challenge created");
        let response = EntityResponse::<Challenge>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/challenges - list challenges, optionally by gym
    async fn handle_list_challenges(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<ListChallengesParams>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let filters = params
            .gym_id
            .map(|gym_id| vec![Filter::eq("gym_id", Value::String(gym_id))])
            .unwrap_or_default();

        let page_params = PageParams {
            limit: params.limit,
            cursor: params.cursor,
        };
        let query = page_params
            .apply(Query::filtered(filters).ordered_by(QueryOrder::desc("created_at")))?;

        let page = resources.store.query(collections::CHALLENGES, query).await?;
        let response = PageResponse::<Challenge>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/challenges/:id/join - a member joins a challenge
    ///
    /// The participation id derives from the challenge and the caller, so
    /// joining twice conflicts.
    async fn handle_join_challenge(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::roles(&[Role::User]))
            .await?;

        // Joining a nonexistent challenge is a 404, not a silent record.
        resources.store.read(collections::CHALLENGES, &id).await?;

        let participant_id = format!("{id}_{}", principal.subject_id);
        resources
            .store
            .create(
                collections::CHALLENGE_PARTICIPANTS,
                NewRecord::keyed(
                    participant_id,
                    principal.subject_id.clone(),
                    serde_json::json!({ "challenge_id": id, "points": 0 }),
                ),
            )
            .await?;

        Ok(StatusCode::CREATED.into_response())
    }
}
