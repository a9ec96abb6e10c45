// ABOUTME: Route handlers for the social feed: posts, comments, and likes
// ABOUTME: Privacy-tiered visibility with owner-gated mutation and cascades
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Social feed routes
//!
//! Visibility is decided per post against the viewer: `public` posts are open
//! to every principal, `friends` posts require an accepted connection with
//! the author, `gym` posts require membership in the post's gym, and
//! `private` posts are author-only. Deleting a post cascades over its
//! comments and likes; the store has no foreign keys, so the cascade is
//! explicit here.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::Value;

use super::{EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::{
    to_payload, Comment, CommentCreate, ConnectionStatus, Post, PostCreate, PostPrivacy,
    PostUpdate,
};
use crate::roles::Principal;
use crate::store::{
    collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder, Record,
};

/// Social feed routes handler
pub struct SocialRoutes;

impl SocialRoutes {
    /// Create all social feed routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/feed", get(Self::handle_feed))
            .route("/api/posts", post(Self::handle_create_post))
            .route("/api/posts/:id", get(Self::handle_get_post))
            .route("/api/posts/:id", put(Self::handle_update_post))
            .route("/api/posts/:id", delete(Self::handle_delete_post))
            .route("/api/posts/:id/comments", get(Self::handle_list_comments))
            .route("/api/posts/:id/comments", post(Self::handle_create_comment))
            .route("/api/comments/:id", delete(Self::handle_delete_comment))
            .route("/api/posts/:id/like", post(Self::handle_like))
            .route("/api/posts/:id/like", delete(Self::handle_unlike))
            .with_state(resources)
    }

    /// Subject ids the principal holds an accepted connection with
    async fn connected_ids(
        resources: &ServerResources,
        subject_id: &str,
    ) -> Result<HashSet<String>, AppError> {
        let query = Query::filtered(vec![
            Filter::array_contains("user_ids", Value::String(subject_id.to_owned())),
            Filter::eq(
                "status",
                Value::String(ConnectionStatus::Accepted.as_str().to_owned()),
            ),
        ])
        .with_limit(Query::MAX_LIMIT);

        let page = resources.store.query(collections::CONNECTIONS, query).await?;
        let mut ids = HashSet::new();
        for record in &page.records {
            let connection: crate::models::Connection = record.parse()?;
            if let Some(other) = connection.other_participant(subject_id) {
                ids.insert(other.to_owned());
            }
        }
        Ok(ids)
    }

    /// Whether the viewer may see the post
    fn post_visible(
        viewer: &Principal,
        record: &Record,
        post: &Post,
        connected: &HashSet<String>,
    ) -> bool {
        if record.owner_subject_id == viewer.subject_id {
            return true;
        }
        match post.privacy {
            PostPrivacy::Public => true,
            PostPrivacy::Friends => connected.contains(&record.owner_subject_id),
            PostPrivacy::Gym => {
                post.gym_id.as_deref().is_some() && post.gym_id.as_deref() == viewer.gym_id()
            }
            PostPrivacy::Private => false,
        }
    }

    /// Fetch a post and enforce visibility for the viewer
    async fn read_visible_post(
        resources: &ServerResources,
        viewer: &Principal,
        post_id: &str,
    ) -> Result<(Record, Post), AppError> {
        let record = resources.store.read(collections::POSTS, post_id).await?;
        let post: Post = record.parse()?;

        let connected = if post.privacy == PostPrivacy::Friends
            && record.owner_subject_id != viewer.subject_id
        {
            Self::connected_ids(resources, &viewer.subject_id).await?
        } else {
            HashSet::new()
        };

        if !Self::post_visible(viewer, &record, &post, &connected) {
            // Hidden posts read as absent; revealing a 403 would leak that
            // the post exists.
            return Err(AppError::not_found("post").with_resource_id(post_id.to_owned()));
        }
        Ok((record, post))
    }

    /// Adjust a denormalized counter on a post, clamping at zero
    async fn bump_counter(
        resources: &ServerResources,
        post_id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), AppError> {
        let record = resources.store.read(collections::POSTS, post_id).await?;
        let current = record
            .payload
            .get(field)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let next = (current + delta).max(0);
        resources
            .store
            .update(
                collections::POSTS,
                post_id,
                Patch::single(field, Value::from(next)),
            )
            .await?;
        Ok(())
    }

    /// Handle GET /api/feed - assemble the viewer's feed
    async fn handle_feed(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let connected = Self::connected_ids(&resources, &principal.subject_id).await?;

        let query = params
            .apply(Query::filtered(vec![]).ordered_by(QueryOrder::desc("created_at")))?;
        let page = resources.store.query(collections::POSTS, query).await?;

        // Visibility filtering happens after the page fetch, so a page may
        // come back short; the cursor still advances through the full set.
        let mut visible = Vec::with_capacity(page.records.len());
        for record in &page.records {
            let post: Post = record.parse()?;
            if Self::post_visible(&principal, record, &post, &connected) {
                visible.push(record.clone());
            }
        }

        let response = PageResponse::<Post>::new(&visible, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/posts
    async fn handle_create_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<PostCreate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        body.validate()?;

        let post = body.into_post();
        let record = resources
            .store
            .create(
                collections::POSTS,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&post)?),
            )
            .await?;

        let response = EntityResponse::<Post>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/posts/:id
    async fn handle_get_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let (record, _) = Self::read_visible_post(&resources, &principal, &id).await?;
        let response = EntityResponse::<Post>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle PUT /api/posts/:id - author-only edit
    async fn handle_update_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<PostUpdate>,
    ) -> Result<Response, AppError> {
        let (_, target) = resources
            .gateway
            .authorize_target(&headers, &AccessPolicy::OWNER, collections::POSTS, &id)
            .await?;
        body.validate()?;

        let record = resources
            .store
            .update(
                collections::POSTS,
                &id,
                Patch::fields(body.into_patch_fields()).expecting_version(target.version),
            )
            .await?;

        let response = EntityResponse::<Post>::from_record(&record)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle DELETE /api/posts/:id - author-only, cascades comments and likes
    async fn handle_delete_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize_target(&headers, &AccessPolicy::OWNER, collections::POSTS, &id)
            .await?;

        resources.store.delete(collections::POSTS, &id).await?;

        for collection in [collections::COMMENTS, collections::LIKES] {
            loop {
                let page = resources
                    .store
                    .query(
                        collection,
                        Query::filtered(vec![Filter::eq(
                            "post_id",
                            Value::String(id.clone()),
                        )])
                        .with_limit(Query::MAX_LIMIT),
                    )
                    .await?;
                if page.records.is_empty() {
                    break;
                }
                for record in &page.records {
                    resources.store.delete(collection, &record.id).await?;
                }
                if page.next_cursor.is_none() {
                    break;
                }
            }
        }

        tracing::info!(post_id = %id, "post deleted with cascade");
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle GET /api/posts/:id/comments
    async fn handle_list_comments(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        Self::read_visible_post(&resources, &principal, &id).await?;

        let query = params.apply(
            Query::filtered(vec![Filter::eq("post_id", Value::String(id))])
                .ordered_by(QueryOrder::asc("created_at")),
        )?;
        let page = resources.store.query(collections::COMMENTS, query).await?;
        let response = PageResponse::<Comment>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/posts/:id/comments
    async fn handle_create_comment(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<CommentCreate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        Self::read_visible_post(&resources, &principal, &id).await?;
        body.validate()?;

        let comment = Comment {
            post_id: id.clone(),
            content: body.content,
        };
        let record = resources
            .store
            .create(
                collections::COMMENTS,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&comment)?),
            )
            .await?;

        Self::bump_counter(&resources, &id, "comment_count", 1).await?;

        let response = EntityResponse::<Comment>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle DELETE /api/comments/:id - author-only
    async fn handle_delete_comment(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let (_, target) = resources
            .gateway
            .authorize_target(&headers, &AccessPolicy::OWNER, collections::COMMENTS, &id)
            .await?;

        let comment: Comment = target.parse()?;
        resources.store.delete(collections::COMMENTS, &id).await?;
        Self::bump_counter(&resources, &comment.post_id, "comment_count", -1).await?;

        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle POST /api/posts/:id/like
    ///
    /// The like id is derived from the post and the caller, so liking twice
    /// conflicts instead of double-counting.
    async fn handle_like(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        Self::read_visible_post(&resources, &principal, &id).await?;

        let like_id = format!("post_{id}_{}", principal.subject_id);
        resources
            .store
            .create(
                collections::LIKES,
                NewRecord::keyed(
                    like_id,
                    principal.subject_id.clone(),
                    serde_json::json!({ "post_id": id }),
                ),
            )
            .await?;

        Self::bump_counter(&resources, &id, "like_count", 1).await?;
        Ok(StatusCode::CREATED.into_response())
    }

    /// Handle DELETE /api/posts/:id/like
    async fn handle_unlike(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let like_id = format!("post_{id}_{}", principal.subject_id);
        resources.store.delete(collections::LIKES, &like_id).await?;

        Self::bump_counter(&resources, &id, "like_count", -1).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
