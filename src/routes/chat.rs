// ABOUTME: Route handlers for direct conversations and messages
// ABOUTME: Participant-only access with last-message previews and read flags
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Chat routes
//!
//! Conversations are strictly two-party. Opening a conversation with someone
//! you already chat with returns the existing conversation instead of
//! creating a duplicate. Posting a message refreshes the conversation's
//! last-message preview and notifies the other participant.

use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;

use super::{notify, EntityResponse, PageParams, PageResponse};
use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;
use crate::models::{
    to_payload, Conversation, ConversationCreate, Message, MessageCreate, NotificationKind,
};
use crate::store::{
    collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder, Record,
};

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/conversations", post(Self::handle_open))
            .route("/api/conversations", get(Self::handle_list))
            .route(
                "/api/conversations/:id/messages",
                get(Self::handle_list_messages),
            )
            .route(
                "/api/conversations/:id/messages",
                post(Self::handle_send_message),
            )
            .route("/api/messages/:id/read", post(Self::handle_mark_read))
            .with_state(resources)
    }

    /// Fetch a conversation the caller participates in
    async fn read_own_conversation(
        resources: &ServerResources,
        subject_id: &str,
        id: &str,
    ) -> Result<(Record, Conversation), AppError> {
        let record = resources
            .store
            .read(collections::CONVERSATIONS, id)
            .await?;
        let conversation: Conversation = record.parse()?;
        if !conversation.involves(subject_id) {
            // Same shape as a missing conversation; membership is not leaked.
            return Err(AppError::not_found("conversation").with_resource_id(id.to_owned()));
        }
        Ok((record, conversation))
    }

    /// Handle POST /api/conversations - open (or return) a conversation
    async fn handle_open(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<ConversationCreate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        body.validate()?;

        if body.participant_id == principal.subject_id {
            return Err(AppError::invalid_input(
                "Cannot open a conversation with yourself",
            ));
        }

        // Return the existing conversation when one already links the pair.
        let query = Query::filtered(vec![Filter::array_contains(
            "participant_ids",
            Value::String(principal.subject_id.clone()),
        )])
        .with_limit(Query::MAX_LIMIT);
        let page = resources
            .store
            .query(collections::CONVERSATIONS, query)
            .await?;
        for record in &page.records {
            let conversation: Conversation = record.parse()?;
            if conversation.involves(&body.participant_id) {
                let response = EntityResponse::<Conversation>::from_record(record)?;
                return Ok((StatusCode::OK, Json(response)).into_response());
            }
        }

        let conversation =
            Conversation::new(principal.subject_id.clone(), body.participant_id.clone());
        let record = resources
            .store
            .create(
                collections::CONVERSATIONS,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&conversation)?),
            )
            .await?;

        let response = EntityResponse::<Conversation>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle GET /api/conversations - list the caller's conversations
    ///
    /// Ordered by last update so active conversations surface first.
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let query = params.apply(
            Query::filtered(vec![Filter::array_contains(
                "participant_ids",
                Value::String(principal.subject_id.clone()),
            )])
            .ordered_by(QueryOrder::desc("updated_at")),
        )?;

        let page = resources
            .store
            .query(collections::CONVERSATIONS, query)
            .await?;
        let response =
            PageResponse::<Conversation>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/conversations/:id/messages
    async fn handle_list_messages(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        QueryParams(params): QueryParams<PageParams>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        Self::read_own_conversation(&resources, &principal.subject_id, &id).await?;

        let query = params.apply(
            Query::filtered(vec![Filter::eq("conversation_id", Value::String(id))])
                .ordered_by(QueryOrder::desc("created_at")),
        )?;
        let page = resources.store.query(collections::MESSAGES, query).await?;
        let response = PageResponse::<Message>::new(&page.records, page.next_cursor.as_ref())?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/conversations/:id/messages
    async fn handle_send_message(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<MessageCreate>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;
        let (_, conversation) =
            Self::read_own_conversation(&resources, &principal.subject_id, &id).await?;
        body.validate()?;

        let message = Message {
            conversation_id: id.clone(),
            sender_id: principal.subject_id.clone(),
            content: body.content,
            read: false,
        };
        let record = resources
            .store
            .create(
                collections::MESSAGES,
                NewRecord::assigned(principal.subject_id.clone(), to_payload(&message)?),
            )
            .await?;

        let mut preview = serde_json::Map::new();
        preview.insert(
            "last_message".to_owned(),
            Value::String(message.content.clone()),
        );
        preview.insert(
            "last_message_at".to_owned(),
            Value::String(Utc::now().to_rfc3339()),
        );
        resources
            .store
            .update(collections::CONVERSATIONS, &id, Patch::fields(preview))
            .await?;

        if let Some(other) = conversation.other_participant(&principal.subject_id) {
            notify(
                &resources,
                other,
                NotificationKind::NewMessage,
                Some(record.id.clone()),
                "You have a new message".to_owned(),
            )
            .await;
        }

        let response = EntityResponse::<Message>::from_record(&record)?;
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle POST /api/messages/:id/read - recipient marks a message read
    async fn handle_mark_read(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let principal = resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let record = resources.store.read(collections::MESSAGES, &id).await?;
        let message: Message = record.parse()?;

        // Participant check via the parent conversation; the sender cannot
        // mark its own message read.
        let (_, conversation) = Self::read_own_conversation(
            &resources,
            &principal.subject_id,
            &message.conversation_id,
        )
        .await?;
        if message.sender_id == principal.subject_id {
            return Err(AppError::invalid_input(
                "Cannot mark your own message as read",
            ));
        }
        debug_assert!(conversation.involves(&principal.subject_id));

        let updated = resources
            .store
            .update(
                collections::MESSAGES,
                &id,
                Patch::single("read", Value::Bool(true)),
            )
            .await?;

        let response = EntityResponse::<Message>::from_record(&updated)?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
