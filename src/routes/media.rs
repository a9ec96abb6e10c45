// ABOUTME: Route handler for media uploads
// ABOUTME: Accepts raw bodies with a declared content type, returns the URL
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Media routes

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::context::ServerResources;
use crate::errors::AppError;
use crate::gateway::AccessPolicy;

/// Upload response body
#[derive(Debug, Serialize)]
struct UploadResponse {
    url: String,
}

/// Media routes handler
pub struct MediaRoutes;

impl MediaRoutes {
    /// Create the media routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/media", post(Self::handle_upload))
            .with_state(resources)
    }

    /// Handle POST /api/media - upload a media blob
    async fn handle_upload(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, AppError> {
        resources
            .gateway
            .authorize(&headers, &AccessPolicy::ANY)
            .await?;

        let content_type = headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::invalid_input("Content-Type header is required"))?;

        let url = resources.media.put(body, content_type).await?;
        Ok((StatusCode::CREATED, Json(UploadResponse { url })).into_response())
    }
}
