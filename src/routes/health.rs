// ABOUTME: Health check endpoint reporting store liveness
// ABOUTME: Unauthenticated; suitable for load balancer probes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health routes

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::context::ServerResources;
use crate::store::DocumentStore;

/// Health check response body
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

/// Health routes handler
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(resources)
    }

    /// Handle GET /health
    async fn handle_health(State(resources): State<Arc<ServerResources>>) -> Response {
        let database_ok = resources.store.ping().await.is_ok();
        let body = HealthResponse {
            status: if database_ok { "ok" } else { "degraded" },
            database: if database_ok { "up" } else { "down" },
            version: env!("CARGO_PKG_VERSION"),
        };
        let status = if database_ok {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(body)).into_response()
    }
}
