// ABOUTME: Unified error handling with standard error codes and HTTP responses
// ABOUTME: Maps authorization and repository failures onto consistent status families
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Unified Error Handling System
//!
//! Central error type for the Gympulse gateway. Every rejection that crosses a
//! route boundary is an [`AppError`] carrying an [`ErrorCode`], and the code
//! alone decides the HTTP status family: authorization failures land in
//! 401/403, repository failures in 404/409, validation in 400.

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization (1000-1999)
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    #[serde(rename = "AUTH_MALFORMED")]
    AuthMalformed = 1001,
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired = 1002,
    #[serde(rename = "AUTH_SIGNATURE_INVALID")]
    AuthSignatureInvalid = 1003,
    #[serde(rename = "AUTH_REVOKED")]
    AuthRevoked = 1004,
    #[serde(rename = "NO_PROFILE")]
    NoProfile = 1005,
    #[serde(rename = "AMBIGUOUS_PROFILE")]
    AmbiguousProfile = 1006,
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied = 1007,
    #[serde(rename = "NOT_OWNER")]
    NotOwner = 1008,

    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    #[serde(rename = "UNSUPPORTED_MEDIA_TYPE")]
    UnsupportedMediaType = 3002,

    // Resource Management (4000-4999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists = 4001,
    #[serde(rename = "VERSION_CONFLICT")]
    VersionConflict = 4002,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9002,
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput | Self::MissingRequiredField => 400,

            // 401 Unauthorized
            Self::AuthRequired
            | Self::AuthMalformed
            | Self::AuthExpired
            | Self::AuthSignatureInvalid
            | Self::AuthRevoked
            | Self::NoProfile => 401,

            // 403 Forbidden
            Self::PermissionDenied | Self::NotOwner => 403,

            // 404 Not Found
            Self::ResourceNotFound => 404,

            // 409 Conflict
            Self::ResourceAlreadyExists | Self::VersionConflict => 409,

            // 415 Unsupported Media Type
            Self::UnsupportedMediaType => 415,

            // 500 Internal Server Error
            // AmbiguousProfile indicates upstream data corruption, not a
            // normal authorization outcome, so it is surfaced as a server
            // fault rather than a 4xx.
            Self::AmbiguousProfile
            | Self::InternalError
            | Self::DatabaseError
            | Self::StorageError
            | Self::ConfigError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthMalformed => "The authentication token is malformed or corrupted",
            Self::AuthExpired => "The authentication token has expired",
            Self::AuthSignatureInvalid => "The authentication token signature is invalid",
            Self::AuthRevoked => "The authentication token has been revoked",
            Self::NoProfile => "No profile is registered for this account",
            Self::AmbiguousProfile => "Multiple profiles are registered for this account",
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::NotOwner => "Only the owner of this resource can perform this action",
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::UnsupportedMediaType => "The uploaded media type is not allowed",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::VersionConflict => "The resource was modified concurrently",
            Self::InternalError => "An internal server error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::StorageError => "Storage operation failed",
            Self::ConfigError => "Configuration error encountered",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorContext {
    /// Subject id of the caller, if resolved
    pub subject_id: Option<String>,
    /// Resource id if applicable
    pub resource_id: Option<String>,
    /// Additional key-value context
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add the caller's subject id to the error context
    #[must_use]
    pub fn with_subject_id(mut self, subject_id: impl Into<String>) -> Self {
        self.context.subject_id = Some(subject_id.into());
        self
    }

    /// Add a resource id to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of the error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Resource the error relates to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Additional structured details
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                resource_id: error.context.resource_id,
                details: error.context.details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = axum::http::StatusCode::from_u16(self.http_status())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "request failed: {}", self.message);
        }
        let body = ErrorResponse::from(self);
        (status, axum::Json(body)).into_response()
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Malformed credential
    pub fn auth_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthMalformed, message)
    }

    /// Authentication expired
    #[must_use]
    pub fn auth_expired() -> Self {
        Self::new(ErrorCode::AuthExpired, "Authentication token has expired")
    }

    /// Role not permitted for this endpoint
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Caller does not own the target entity and holds no elevation scope
    pub fn not_owner(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotOwner, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Natural key already taken
    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceAlreadyExists,
            format!("{} already exists", resource.into()),
        )
    }

    /// Optimistic concurrency check failed
    pub fn version_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::VersionConflict, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}

/// Conversion from `sqlx` errors, preserving the root cause
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::not_found("record"),
            _ => Self::database(error.to_string()).with_source(error),
        }
    }
}

/// Conversion from `anyhow::Error` to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.source() {
            Some(source) => Self::new(ErrorCode::InternalError, error.to_string()).with_details(
                serde_json::json!({
                    "source": source.to_string()
                }),
            ),
            None => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}
