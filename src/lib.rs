// ABOUTME: Gympulse library root declaring all server modules
// ABOUTME: Entity-access and authorization gateway for a gym community platform
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Gympulse Server
//!
//! API gateway for a gym community platform: members, trainers, and gym
//! admins share a social feed, direct chat, connections, and milestone
//! progression, all gated by provider-issued bearer credentials.
//!
//! Every request flows through the same pipeline: the token validator
//! verifies the credential, the role resolver maps the subject onto exactly
//! one profile collection, and the access gateway checks the endpoint's
//! static policy plus ownership of the target entity. Entities live behind a
//! document-store facade backed by `SQLite`.

#![warn(missing_docs)]

/// Token validation for provider-issued bearer credentials
pub mod auth;
/// Environment-driven server configuration
pub mod config;
/// Shared dependency container for route handlers
pub mod context;
/// Unified error handling with standard error codes
pub mod errors;
/// Per-request authorization gateway and access policies
pub mod gateway;
/// Structured logging setup
pub mod logging;
/// Media upload storage
pub mod media;
/// Typed domain models and request schemas
pub mod models;
/// Role resolution from profile collection membership
pub mod roles;
/// HTTP route handlers
pub mod routes;
/// Entity repository facade and `SQLite` backend
pub mod store;
