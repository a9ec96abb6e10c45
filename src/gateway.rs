// ABOUTME: Access gateway composing token validation and role resolution per request
// ABOUTME: Enforces static per-endpoint role policies and ownership with elevation scope
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Access Gateway
//!
//! Composes the token validator and role resolver into a per-request
//! authorization decision against a statically declared [`AccessPolicy`].
//! The composition is re-evaluated on every request: role and ownership can
//! change between requests, so no authorization decision is ever cached.
//!
//! Ownership checks pass when the caller owns the target entity, or when the
//! caller's role carries elevation scope over the entity's owner - a gym
//! admin acts on entities owned by the trainers and members of its own gym.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Utc;

use crate::auth::{IdentityClaim, TokenValidator};
use crate::errors::{AppError, AppResult};
use crate::roles::{Principal, Role, RoleResolver};
use crate::store::{DocumentStore, Patch, Record, Store};

/// Static per-endpoint authorization requirements
///
/// Compiled into the route table at startup; never persisted.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    /// Roles allowed to hit the endpoint
    pub required_roles: &'static [Role],
    /// Whether the caller must own the target entity (or hold elevation)
    pub ownership_required: bool,
}

impl AccessPolicy {
    /// Any authenticated principal
    pub const ANY: Self = Self {
        required_roles: Role::ALL,
        ownership_required: false,
    };

    /// Any authenticated principal, acting on an entity it owns
    pub const OWNER: Self = Self {
        required_roles: Role::ALL,
        ownership_required: true,
    };

    /// Restrict to the given roles
    #[must_use]
    pub const fn roles(required_roles: &'static [Role]) -> Self {
        Self {
            required_roles,
            ownership_required: false,
        }
    }

    /// Additionally require ownership of the target entity
    #[must_use]
    pub const fn owning(mut self) -> Self {
        self.ownership_required = true;
        self
    }
}

/// Extract the bearer credential from request headers
///
/// # Errors
///
/// `AuthRequired` when the header is absent, `AuthMalformed` when it is not a
/// bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(AppError::auth_required)?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::auth_malformed("Authorization header must be 'Bearer <token>'"))
}

/// Per-request authorization gateway
#[derive(Clone)]
pub struct AccessGateway {
    validator: Arc<TokenValidator>,
    resolver: RoleResolver,
    store: Arc<Store>,
}

impl AccessGateway {
    /// Create a gateway over the given validator and store
    #[must_use]
    pub fn new(validator: Arc<TokenValidator>, store: Arc<Store>) -> Self {
        Self {
            validator,
            resolver: RoleResolver::new(Arc::clone(&store)),
            store,
        }
    }

    /// Validate the credential without resolving a role
    ///
    /// Registration endpoints use this: a fresh subject has a valid credential
    /// but no profile yet, so full authorization would reject it with
    /// `no_profile`.
    ///
    /// # Errors
    ///
    /// Propagates token validation rejections.
    pub fn authenticate_only(&self, headers: &HeaderMap) -> AppResult<IdentityClaim> {
        let token = bearer_token(headers)?;
        self.validator.validate(token)
    }

    /// Authorize a request against a policy
    ///
    /// # Errors
    ///
    /// Token rejections and role-resolution failures propagate;
    /// `PermissionDenied` when the resolved role is not in the policy.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        policy: &AccessPolicy,
    ) -> AppResult<Principal> {
        let claim = self.authenticate_only(headers)?;
        let mut principal = self.resolver.resolve(&claim).await?;

        if !policy.required_roles.contains(&principal.role) {
            tracing::debug!(
                subject_id = %principal.subject_id,
                role = %principal.role,
                "role not permitted for endpoint"
            );
            return Err(AppError::forbidden(format!(
                "Role '{}' is not permitted for this endpoint",
                principal.role
            ))
            .with_subject_id(principal.subject_id));
        }

        self.touch_presence(&mut principal).await;
        Ok(principal)
    }

    /// Authorize a request that targets a specific entity
    ///
    /// Fetches the target so the ownership decision and the handler share one
    /// read. When `policy.ownership_required` is set, the caller must own the
    /// record or hold elevation scope over its owner.
    ///
    /// # Errors
    ///
    /// As [`Self::authorize`], plus `ResourceNotFound` for a missing target
    /// and `NotOwner` on an ownership mismatch without elevation.
    pub async fn authorize_target(
        &self,
        headers: &HeaderMap,
        policy: &AccessPolicy,
        collection: &str,
        id: &str,
    ) -> AppResult<(Principal, Record)> {
        let principal = self.authorize(headers, policy).await?;
        let target = self.store.read(collection, id).await?;

        if policy.ownership_required {
            self.check_ownership(&principal, &target).await?;
        }

        Ok((principal, target))
    }

    /// Ownership check against an already-fetched record
    ///
    /// # Errors
    ///
    /// `NotOwner` when the principal neither owns the record nor holds
    /// elevation scope over its owner.
    pub async fn check_ownership(&self, principal: &Principal, target: &Record) -> AppResult<()> {
        if target.owner_subject_id == principal.subject_id {
            return Ok(());
        }
        if self.has_elevation(principal, &target.owner_subject_id).await? {
            return Ok(());
        }
        Err(AppError::not_owner("Caller does not own the target entity")
            .with_subject_id(principal.subject_id.clone())
            .with_resource_id(target.id.clone()))
    }

    /// Whether the principal's role grants it scope over the given owner
    ///
    /// Only gym admins carry elevation: over trainers and members registered
    /// to the admin's own gym.
    async fn has_elevation(&self, principal: &Principal, owner_subject_id: &str) -> AppResult<bool> {
        if principal.role != Role::GymAdmin {
            return Ok(false);
        }
        let Some(admin_gym) = principal.gym_id() else {
            return Ok(false);
        };

        for collection in [Role::User, Role::Trainer].map(|r| r.profile_collection()) {
            if let Some(owner_profile) = self.store.read_opt(collection, owner_subject_id).await? {
                return Ok(owner_profile.payload_str("gym_id") == Some(admin_gym));
            }
        }
        Ok(false)
    }

    /// Best-effort presence refresh on the caller's profile
    ///
    /// Mirrors the platform behavior of marking an account online whenever a
    /// verified credential touches the API. Failures are logged, never
    /// surfaced: presence is advisory. The refreshed record replaces
    /// `principal.profile` so handlers that patch the profile with an
    /// expected version see the version this write produced, not the one
    /// from resolution.
    async fn touch_presence(&self, principal: &mut Principal) {
        let mut fields = serde_json::Map::new();
        fields.insert("is_online".to_owned(), serde_json::Value::Bool(true));
        fields.insert(
            "last_active".to_owned(),
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );

        match self
            .store
            .update(
                principal.role.profile_collection(),
                &principal.subject_id,
                Patch::fields(fields),
            )
            .await
        {
            Ok(profile) => principal.profile = profile,
            Err(e) => tracing::debug!(
                subject_id = %principal.subject_id,
                "presence refresh failed: {e}"
            ),
        }
    }
}
