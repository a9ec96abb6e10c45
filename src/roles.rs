// ABOUTME: Role resolution from identity claims to registered profile collections
// ABOUTME: Maps a verified subject onto exactly one of user, trainer, or gym admin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Role Resolution
//!
//! A subject's role is defined by which profile collection holds a record for
//! it, never by token claims. Exactly one of `users`, `trainers`, or
//! `gym_admins` may contain the subject; zero is `no_profile`, more than one
//! is `ambiguous_profile` and indicates upstream data corruption. The
//! ambiguous case is surfaced, never silently resolved by picking one.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::IdentityClaim;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::store::{collections, DocumentStore, Record, Store};

/// Closed set of roles a resolved principal can hold
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular gym member
    User,
    /// Trainer attached to a gym
    Trainer,
    /// Administrator of a gym
    GymAdmin,
}

impl Role {
    /// Every role; used by policies open to any authenticated principal
    pub const ALL: &'static [Self] = &[Self::User, Self::Trainer, Self::GymAdmin];

    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Trainer => "trainer",
            Self::GymAdmin => "gym_admin",
        }
    }

    /// Profile collection this role is registered in
    #[must_use]
    pub const fn profile_collection(&self) -> &'static str {
        match self {
            Self::User => collections::USERS,
            Self::Trainer => collections::TRAINERS,
            Self::GymAdmin => collections::GYM_ADMINS,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "trainer" => Ok(Self::Trainer),
            "gym_admin" => Ok(Self::GymAdmin),
            _ => Err(AppError::invalid_input(format!("Invalid role: {s}"))),
        }
    }
}

/// The resolved (identity + role) pair used for authorization decisions
/// within one request
///
/// Constructed per request and never cached across requests, since role and
/// ownership can change between requests.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Provider-issued subject id
    pub subject_id: String,
    /// Role derived from profile collection membership
    pub role: Role,
    /// The profile record backing the role
    pub profile: Record,
}

impl Principal {
    /// Gym the principal belongs to, when its profile records one
    #[must_use]
    pub fn gym_id(&self) -> Option<&str> {
        self.profile.payload_str("gym_id")
    }
}

/// Resolves a validated identity claim to a role via profile lookup
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<Store>,
}

impl RoleResolver {
    /// Create a resolver over the given store
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Resolve the claim's subject to its registered role
    ///
    /// # Errors
    ///
    /// - `NoProfile` when no profile collection holds the subject
    /// - `AmbiguousProfile` when more than one does (data-integrity fault)
    /// - `DatabaseError` when a profile lookup fails
    pub async fn resolve(&self, claim: &IdentityClaim) -> AppResult<Principal> {
        let mut matches: Vec<(Role, Record)> = Vec::with_capacity(1);

        for role in Role::ALL {
            if let Some(record) = self
                .store
                .read_opt(role.profile_collection(), &claim.subject_id)
                .await?
            {
                matches.push((*role, record));
            }
        }

        match matches.len() {
            0 => Err(AppError::new(
                ErrorCode::NoProfile,
                "No profile is registered for this account",
            )
            .with_subject_id(claim.subject_id.clone())),
            1 => {
                // Vec::pop on a length-1 vec cannot fail; destructure instead
                // of unwrapping to keep the non-test code panic-free.
                let Some((role, profile)) = matches.pop() else {
                    return Err(AppError::internal("profile match vanished"));
                };
                Ok(Principal {
                    subject_id: claim.subject_id.clone(),
                    role,
                    profile,
                })
            }
            n => {
                let roles: Vec<&str> = matches.iter().map(|(role, _)| role.as_str()).collect();
                tracing::error!(
                    subject_id = %claim.subject_id,
                    collections = ?roles,
                    "subject registered in {n} profile collections; data integrity fault"
                );
                Err(AppError::new(
                    ErrorCode::AmbiguousProfile,
                    format!("Subject is registered in {n} profile collections"),
                )
                .with_subject_id(claim.subject_id.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), *role);
        }
    }

    #[test]
    fn unknown_role_is_invalid() {
        assert!(Role::from_str("superuser").is_err());
    }
}
