// ABOUTME: Token validation against the external identity provider's signing secret
// ABOUTME: Decodes bearer credentials into identity claims with a bounded positive cache
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Token Validation
//!
//! The identity provider issues HS256 JWTs signed with a shared secret. This
//! module verifies those credentials and produces an [`IdentityClaim`] or a
//! typed rejection (`expired`, `malformed`, `signature_invalid`, `revoked`).
//!
//! Positive results may be cached up to the claim's `expires_at` boundary,
//! keyed by the raw credential. Negative results are never cached: expiry
//! windows make cross-request staleness unsafe.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Wire-format JWT claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct WireClaims {
    /// Subject id (provider-issued, unique)
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Provider-specific custom claims
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Decoded, verified identity information derived from a bearer credential
///
/// Immutable once issued and never persisted by this layer.
#[derive(Debug, Clone)]
pub struct IdentityClaim {
    /// Provider-issued subject id
    pub subject_id: String,
    /// When the credential was issued
    pub issued_at: DateTime<Utc>,
    /// When the credential stops being valid
    pub expires_at: DateTime<Utc>,
    /// Remaining custom claims, untrusted for role decisions
    pub raw_claims: serde_json::Map<String, serde_json::Value>,
}

impl IdentityClaim {
    /// Whether the claim has passed its expiry boundary
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Validates bearer credentials against the identity provider's secret
///
/// Holds the only cross-request state in the process: a bounded positive-claim
/// cache and the revocation set. Both are concurrency-safe maps so request
/// handling never blocks beyond the lookup itself.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    cache: DashMap<String, IdentityClaim>,
    cache_capacity: usize,
    /// subject id -> instant of revocation; credentials issued earlier are dead
    revoked: DashMap<String, DateTime<Utc>>,
}

impl TokenValidator {
    /// Default bound for the positive-claim cache
    pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

    /// Create a validator for the given provider secret
    #[must_use]
    pub fn new(provider_secret: &[u8], cache_capacity: usize) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked explicitly below so rejections carry the
        // `expired` reason instead of a generic decode failure.
        validation.validate_exp = false;
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(provider_secret),
            validation,
            cache: DashMap::new(),
            cache_capacity,
            revoked: DashMap::new(),
        }
    }

    /// Validate a raw bearer credential and return its decoded claim
    ///
    /// # Errors
    ///
    /// Returns an [`AppError`] with reason:
    /// - `AuthExpired` when the claim's expiry boundary has passed
    /// - `AuthMalformed` when the credential is not a decodable JWT
    /// - `AuthSignatureInvalid` when signature verification fails
    /// - `AuthRevoked` when the subject revoked credentials after issuance
    pub fn validate(&self, credential: &str) -> AppResult<IdentityClaim> {
        let now = Utc::now();

        if let Some(cached) = self.cache.get(credential) {
            let claim = cached.clone();
            drop(cached);
            if claim.is_expired_at(now) {
                // Mandatory eviction at the expiry boundary.
                self.cache.remove(credential);
                return Err(AppError::auth_expired().with_subject_id(claim.subject_id));
            }
            self.check_revocation(&claim)?;
            return Ok(claim);
        }

        let claim = self.decode(credential)?;
        if claim.is_expired_at(now) {
            tracing::debug!(
                subject_id = %claim.subject_id,
                expired_at = %claim.expires_at.to_rfc3339(),
                "rejected expired credential"
            );
            return Err(AppError::auth_expired().with_subject_id(claim.subject_id));
        }
        self.check_revocation(&claim)?;

        self.cache_claim(credential, &claim);
        Ok(claim)
    }

    /// Revoke all credentials for a subject issued before this instant
    pub fn revoke_subject(&self, subject_id: &str) {
        self.revoked.insert(subject_id.to_owned(), Utc::now());
        // Cached entries for the subject must not outlive the revocation.
        self.cache.retain(|_, claim| claim.subject_id != subject_id);
    }

    /// Number of cached positive claims, for observability and tests
    #[must_use]
    pub fn cached_claims(&self) -> usize {
        self.cache.len()
    }

    fn check_revocation(&self, claim: &IdentityClaim) -> AppResult<()> {
        if let Some(revoked_at) = self.revoked.get(&claim.subject_id) {
            if claim.issued_at <= *revoked_at {
                self.cache
                    .retain(|_, cached| cached.subject_id != claim.subject_id);
                return Err(AppError::new(
                    crate::errors::ErrorCode::AuthRevoked,
                    "Credential was revoked by the identity provider",
                )
                .with_subject_id(claim.subject_id.clone()));
            }
        }
        Ok(())
    }

    fn decode(&self, credential: &str) -> AppResult<IdentityClaim> {
        let data = decode::<WireClaims>(credential, &self.decoding_key, &self.validation)
            .map_err(convert_jwt_error)?;

        let issued_at = DateTime::from_timestamp(data.claims.iat, 0)
            .ok_or_else(|| AppError::auth_malformed("Credential carries an invalid iat claim"))?;
        let expires_at = DateTime::from_timestamp(data.claims.exp, 0)
            .ok_or_else(|| AppError::auth_malformed("Credential carries an invalid exp claim"))?;

        if data.claims.sub.is_empty() {
            return Err(AppError::auth_malformed("Credential subject is empty"));
        }

        Ok(IdentityClaim {
            subject_id: data.claims.sub,
            issued_at,
            expires_at,
            raw_claims: data.claims.extra,
        })
    }

    fn cache_claim(&self, credential: &str, claim: &IdentityClaim) {
        if self.cache.len() >= self.cache_capacity {
            // Evict the entry closest to expiry to keep the cache bounded.
            let victim = self
                .cache
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            if let Some(key) = victim {
                self.cache.remove(&key);
            }
        }
        self.cache.insert(credential.to_owned(), claim.clone());
    }
}

/// Convert JWT library errors into the rejection taxonomy
fn convert_jwt_error(e: jsonwebtoken::errors::Error) -> AppError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::InvalidSignature => AppError::new(
            crate::errors::ErrorCode::AuthSignatureInvalid,
            "Token signature verification failed",
        ),
        ErrorKind::InvalidToken => AppError::auth_malformed("Token format is invalid"),
        ErrorKind::Base64(base64_err) => {
            AppError::auth_malformed(format!("Token contains invalid base64: {base64_err}"))
        }
        ErrorKind::Json(json_err) => {
            AppError::auth_malformed(format!("Token contains invalid JSON: {json_err}"))
        }
        ErrorKind::Utf8(utf8_err) => {
            AppError::auth_malformed(format!("Token contains invalid UTF-8: {utf8_err}"))
        }
        _ => AppError::new(
            crate::errors::ErrorCode::AuthSignatureInvalid,
            format!("Token validation failed: {e}"),
        ),
    }
}

/// Mint a credential the way the identity provider would
///
/// Used by the development seeder and by tests; the production provider signs
/// with the same shared secret.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn mint_token(
    provider_secret: &[u8],
    subject_id: &str,
    ttl: Duration,
    extra: serde_json::Map<String, serde_json::Value>,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = WireClaims {
        sub: subject_id.to_owned(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        extra,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(provider_secret),
    )
    .map_err(|e| AppError::internal(format!("failed to mint credential: {e}")))
}

/// Generate a random provider secret
///
/// # Errors
///
/// Returns an error if the system RNG fails - the gateway cannot operate
/// securely without a working RNG.
pub fn generate_provider_secret() -> AppResult<[u8; 64]> {
    use ring::rand::{SecureRandom, SystemRandom};

    let rng = SystemRandom::new();
    let mut secret = [0u8; 64];
    rng.fill(&mut secret).map_err(|e| {
        tracing::error!("failed to generate provider secret: {e}");
        AppError::internal("System RNG failure - cannot generate provider secret")
    })?;
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    const SECRET: &[u8] = b"unit-test-provider-secret";

    fn validator() -> TokenValidator {
        TokenValidator::new(SECRET, TokenValidator::DEFAULT_CACHE_CAPACITY)
    }

    #[test]
    fn valid_token_round_trips() {
        let token = mint_token(
            SECRET,
            "subject-1",
            Duration::hours(1),
            serde_json::Map::new(),
        )
        .unwrap();

        let claim = validator().validate(&token).unwrap();
        assert_eq!(claim.subject_id, "subject-1");
        assert!(claim.expires_at > Utc::now());
    }

    #[test]
    fn expired_token_is_rejected_with_expired() {
        let token = mint_token(
            SECRET,
            "subject-1",
            Duration::hours(-1),
            serde_json::Map::new(),
        )
        .unwrap();

        let err = validator().validate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthExpired);
    }

    #[test]
    fn tampered_token_is_rejected_with_signature_invalid() {
        let token = mint_token(
            b"some-other-secret",
            "subject-1",
            Duration::hours(1),
            serde_json::Map::new(),
        )
        .unwrap();

        let err = validator().validate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthSignatureInvalid);
    }

    #[test]
    fn garbage_token_is_rejected_with_malformed() {
        let err = validator().validate("not-a-jwt").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthMalformed);
    }

    #[test]
    fn cached_claim_is_rejected_once_expired() {
        let v = validator();
        let token = mint_token(
            SECRET,
            "subject-1",
            Duration::seconds(1),
            serde_json::Map::new(),
        )
        .unwrap();

        v.validate(&token).unwrap();
        assert_eq!(v.cached_claims(), 1);

        std::thread::sleep(std::time::Duration::from_millis(1100));

        let err = v.validate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthExpired);
        // The expired entry must not linger in the cache.
        assert_eq!(v.cached_claims(), 0);
    }

    #[test]
    fn revoked_subject_is_rejected_even_when_cached() {
        let v = validator();
        let token = mint_token(
            SECRET,
            "subject-1",
            Duration::hours(1),
            serde_json::Map::new(),
        )
        .unwrap();

        v.validate(&token).unwrap();
        assert_eq!(v.cached_claims(), 1);

        v.revoke_subject("subject-1");
        let err = v.validate(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthRevoked);
        assert_eq!(v.cached_claims(), 0);
    }

    #[test]
    fn cache_stays_bounded() {
        let v = TokenValidator::new(SECRET, 4);
        for i in 0..10 {
            let token = mint_token(
                SECRET,
                &format!("subject-{i}"),
                Duration::hours(1),
                serde_json::Map::new(),
            )
            .unwrap();
            v.validate(&token).unwrap();
        }
        assert!(v.cached_claims() <= 4);
    }
}
