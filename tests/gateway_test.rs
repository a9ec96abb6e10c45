// ABOUTME: Integration tests for the access gateway and role resolver
// ABOUTME: Role policies, ownership, elevation scope, and resolution faults
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use axum::http::HeaderMap;
use common::{
    bearer, create_test_resources, mint_test_token, seed_gym_admin, seed_trainer, seed_user,
};
use gympulse::errors::ErrorCode;
use gympulse::gateway::AccessPolicy;
use gympulse::roles::Role;
use gympulse::store::{collections, DocumentStore, NewRecord};
use serde_json::json;

fn auth_headers(subject_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        bearer(subject_id).parse().unwrap(),
    );
    headers
}

#[tokio::test]
async fn missing_header_is_auth_required() {
    let resources = create_test_resources().await;

    let err = resources
        .gateway
        .authorize(&HeaderMap::new(), &AccessPolicy::ANY)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthRequired);
}

#[tokio::test]
async fn non_bearer_header_is_malformed() {
    let resources = create_test_resources().await;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Basic {}", mint_test_token("alice")).parse().unwrap(),
    );

    let err = resources
        .gateway
        .authorize(&headers, &AccessPolicy::ANY)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthMalformed);
}

#[tokio::test]
async fn valid_credential_without_profile_is_no_profile() {
    let resources = create_test_resources().await;

    let err = resources
        .gateway
        .authorize(&auth_headers("ghost"), &AccessPolicy::ANY)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoProfile);
    assert_eq!(err.http_status(), 401);
}

#[tokio::test]
async fn authenticate_only_skips_profile_resolution() {
    let resources = create_test_resources().await;

    let claim = resources
        .gateway
        .authenticate_only(&auth_headers("fresh-subject"))
        .unwrap();
    assert_eq!(claim.subject_id, "fresh-subject");
}

#[tokio::test]
async fn subject_in_two_collections_is_ambiguous_profile() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "twice", None).await;
    seed_trainer(&resources.store, "twice", None).await;

    let err = resources
        .gateway
        .authorize(&auth_headers("twice"), &AccessPolicy::ANY)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AmbiguousProfile);
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn role_outside_policy_is_forbidden() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", None).await;

    let err = resources
        .gateway
        .authorize(
            &auth_headers("member"),
            &AccessPolicy::roles(&[Role::GymAdmin]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(err.http_status(), 403);
}

#[tokio::test]
async fn owner_passes_ownership_check() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "alice", None).await;

    let post = resources
        .store
        .create(
            collections::POSTS,
            NewRecord::assigned("alice", json!({"content": "mine"})),
        )
        .await
        .unwrap();

    let (principal, target) = resources
        .gateway
        .authorize_target(
            &auth_headers("alice"),
            &AccessPolicy::OWNER,
            collections::POSTS,
            &post.id,
        )
        .await
        .unwrap();
    assert_eq!(principal.subject_id, "alice");
    assert_eq!(target.id, post.id);
}

#[tokio::test]
async fn non_owner_without_elevation_is_not_owner() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post = resources
        .store
        .create(
            collections::POSTS,
            NewRecord::assigned("alice", json!({"content": "mine"})),
        )
        .await
        .unwrap();

    let err = resources
        .gateway
        .authorize_target(
            &auth_headers("bob"),
            &AccessPolicy::OWNER,
            collections::POSTS,
            &post.id,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotOwner);
    assert_eq!(err.http_status(), 403);
}

#[tokio::test]
async fn gym_admin_holds_elevation_over_own_gym_members() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", Some("gym-1")).await;
    seed_gym_admin(&resources.store, "admin", Some("gym-1")).await;

    let post = resources
        .store
        .create(
            collections::POSTS,
            NewRecord::assigned("member", json!({"content": "members post"})),
        )
        .await
        .unwrap();

    resources
        .gateway
        .authorize_target(
            &auth_headers("admin"),
            &AccessPolicy::OWNER,
            collections::POSTS,
            &post.id,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn elevation_stops_at_the_gym_boundary() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", Some("gym-1")).await;
    seed_gym_admin(&resources.store, "admin", Some("gym-2")).await;

    let post = resources
        .store
        .create(
            collections::POSTS,
            NewRecord::assigned("member", json!({"content": "members post"})),
        )
        .await
        .unwrap();

    let err = resources
        .gateway
        .authorize_target(
            &auth_headers("admin"),
            &AccessPolicy::OWNER,
            collections::POSTS,
            &post.id,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotOwner);
}

#[tokio::test]
async fn trainers_never_hold_elevation() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", Some("gym-1")).await;
    seed_trainer(&resources.store, "coach", Some("gym-1")).await;

    let post = resources
        .store
        .create(
            collections::POSTS,
            NewRecord::assigned("member", json!({"content": "members post"})),
        )
        .await
        .unwrap();

    let err = resources
        .gateway
        .authorize_target(
            &auth_headers("coach"),
            &AccessPolicy::OWNER,
            collections::POSTS,
            &post.id,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotOwner);
}

#[tokio::test]
async fn authorize_refreshes_presence() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", None).await;

    resources
        .gateway
        .authorize(&auth_headers("member"), &AccessPolicy::ANY)
        .await
        .unwrap();

    let profile = resources
        .store
        .read(collections::USERS, "member")
        .await
        .unwrap();
    assert_eq!(profile.payload["is_online"], true);
    assert!(profile.payload.get("last_active").is_some());
}

#[tokio::test]
async fn principal_profile_reflects_the_presence_refresh() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", None).await;

    let principal = resources
        .gateway
        .authorize(&auth_headers("member"), &AccessPolicy::ANY)
        .await
        .unwrap();

    // The presence refresh bumps the stored version; the principal must
    // carry that version, or any follow-up patch guarded on it conflicts.
    let stored = resources
        .store
        .read(collections::USERS, "member")
        .await
        .unwrap();
    assert_eq!(principal.profile.version, stored.version);
    assert_eq!(principal.profile.payload["is_online"], true);

    let updated = resources
        .store
        .update(
            collections::USERS,
            "member",
            gympulse::store::Patch::single("level", json!(2))
                .expecting_version(principal.profile.version),
        )
        .await
        .unwrap();
    assert_eq!(updated.payload["level"], 2);
}

#[tokio::test]
async fn revocation_takes_effect_on_the_next_request() {
    let resources = create_test_resources().await;
    seed_user(&resources.store, "member", None).await;

    let headers = auth_headers("member");
    resources
        .gateway
        .authorize(&headers, &AccessPolicy::ANY)
        .await
        .unwrap();

    resources.validator.revoke_subject("member");

    let err = resources
        .gateway
        .authorize(&headers, &AccessPolicy::ANY)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthRevoked);
}
