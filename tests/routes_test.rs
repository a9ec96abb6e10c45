// ABOUTME: End-to-end route tests exercising the full request pipeline
// ABOUTME: Registration, profiles, feed privacy, connections, chat, milestones
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{bearer, create_test_resources, seed_gym_admin, seed_trainer, seed_user};
use gympulse::context::ServerResources;
use gympulse::routes;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> (Router, Arc<ServerResources>) {
    let resources = create_test_resources().await;
    (routes::router(Arc::clone(&resources)), resources)
}

/// Send a JSON request, optionally authenticated, and decode the response
async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    subject: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(subject) = subject {
        builder = builder.header(header::AUTHORIZATION, bearer(subject));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn registration_body(name: &str) -> Value {
    json!({
        "display_name": name,
        "email": format!("{name}@example.com"),
        "gym_id": "gym-1",
    })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_open_and_reports_ok() {
    let (router, _) = app().await;
    let (status, body) = send(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}

// ---------------------------------------------------------------------------
// Registration and profiles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn member_registration_succeeds_once() {
    let (router, _) = app().await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/users",
        Some("alice"),
        Some(registration_body("Alice")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["display_name"], "Alice");
    assert_eq!(body["level"], 1);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/users",
        Some("alice"),
        Some(registration_body("Alice Again")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "RESOURCE_ALREADY_EXISTS");
}

#[tokio::test]
async fn second_profile_in_another_collection_is_rejected() {
    let (router, _) = app().await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/users",
        Some("alice"),
        Some(registration_body("Alice")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same subject must not also become a trainer.
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/trainers",
        Some("alice"),
        Some(registration_body("Coach Alice")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_requires_a_credential() {
    let (router, _) = app().await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/users",
        None,
        Some(registration_body("Nobody")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn invalid_registration_body_is_bad_request() {
    let (router, _) = app().await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/users",
        Some("alice"),
        Some(json!({"display_name": "Alice", "email": "not-an-address"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_endpoint_is_role_gated() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;

    let (status, body) = send(&router, Method::GET, "/api/users/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");

    // A member has no trainer profile to fetch.
    let (status, _) = send(&router, Method::GET, "/api/trainers/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_update_patches_supplied_fields() {
    let (router, _resources) = app().await;
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/users",
        Some("alice"),
        Some(registration_body("Alice")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/users/me",
        Some("alice"),
        Some(json!({"bio": "lifting since 2020"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "lifting since 2020");
    assert_eq!(body["display_name"], "Alice");
}

#[tokio::test]
async fn gym_admin_lists_only_own_gym_members() {
    let (router, resources) = app().await;
    seed_gym_admin(&resources.store, "admin", Some("gym-1")).await;
    seed_user(&resources.store, "alice", Some("gym-1")).await;
    seed_user(&resources.store, "bob", Some("gym-2")).await;

    let (status, body) = send(&router, Method::GET, "/api/users", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "alice");

    // Members cannot use the listing endpoint at all.
    let (status, _) = send(&router, Method::GET, "/api/users", Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Posts and feed privacy
// ---------------------------------------------------------------------------

async fn create_post(router: &Router, subject: &str, body: Value) -> String {
    let (status, body) = send(router, Method::POST, "/api/posts", Some(subject), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn public_posts_are_visible_to_everyone() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post_id = create_post(&router, "alice", json!({"content": "hello world"})).await;

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "hello world");
}

#[tokio::test]
async fn private_posts_read_as_absent_to_others() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post_id = create_post(
        &router,
        "alice",
        json!({"content": "diary", "privacy": "private"}),
    )
    .await;

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The author still sees it.
    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn gym_posts_require_gym_membership() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", Some("gym-1")).await;
    seed_user(&resources.store, "mate", Some("gym-1")).await;
    seed_user(&resources.store, "outsider", Some("gym-2")).await;

    let post_id = create_post(
        &router,
        "alice",
        json!({"content": "gym only", "privacy": "gym", "gym_id": "gym-1"}),
    )
    .await;

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("mate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("outsider"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn friends_posts_open_up_after_acceptance() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post_id = create_post(
        &router,
        "alice",
        json!({"content": "for friends", "privacy": "friends"}),
    )
    .await;

    let uri = format!("/api/posts/{post_id}");
    let (status, _) = send(&router, Method::GET, &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bob requests, Alice accepts.
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/connections",
        Some("bob"),
        Some(json!({"recipient_id": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let connection_id = body["id"].as_str().unwrap().to_owned();

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/connections/{connection_id}/accept"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, Method::GET, &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn feed_hides_what_the_viewer_cannot_see() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", Some("gym-1")).await;
    seed_user(&resources.store, "bob", Some("gym-2")).await;

    create_post(&router, "alice", json!({"content": "public post"})).await;
    create_post(
        &router,
        "alice",
        json!({"content": "private post", "privacy": "private"}),
    )
    .await;
    create_post(
        &router,
        "alice",
        json!({"content": "gym post", "privacy": "gym", "gym_id": "gym-1"}),
    )
    .await;

    let (status, body) = send(&router, Method::GET, "/api/feed", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["public post"]);

    // The author sees all three.
    let (_, body) = send(&router, Method::GET, "/api/feed", Some("alice"), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn only_the_author_edits_a_post() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post_id = create_post(&router, "alice", json!({"content": "v1"})).await;
    let uri = format!("/api/posts/{post_id}");

    let (status, body) = send(
        &router,
        Method::PUT,
        &uri,
        Some("bob"),
        Some(json!({"content": "hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_OWNER");

    let (status, body) = send(
        &router,
        Method::PUT,
        &uri,
        Some("alice"),
        Some(json!({"content": "v2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "v2");
    assert_eq!(body["version"], 2);
}

#[tokio::test]
async fn likes_are_idempotent_conflicts_and_counted() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post_id = create_post(&router, "alice", json!({"content": "like me"})).await;
    let like_uri = format!("/api/posts/{post_id}/like");

    let (status, _) = send(&router, Method::POST, &like_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&router, Method::POST, &like_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["like_count"], 1);

    let (status, _) = send(&router, Method::DELETE, &like_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["like_count"], 0);
}

#[tokio::test]
async fn deleting_a_post_cascades_comments() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let post_id = create_post(&router, "alice", json!({"content": "discuss"})).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/posts/{post_id}/comments"),
        Some("bob"),
        Some(json!({"content": "nice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["id"].as_str().unwrap().to_owned();

    let (_, body) = send(
        &router,
        Method::GET,
        &format!("/api/posts/{post_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["comment_count"], 1);

    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/posts/{post_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    use gympulse::store::{collections, DocumentStore};
    assert!(resources
        .store
        .read_opt(collections::COMMENTS, &comment_id)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_lifecycle_and_notifications() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/connections",
        Some("alice"),
        Some(json!({"recipient_id": "bob", "message": "train together?"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let connection_id = body["id"].as_str().unwrap().to_owned();

    // Bob was notified of the request.
    let (_, body) = send(&router, Method::GET, "/api/notifications", Some("bob"), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["kind"], "connection_request");

    // A duplicate request conflicts while the first is live.
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/connections",
        Some("alice"),
        Some(json!({"recipient_id": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Only the recipient can accept.
    let accept_uri = format!("/api/connections/{connection_id}/accept");
    let (status, _) = send(&router, Method::POST, &accept_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, Method::POST, &accept_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    // Accepting twice conflicts.
    let (status, _) = send(&router, Method::POST, &accept_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Alice learned about the acceptance.
    let (_, body) = send(
        &router,
        Method::GET,
        "/api/notifications",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["items"][0]["kind"], "connection_accepted");
}

#[tokio::test]
async fn self_connection_is_rejected() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/connections",
        Some("alice"),
        Some(json!({"recipient_id": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conversations_deduplicate_and_gate_messages() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;
    seed_user(&resources.store, "eve", None).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/conversations",
        Some("alice"),
        Some(json!({"participant_id": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let conversation_id = body["id"].as_str().unwrap().to_owned();

    // Opening again (from either side) returns the same conversation.
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/conversations",
        Some("bob"),
        Some(json!({"participant_id": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], conversation_id);

    let messages_uri = format!("/api/conversations/{conversation_id}/messages");
    let (status, body) = send(
        &router,
        Method::POST,
        &messages_uri,
        Some("alice"),
        Some(json!({"content": "see you at 6"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let message_id = body["id"].as_str().unwrap().to_owned();

    // An outsider sees neither the conversation nor its messages.
    let (status, _) = send(&router, Method::GET, &messages_uri, Some("eve"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The recipient reads and marks read; the sender cannot.
    let read_uri = format!("/api/messages/{message_id}/read");
    let (status, _) = send(&router, Method::POST, &read_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, Method::POST, &read_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["read"], true);

    // The conversation preview was refreshed.
    let (_, body) = send(&router, Method::GET, "/api/conversations", Some("bob"), None).await;
    assert_eq!(body["items"][0]["last_message"], "see you at 6");

    // Bob was notified of the new message.
    let (_, notifications) = send(
        &router,
        Method::GET,
        "/api/notifications?unread_only=true",
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(notifications["items"][0]["kind"], "new_message");
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn activity_reports_accumulate_points_and_level_up() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;

    // Level 1 needs 100 points; 60 is not enough.
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/milestones/activities",
        Some("alice"),
        Some(json!({"activity_type": "workout", "points": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 1);
    assert_eq!(body["total_points"], 60);

    // Another 60 crosses the boundary and rolls the remainder over.
    let (_, body) = send(
        &router,
        Method::POST,
        "/api/milestones/activities",
        Some("alice"),
        Some(json!({"activity_type": "workout", "points": 60})),
    )
    .await;
    assert_eq!(body["level"], 2);
    assert_eq!(body["total_points"], 20);

    let (_, summary) = send(
        &router,
        Method::GET,
        "/api/milestones/me",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(summary["level"], 2);
    assert_eq!(summary["total_points"], 20);

    // The level-up produced a notification.
    let (_, body) = send(
        &router,
        Method::GET,
        "/api/notifications",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["items"][0]["kind"], "level_up");
}

#[tokio::test]
async fn out_of_range_activity_points_are_rejected() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/milestones/activities",
        Some("alice"),
        Some(json!({"activity_type": "workout", "points": 100_000})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn challenges_are_created_by_trainers_and_joined_by_members() {
    let (router, resources) = app().await;
    seed_trainer(&resources.store, "coach", Some("gym-1")).await;
    seed_user(&resources.store, "alice", Some("gym-1")).await;

    // Members cannot create challenges.
    let challenge = json!({
        "title": "Spring sprint",
        "gym_id": "gym-1",
        "starts_at": "2026-09-01T00:00:00Z",
        "ends_at": "2026-09-30T00:00:00Z",
        "goal_points": 500,
    });
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/challenges",
        Some("alice"),
        Some(challenge.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/challenges",
        Some("coach"),
        Some(challenge),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let challenge_id = body["id"].as_str().unwrap().to_owned();

    let join_uri = format!("/api/challenges/{challenge_id}/join");
    let (status, _) = send(&router, Method::POST, &join_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::CREATED);

    // Joining twice conflicts.
    let (status, _) = send(&router, Method::POST, &join_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notifications_are_recipient_scoped_and_markable() {
    let (router, resources) = app().await;
    seed_user(&resources.store, "alice", None).await;
    seed_user(&resources.store, "bob", None).await;
    seed_user(&resources.store, "carol", None).await;

    // Two requests produce two notifications for bob.
    for requester in ["alice", "carol"] {
        let (status, _) = send(
            &router,
            Method::POST,
            "/api/connections",
            Some(requester),
            Some(json!({"recipient_id": "bob"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(
        &router,
        Method::GET,
        "/api/notifications?unread_only=true",
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    // Alice sees none of bob's notifications.
    let (_, body) = send(
        &router,
        Method::GET,
        "/api/notifications",
        Some("alice"),
        None,
    )
    .await;
    assert!(body["items"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/notifications/read-all",
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked_read"], 2);

    let (_, body) = send(
        &router,
        Method::GET,
        "/api/notifications?unread_only=true",
        Some("bob"),
        None,
    )
    .await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Gyms
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gym_creation_attaches_the_admin() {
    let (router, resources) = app().await;
    seed_gym_admin(&resources.store, "admin", None).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/gyms",
        Some("admin"),
        Some(json!({"name": "Iron Temple"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let gym_id = body["id"].as_str().unwrap().to_owned();

    use gympulse::store::{collections, DocumentStore};
    let admin = resources
        .store
        .read(collections::GYM_ADMINS, "admin")
        .await
        .unwrap();
    assert_eq!(admin.payload["gym_id"], gym_id.as_str());
}

#[tokio::test]
async fn deleting_an_older_gym_keeps_the_current_attachment() {
    let (router, resources) = app().await;
    seed_gym_admin(&resources.store, "admin", None).await;

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/gyms",
        Some("admin"),
        Some(json!({"name": "First Gym"})),
    )
    .await;
    let first_id = body["id"].as_str().unwrap().to_owned();

    // Opening a second gym moves the attachment to it.
    let (_, body) = send(
        &router,
        Method::POST,
        "/api/gyms",
        Some("admin"),
        Some(json!({"name": "Second Gym"})),
    )
    .await;
    let second_id = body["id"].as_str().unwrap().to_owned();

    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/gyms/{first_id}"),
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    use gympulse::store::{collections, DocumentStore};
    let admin = resources
        .store
        .read(collections::GYM_ADMINS, "admin")
        .await
        .unwrap();
    assert_eq!(admin.payload["gym_id"], second_id.as_str());

    // Deleting the current gym does detach.
    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/gyms/{second_id}"),
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let admin = resources
        .store
        .read(collections::GYM_ADMINS, "admin")
        .await
        .unwrap();
    assert!(admin.payload["gym_id"].is_null());
}

#[tokio::test]
async fn gym_updates_are_admin_owner_only() {
    let (router, resources) = app().await;
    seed_gym_admin(&resources.store, "admin", None).await;
    seed_gym_admin(&resources.store, "rival", None).await;

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/gyms",
        Some("admin"),
        Some(json!({"name": "Iron Temple"})),
    )
    .await;
    let gym_id = body["id"].as_str().unwrap().to_owned();
    let uri = format!("/api/gyms/{gym_id}");

    let (status, _) = send(
        &router,
        Method::PUT,
        &uri,
        Some("rival"),
        Some(json!({"name": "Rust Temple"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &router,
        Method::PUT,
        &uri,
        Some("admin"),
        Some(json!({"name": "Iron Cathedral"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Iron Cathedral");
}
