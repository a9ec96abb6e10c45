// ABOUTME: Integration tests for the SQLite document store backend
// ABOUTME: CRUD semantics, optimistic versioning, filtering, and pagination
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use common::create_test_store;
use gympulse::errors::ErrorCode;
use gympulse::store::{
    collections, DocumentStore, Filter, NewRecord, Patch, Query, QueryOrder,
};
use serde_json::{json, Value};

#[tokio::test]
async fn create_and_read_round_trip() {
    let store = create_test_store().await;

    let record = store
        .create(
            collections::POSTS,
            NewRecord::assigned("alice", json!({"content": "hello", "privacy": "public"})),
        )
        .await
        .unwrap();

    assert_eq!(record.version, 1);
    assert_eq!(record.owner_subject_id, "alice");
    assert!(!record.id.is_empty());

    let read = store.read(collections::POSTS, &record.id).await.unwrap();
    assert_eq!(read, record);
}

#[tokio::test]
async fn create_with_natural_key_conflicts() {
    let store = create_test_store().await;

    store
        .create(
            collections::USERS,
            NewRecord::keyed("subject-1", "subject-1", json!({"display_name": "A"})),
        )
        .await
        .unwrap();

    let err = store
        .create(
            collections::USERS,
            NewRecord::keyed("subject-1", "subject-1", json!({"display_name": "B"})),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);
}

#[tokio::test]
async fn same_id_in_different_collections_is_fine() {
    let store = create_test_store().await;

    store
        .create(
            collections::USERS,
            NewRecord::keyed("subject-1", "subject-1", json!({"display_name": "A"})),
        )
        .await
        .unwrap();
    store
        .create(
            collections::TRAINERS,
            NewRecord::keyed("subject-1", "subject-1", json!({"display_name": "A"})),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn read_missing_is_not_found() {
    let store = create_test_store().await;

    let err = store.read(collections::POSTS, "nope").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    assert!(store
        .read_opt(collections::POSTS, "nope")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn partial_update_only_touches_supplied_fields() {
    let store = create_test_store().await;

    let record = store
        .create(
            collections::POSTS,
            NewRecord::assigned("alice", json!({"content": "v1", "like_count": 3})),
        )
        .await
        .unwrap();

    let updated = store
        .update(
            collections::POSTS,
            &record.id,
            Patch::single("content", Value::String("v2".to_owned())),
        )
        .await
        .unwrap();

    assert_eq!(updated.payload["content"], "v2");
    assert_eq!(updated.payload["like_count"], 3);
    assert_eq!(updated.version, 2);
    assert!(updated.updated_at >= record.updated_at);
    assert_eq!(updated.created_at, record.created_at);
}

#[tokio::test]
async fn stale_expected_version_conflicts() {
    let store = create_test_store().await;

    let record = store
        .create(
            collections::POSTS,
            NewRecord::assigned("alice", json!({"content": "v1"})),
        )
        .await
        .unwrap();

    // Another writer advances the version.
    store
        .update(
            collections::POSTS,
            &record.id,
            Patch::single("content", Value::String("v2".to_owned())),
        )
        .await
        .unwrap();

    let err = store
        .update(
            collections::POSTS,
            &record.id,
            Patch::single("content", Value::String("v3".to_owned()))
                .expecting_version(record.version),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::VersionConflict);

    // The losing write must not have clobbered anything.
    let current = store.read(collections::POSTS, &record.id).await.unwrap();
    assert_eq!(current.payload["content"], "v2");
    assert_eq!(current.version, 2);
}

#[tokio::test]
async fn delete_then_read_is_not_found() {
    let store = create_test_store().await;

    let record = store
        .create(
            collections::POSTS,
            NewRecord::assigned("alice", json!({"content": "bye"})),
        )
        .await
        .unwrap();

    store.delete(collections::POSTS, &record.id).await.unwrap();

    let err = store.read(collections::POSTS, &record.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    let err = store
        .delete(collections::POSTS, &record.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn query_filters_on_payload_and_envelope_fields() {
    let store = create_test_store().await;

    for (owner, privacy) in [("alice", "public"), ("alice", "private"), ("bob", "public")] {
        store
            .create(
                collections::POSTS,
                NewRecord::assigned(owner, json!({"content": "x", "privacy": privacy})),
            )
            .await
            .unwrap();
    }

    let page = store
        .query(
            collections::POSTS,
            Query::filtered(vec![
                Filter::eq("owner_subject_id", Value::String("alice".to_owned())),
                Filter::eq("privacy", Value::String("public".to_owned())),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].owner_subject_id, "alice");
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn array_contains_matches_membership() {
    let store = create_test_store().await;

    store
        .create(
            collections::CONNECTIONS,
            NewRecord::assigned(
                "alice",
                json!({"user_ids": ["alice", "bob"], "status": "accepted"}),
            ),
        )
        .await
        .unwrap();
    store
        .create(
            collections::CONNECTIONS,
            NewRecord::assigned(
                "carol",
                json!({"user_ids": ["carol", "dave"], "status": "accepted"}),
            ),
        )
        .await
        .unwrap();

    let page = store
        .query(
            collections::CONNECTIONS,
            Query::filtered(vec![Filter::array_contains(
                "user_ids",
                Value::String("bob".to_owned()),
            )]),
        )
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].owner_subject_id, "alice");
}

#[tokio::test]
async fn cursor_pagination_covers_the_set_without_gaps_or_duplicates() {
    let store = create_test_store().await;

    for i in 0..7 {
        store
            .create(
                collections::POSTS,
                NewRecord::assigned("alice", json!({"content": format!("post {i}"), "seq": i})),
            )
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = store
            .query(
                collections::POSTS,
                Query::filtered(vec![])
                    .ordered_by(QueryOrder::asc("created_at"))
                    .with_limit(3)
                    .with_cursor(cursor),
            )
            .await
            .unwrap();

        assert!(page.records.len() <= 3);
        for record in &page.records {
            assert!(
                !seen.contains(&record.id),
                "record {} paged twice",
                record.id
            );
            seen.push(record.id.clone());
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen.len(), 7);
}

#[tokio::test]
async fn descending_order_with_cursor_pages_newest_first() {
    let store = create_test_store().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let record = store
            .create(
                collections::POSTS,
                NewRecord::assigned("alice", json!({"content": format!("post {i}")})),
            )
            .await
            .unwrap();
        ids.push(record.id);
    }

    let first = store
        .query(
            collections::POSTS,
            Query::filtered(vec![])
                .ordered_by(QueryOrder::desc("created_at"))
                .with_limit(2),
        )
        .await
        .unwrap();
    assert_eq!(first.records.len(), 2);
    assert!(first.next_cursor.is_some());

    let second = store
        .query(
            collections::POSTS,
            Query::filtered(vec![])
                .ordered_by(QueryOrder::desc("created_at"))
                .with_limit(2)
                .with_cursor(first.next_cursor),
        )
        .await
        .unwrap();

    // No overlap between consecutive pages.
    for record in &second.records {
        assert!(first.records.iter().all(|r| r.id != record.id));
    }

    // Newest first within and across pages.
    let mut all = first.records.clone();
    all.extend(second.records.clone());
    for window in all.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }
}

#[tokio::test]
async fn query_on_numeric_payload_field_orders_numerically() {
    let store = create_test_store().await;

    for points in [50, 200, 5] {
        store
            .create(
                collections::MILESTONE_ACTIVITIES,
                NewRecord::assigned("alice", json!({"activity_type": "workout", "points": points})),
            )
            .await
            .unwrap();
    }

    let page = store
        .query(
            collections::MILESTONE_ACTIVITIES,
            Query::filtered(vec![]).ordered_by(QueryOrder::desc("points")),
        )
        .await
        .unwrap();

    let points: Vec<i64> = page
        .records
        .iter()
        .map(|r| r.payload["points"].as_i64().unwrap())
        .collect();
    assert_eq!(points, vec![200, 50, 5]);
}

#[tokio::test]
async fn pagination_handles_records_missing_the_order_field() {
    let store = create_test_store().await;

    // Two records carry the order field, three do not. The keyless rows sort
    // as SQL NULL, so cursors issued inside that run carry a null order value
    // and pagination must still resume from them in either direction.
    for priority in [5, 9] {
        store
            .create(
                collections::POSTS,
                NewRecord::assigned("alice", json!({"content": "ranked", "priority": priority})),
            )
            .await
            .unwrap();
    }
    for i in 0..3 {
        store
            .create(
                collections::POSTS,
                NewRecord::assigned("alice", json!({"content": format!("unranked {i}")})),
            )
            .await
            .unwrap();
    }

    for order in [QueryOrder::asc("priority"), QueryOrder::desc("priority")] {
        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = store
                .query(
                    collections::POSTS,
                    Query::filtered(vec![])
                        .ordered_by(order.clone())
                        .with_limit(2)
                        .with_cursor(cursor),
                )
                .await
                .unwrap();

            for record in &page.records {
                assert!(
                    !seen.contains(&record.id),
                    "record {} paged twice",
                    record.id
                );
                seen.push(record.id.clone());
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);
    }
}

#[tokio::test]
async fn hostile_field_names_are_rejected() {
    let store = create_test_store().await;

    let err = store
        .query(
            collections::POSTS,
            Query::filtered(vec![Filter::eq(
                "content') OR 1=1 --",
                Value::String("x".to_owned()),
            )]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn ping_succeeds_on_open_store() {
    let store = create_test_store().await;
    store.ping().await.unwrap();
}
