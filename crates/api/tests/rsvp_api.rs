//! HTTP-level tests for the RSVP endpoints.
//!
//! Covers the status transition flow, idempotent re-sends, absence (204),
//! validation of status tokens, not-found events, withdrawal, and
//! concurrent RSVPs through the full middleware stack.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, member, put_json_auth, seed_event};
use serde_json::json;
use sqlx::PgPool;

async fn attending(app: axum::Router, event_id: i64, token: &str) -> i64 {
    let response = get_auth(app, &format!("/api/v1/events/{event_id}"), token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["attending"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rsvp_transitions_track_attending(pool: PgPool) {
    let (_, t1) = member(&pool, "u1").await;
    let (_, t2) = member(&pool, "u2").await;
    let event = seed_event(&pool, 10, None).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{}/rsvp", event.id);

    let steps = [
        (&t1, "going", 1),
        (&t2, "going", 2),
        (&t1, "maybe", 1),
        (&t2, "not_going", 0),
    ];
    for (token, status, expected) in steps {
        let response = put_json_auth(app.clone(), &uri, json!({ "status": status }), token).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], status);
        assert_eq!(attending(app.clone(), event.id, token).await, expected);
    }

    let response = get_auth(app.clone(), &uri, &t1).await;
    assert_eq!(body_json(response).await["data"]["status"], "maybe");

    let counts_uri = format!("/api/v1/events/{}/rsvps/counts", event.id);
    let json = body_json(get_auth(app, &counts_uri, &t1).await).await;
    assert_eq!(json["data"], json!({ "going": 0, "maybe": 1, "not_going": 1 }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_going_is_idempotent(pool: PgPool) {
    let (_, token) = member(&pool, "eager").await;
    let event = seed_event(&pool, 10, None).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{}/rsvp", event.id);

    let first = body_json(put_json_auth(app.clone(), &uri, json!({ "status": "going" }), &token).await).await;
    let second = body_json(put_json_auth(app.clone(), &uri, json!({ "status": "going" }), &token).await).await;

    assert_eq!(first, second);
    assert_eq!(attending(app.clone(), event.id, &token).await, 1);

    let list = body_json(get_auth(app, &format!("/api/v1/events/{}/rsvps", event.id), &token).await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn absent_rsvp_returns_204(pool: PgPool) {
    let (_, token) = member(&pool, "quiet").await;
    let event = seed_event(&pool, 10, None).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, &format!("/api/v1/events/{}/rsvp", event.id), &token).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_status_is_rejected_without_side_effects(pool: PgPool) {
    let (_, token) = member(&pool, "typo").await;
    let event = seed_event(&pool, 10, None).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/events/{}/rsvp", event.id),
        json!({ "status": "attending" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/events/{}/rsvps?status=yes", event.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(attending(app, event.id, &token).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rsvp_to_missing_event_returns_404(pool: PgPool) {
    let (_, token) = member(&pool, "wanderer").await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app.clone(),
        "/api/v1/events/424242/rsvp",
        json!({ "status": "going" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = get_auth(app, "/api/v1/events/424242/rsvps/counts", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn withdraw_removes_rsvp_and_decrements(pool: PgPool) {
    let (_, token) = member(&pool, "flaky").await;
    let event = seed_event(&pool, 10, None).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{}/rsvp", event.id);

    put_json_auth(app.clone(), &uri, json!({ "status": "going" }), &token).await;
    assert_eq!(attending(app.clone(), event.id, &token).await, 1);

    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(attending(app.clone(), event.id, &token).await, 0);

    let response = get_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Withdrawing again is harmless.
    let response = delete_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn summary_reports_spots_left_and_consistency(pool: PgPool) {
    let (_, t1) = member(&pool, "s1").await;
    let (_, t2) = member(&pool, "s2").await;
    let event = seed_event(&pool, 3, None).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{}/rsvp", event.id);

    put_json_auth(app.clone(), &uri, json!({ "status": "going" }), &t1).await;
    put_json_auth(app.clone(), &uri, json!({ "status": "maybe" }), &t2).await;

    let json = body_json(
        get_auth(app, &format!("/api/v1/events/{}/rsvps/summary", event.id), &t1).await,
    )
    .await;
    assert_eq!(json["data"]["attending"], 1);
    assert_eq!(json["data"]["spots_left"], 2);
    assert_eq!(json["data"]["counts"]["maybe"], 1);
    assert_eq!(json["data"]["consistent"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_rsvps_filters_by_status(pool: PgPool) {
    let (u1, t1) = member(&pool, "f1").await;
    let (_, t2) = member(&pool, "f2").await;
    let event = seed_event(&pool, 10, None).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{}/rsvp", event.id);

    put_json_auth(app.clone(), &uri, json!({ "status": "going" }), &t1).await;
    put_json_auth(app.clone(), &uri, json!({ "status": "not_going" }), &t2).await;

    let json = body_json(
        get_auth(
            app,
            &format!("/api/v1/events/{}/rsvps?status=going", event.id),
            &t1,
        )
        .await,
    )
    .await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], u1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_rsvps_count_every_user(pool: PgPool) {
    const N: usize = 12;
    let event = seed_event(&pool, 50, None).await;
    let mut tokens = Vec::with_capacity(N);
    for i in 0..N {
        tokens.push(member(&pool, &format!("rush{i}")).await.1);
    }
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{}/rsvp", event.id);

    let requests = tokens.iter().map(|token| {
        put_json_auth(app.clone(), &uri, json!({ "status": "going" }), token)
    });
    for response in futures::future::join_all(requests).await {
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(attending(app, event.id, &tokens[0]).await, N as i64);
}
