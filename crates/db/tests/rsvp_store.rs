//! Integration tests for the RSVP manager running on PostgreSQL.
//!
//! Exercises the full persistence path against a real database:
//! - Transition scenario and attending counter consistency
//! - Idempotent upserts and one row per (event, user)
//! - Not-found handling without side effects
//! - Withdrawal and cascade on event delete
//! - Concurrent upserts and lock timeouts

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use campus_core::error::CoreError;
use campus_core::rsvp::{RsvpKey, RsvpManager, RsvpStatus, RsvpStore, StatusCounts};
use campus_core::types::DbId;
use campus_db::models::event::CreateEvent;
use campus_db::models::user::CreateUser;
use campus_db::repositories::{EventRepo, RsvpRepo, UserRepo};
use campus_db::PgRsvpStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn manager(pool: &PgPool) -> RsvpManager<PgRsvpStore> {
    RsvpManager::new(PgRsvpStore::new(pool.clone(), Duration::from_secs(2)))
}

async fn new_user(pool: &PgPool, name: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@campus.test"),
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_event(pool: &PgPool, capacity: i32) -> DbId {
    EventRepo::create(
        pool,
        &CreateEvent {
            title: "Board game night".to_string(),
            description: None,
            location: Some("Student union".to_string()),
            starts_at: None,
            capacity,
        },
        None,
    )
    .await
    .unwrap()
    .id
}

async fn attending(pool: &PgPool, event_id: DbId) -> i32 {
    EventRepo::find_by_id(pool, event_id)
        .await
        .unwrap()
        .unwrap()
        .attending
}

async fn assert_consistent(pool: &PgPool, event_id: DbId) {
    let counts = RsvpRepo::count_by_status(pool, event_id).await.unwrap();
    assert_eq!(counts.going, i64::from(attending(pool, event_id).await));
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transition_scenario(pool: PgPool) {
    let manager = manager(&pool);
    let u1 = new_user(&pool, "u1").await;
    let u2 = new_user(&pool, "u2").await;
    let e1 = new_event(&pool, 10).await;
    assert_eq!(attending(&pool, e1).await, 0);

    manager.upsert_rsvp(e1, u1, RsvpStatus::Going).await.unwrap();
    assert_eq!(attending(&pool, e1).await, 1);

    manager.upsert_rsvp(e1, u2, RsvpStatus::Going).await.unwrap();
    assert_eq!(attending(&pool, e1).await, 2);

    manager.upsert_rsvp(e1, u1, RsvpStatus::Maybe).await.unwrap();
    assert_eq!(attending(&pool, e1).await, 1);

    manager.upsert_rsvp(e1, u2, RsvpStatus::NotGoing).await.unwrap();
    assert_eq!(attending(&pool, e1).await, 0);

    let rsvp = manager.get_user_status(e1, u1).await.unwrap().unwrap();
    assert_eq!(rsvp.status, RsvpStatus::Maybe);

    let counts = manager.count_by_status(e1).await.unwrap();
    assert_eq!(
        counts,
        StatusCounts {
            going: 0,
            maybe: 1,
            not_going: 1
        }
    );
    assert!(manager.attendance_summary(e1).await.unwrap().consistent);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repeated_going_is_idempotent(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "repeat").await;
    let event = new_event(&pool, 10).await;

    let first = manager.upsert_rsvp(event, user, RsvpStatus::Going).await.unwrap();
    let second = manager.upsert_rsvp(event, user, RsvpStatus::Going).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(attending(&pool, event).await, 1);
    assert_eq!(manager.list_attendees(event, None).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_change_keeps_created_at(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "changer").await;
    let event = new_event(&pool, 10).await;

    let first = manager.upsert_rsvp(event, user, RsvpStatus::Maybe).await.unwrap();
    let second = manager.upsert_rsvp(event, user, RsvpStatus::Going).await.unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_absent_rsvp_is_none(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "silent").await;
    let event = new_event(&pool, 10).await;

    assert_eq!(manager.get_user_status(event, user).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_attendees_order_and_filter(pool: PgPool) {
    let manager = manager(&pool);
    let a = new_user(&pool, "a").await;
    let b = new_user(&pool, "b").await;
    let c = new_user(&pool, "c").await;
    let event = new_event(&pool, 10).await;

    manager.upsert_rsvp(event, b, RsvpStatus::Going).await.unwrap();
    manager.upsert_rsvp(event, a, RsvpStatus::Going).await.unwrap();
    manager.upsert_rsvp(event, c, RsvpStatus::Maybe).await.unwrap();
    manager.upsert_rsvp(event, b, RsvpStatus::NotGoing).await.unwrap();

    let order: Vec<DbId> = manager
        .list_attendees(event, None)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.user_id)
        .collect();
    assert_eq!(order, vec![a, c, b]);

    let maybe = manager
        .list_attendees(event, Some(RsvpStatus::Maybe))
        .await
        .unwrap();
    assert_eq!(maybe.len(), 1);
    assert_eq!(maybe[0].user_id, c);
}

// ---------------------------------------------------------------------------
// Not found
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_event_has_no_side_effects(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "lost").await;
    let other = new_event(&pool, 10).await;

    let err = manager
        .upsert_rsvp(999_999, user, RsvpStatus::Going)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "Event", id: 999_999 });

    assert_eq!(attending(&pool, other).await, 0);
    let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_rsvps")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows.0, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_user_is_not_found(pool: PgPool) {
    let manager = manager(&pool);
    let event = new_event(&pool, 10).await;

    let err = manager
        .upsert_rsvp(event, 424_242, RsvpStatus::Going)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "User", .. });
    assert_eq!(attending(&pool, event).await, 0);
}

// ---------------------------------------------------------------------------
// Withdraw and delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_withdraw_going_decrements(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "leaver").await;
    let event = new_event(&pool, 10).await;
    manager.upsert_rsvp(event, user, RsvpStatus::Going).await.unwrap();

    let removed = manager.withdraw_rsvp(event, user).await.unwrap().unwrap();
    assert_eq!(removed.status, RsvpStatus::Going);
    assert_eq!(attending(&pool, event).await, 0);
    assert_eq!(manager.get_user_status(event, user).await.unwrap(), None);
    assert_eq!(manager.withdraw_rsvp(event, user).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_delete_cascades_rsvps(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "cascade").await;
    let event = new_event(&pool, 10).await;
    manager.upsert_rsvp(event, user, RsvpStatus::Going).await.unwrap();

    assert!(EventRepo::delete(&pool, event).await.unwrap());

    assert_eq!(RsvpRepo::find(&pool, event, user).await.unwrap().map(|r| r.user_id), None);
    assert_matches!(
        manager.get_user_status(event, user).await,
        Err(CoreError::NotFound { entity: "Event", .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_with_rsvps_cannot_be_deleted(pool: PgPool) {
    let manager = manager(&pool);
    let user = new_user(&pool, "anchored").await;
    let event = new_event(&pool, 10).await;
    manager.upsert_rsvp(event, user, RsvpStatus::Going).await.unwrap();

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "FK must block deleting a user with RSVPs");
    assert_consistent(&pool, event).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_schema_rejects_unknown_status(pool: PgPool) {
    let user = new_user(&pool, "raw").await;
    let event = new_event(&pool, 10).await;

    let result = sqlx::query(
        "INSERT INTO event_rsvps (event_id, user_id, status) VALUES ($1, $2, 'attending')",
    )
    .bind(event)
    .bind(user)
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_distinct_users_lose_no_updates(pool: PgPool) {
    const N: usize = 16;
    let manager = Arc::new(RsvpManager::new(PgRsvpStore::new(
        pool.clone(),
        Duration::from_secs(10),
    )));
    let event = new_event(&pool, 100).await;
    let mut users = Vec::with_capacity(N);
    for i in 0..N {
        users.push(new_user(&pool, &format!("crowd{i}")).await);
    }

    let tasks = users.iter().map(|&user| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.upsert_rsvp(event, user, RsvpStatus::Going).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(attending(&pool, event).await, N as i32);
    assert_consistent(&pool, event).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_same_pair_keeps_single_row(pool: PgPool) {
    let manager = Arc::new(RsvpManager::new(PgRsvpStore::new(
        pool.clone(),
        Duration::from_secs(10),
    )));
    let user = new_user(&pool, "flip").await;
    let event = new_event(&pool, 10).await;

    let statuses = [
        RsvpStatus::Going,
        RsvpStatus::Going,
        RsvpStatus::Maybe,
        RsvpStatus::Going,
        RsvpStatus::NotGoing,
        RsvpStatus::Going,
    ];
    let tasks = statuses.into_iter().map(|status| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.upsert_rsvp(event, user, status).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let rows: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM event_rsvps WHERE event_id = $1 AND user_id = $2")
            .bind(event)
            .bind(user)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows.0, 1);
    assert_consistent(&pool, event).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_held_lock_times_out_as_retryable(pool: PgPool) {
    let user = new_user(&pool, "waiter").await;
    let event = new_event(&pool, 10).await;
    let holder = PgRsvpStore::new(pool.clone(), Duration::from_secs(2));
    let impatient = RsvpManager::new(PgRsvpStore::new(pool.clone(), Duration::from_millis(50)));

    let held = holder.begin(RsvpKey::new(event, user)).await.unwrap();
    let err = impatient
        .upsert_rsvp(event, user, RsvpStatus::Going)
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "expected retryable conflict, got {err:?}");
    assert_eq!(attending(&pool, event).await, 0);

    drop(held);
    impatient
        .upsert_rsvp(event, user, RsvpStatus::Going)
        .await
        .unwrap();
    assert_eq!(attending(&pool, event).await, 1);
}
