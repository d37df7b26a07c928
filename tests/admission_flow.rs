//! End-to-end admission scenarios against a live database.
//!
//! Run with: DATABASE_URL=... cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gymdesk::db;
use gymdesk::models::attendance::Attendance;
use gymdesk::models::member::{CreateMemberData, Member, RegistrationError};
use gymdesk::models::subscription::{Plan, Subscription};
use gymdesk::services::admission::AdmissionEngine;
use gymdesk::services::localtime::LocalTime;
use gymdesk::services::webhook::WebhookNotifier;

async fn setup() -> (PgPool, AdmissionEngine, LocalTime) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = db::create_pool(&database_url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let local_time = LocalTime::from_offset_hours(5).unwrap();
    let notifier = WebhookNotifier::new(None).unwrap();
    let engine = AdmissionEngine::new(pool.clone(), local_time, notifier);
    (pool, engine, local_time)
}

fn unique_phone() -> String {
    format!("+998{}", &Uuid::new_v4().simple().to_string()[..9])
}

fn member_data(phone: &str, plan: Plan, end_in_days: i64) -> CreateMemberData {
    let now = Utc::now();
    CreateMemberData {
        full_name: "Test Member".to_string(),
        email: None,
        phone: phone.to_string(),
        image_url: None,
        plan,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(end_in_days),
    }
}

async fn register(pool: &PgPool, plan: Plan, end_in_days: i64) -> Member {
    let (member, _) =
        Member::create_with_subscription(pool, member_data(&unique_phone(), plan, end_in_days))
            .await
            .unwrap();
    member
}

async fn attendance_count(pool: &PgPool, member_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE member_id = $1")
        .bind(member_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn daily_member_is_allowed_once_then_denied_as_duplicate() {
    let (pool, engine, _) = setup().await;
    let member = register(&pool, Plan::Daily, 30).await;

    let first = engine.admit(&member.id.to_string()).await.unwrap();
    assert!(first.allowed);
    assert!(first.checked_in_at.is_some());

    let second = engine.admit(&member.id.to_string()).await.unwrap();
    assert!(!second.allowed);
    assert_eq!(second.reason.code(), "ALREADY_CHECKED_IN_TODAY");

    assert_eq!(attendance_count(&pool, member.id).await, 1);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn prefix_of_the_identifier_resolves_the_member() {
    let (pool, engine, _) = setup().await;
    let member = register(&pool, Plan::Daily, 30).await;

    let prefix = &member.id.to_string()[..8];
    let result = engine.admit(prefix).await.unwrap();
    assert!(result.allowed);
    assert_eq!(result.member.unwrap().id, member.id);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn expired_subscription_is_denied() {
    let (pool, engine, _) = setup().await;
    let member = register(&pool, Plan::Daily, -1).await;

    let result = engine.admit(&member.id.to_string()).await.unwrap();
    assert!(!result.allowed);
    assert_eq!(result.reason.code(), "SUBSCRIPTION_EXPIRED");
    assert_eq!(attendance_count(&pool, member.id).await, 0);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn alternate_day_member_who_visited_yesterday_is_denied() {
    let (pool, engine, local_time) = setup().await;
    let member = register(&pool, Plan::AlternateDay, 30).await;

    let yesterday = local_time.local_day(Utc::now()) - Duration::days(1);
    let (y_start, _) = local_time.day_bounds(yesterday);
    Attendance::record(&pool, member.id, y_start + Duration::hours(10), yesterday)
        .await
        .unwrap()
        .expect("seed attendance inserted");

    let result = engine.admit(&member.id.to_string()).await.unwrap();
    assert!(!result.allowed);
    assert_eq!(result.reason.code(), "ALTERNATE_DAY_VIOLATION");
    assert_eq!(attendance_count(&pool, member.id).await, 1);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn unknown_identifier_is_denied_without_mutation() {
    let (_, engine, _) = setup().await;

    let result = engine.admit("no-such-member").await.unwrap();
    assert!(!result.allowed);
    assert_eq!(result.reason.code(), "MEMBER_NOT_FOUND");
    assert!(result.member.is_none());
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn wildcard_and_short_scans_never_resolve_a_member() {
    let (pool, engine, _) = setup().await;
    // A valid member exists; garbage input must still not reach them.
    let member = register(&pool, Plan::Daily, 30).await;

    for code in ["", "  ", "%", "%%%%%%%%", "________", "550e840"] {
        let result = engine.admit(code).await.unwrap();
        assert!(!result.allowed, "scan {code:?} must not be admitted");
        assert_eq!(result.reason.code(), "MEMBER_NOT_FOUND");
        assert!(result.member.is_none());
    }

    assert_eq!(attendance_count(&pool, member.id).await, 0);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn duplicate_phone_registration_fails_naming_the_holder() {
    let (pool, _, _) = setup().await;
    let phone = unique_phone();

    let (first, _) = Member::create_with_subscription(&pool, member_data(&phone, Plan::Daily, 30))
        .await
        .unwrap();

    let err = Member::create_with_subscription(&pool, member_data(&phone, Plan::AlternateDay, 30))
        .await
        .unwrap_err();
    match err {
        RegistrationError::DuplicatePhone { existing_name } => {
            assert_eq!(existing_name, first.full_name)
        }
        other => panic!("expected a duplicate-phone rejection, got {other:?}"),
    }

    // No second member landed, and the first member still has exactly
    // one subscription.
    let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE phone = $1")
        .bind(&phone)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(members, 1);
    assert_eq!(
        Subscription::list_for_member(&pool, first.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn concurrent_scans_produce_at_most_one_attendance_row() {
    let (pool, engine, _) = setup().await;
    let member = register(&pool, Plan::Daily, 30).await;
    let code = member.id.to_string();

    let (a, b) = tokio::join!(engine.admit(&code), engine.admit(&code));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.allowed ^ b.allowed, "exactly one of the two scans may win");
    assert_eq!(attendance_count(&pool, member.id).await, 1);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn renewal_appends_a_row_and_reactivates_the_member() {
    let (pool, engine, _) = setup().await;
    let member = register(&pool, Plan::Daily, -10).await;

    // Expired: the scan is denied.
    let denied = engine.admit(&member.id.to_string()).await.unwrap();
    assert!(!denied.allowed);

    let before = Subscription::list_for_member(&pool, member.id).await.unwrap();
    let now = Utc::now();
    Subscription::renew(&pool, member.id, Plan::Daily, now, now + Duration::days(30))
        .await
        .unwrap();

    let after = Subscription::list_for_member(&pool, member.id).await.unwrap();
    assert_eq!(after.len(), before.len() + 1);

    // The old row is untouched.
    let old = after.iter().find(|s| s.id == before[0].id).unwrap();
    assert_eq!(old.end_date, before[0].end_date);
    assert_eq!(old.price, before[0].price);

    let allowed = engine.admit(&member.id.to_string()).await.unwrap();
    assert!(allowed.allowed);
}
