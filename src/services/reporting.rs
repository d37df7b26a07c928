use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::services::localtime::LocalTime;
use crate::services::webhook::{WebhookEvent, WebhookNotifier};

/// Headline numbers for the dashboard, all derived by read-only
/// aggregation; no decision logic lives here.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_members: i64,
    pub active_members: i64,
    pub inactive_members: i64,
    pub new_members_this_month: i64,
    pub today_revenue: i64,
    pub today_visits: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReportStats {
    pub month_label: String,
    pub new_members: i64,
    pub subscription_count: i64,
    pub total_revenue: i64,
    pub total_visits: i64,
}

pub async fn dashboard_stats(
    pool: &PgPool,
    local_time: &LocalTime,
) -> Result<DashboardStats, sqlx::Error> {
    let now = Utc::now();
    let (today_start, today_end) = local_time.day_bounds(local_time.local_day(now));
    let (month_start, _, _) = local_time.month_bounds(now);

    let total_members =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
            .fetch_one(pool)
            .await?;

    // Effective status per member: the current subscription decides,
    // the stored flag only stands when no subscription exists.
    let active_members = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM members m
        WHERE COALESCE(
            (SELECT s.end_date >= NOW()
             FROM subscriptions s
             WHERE s.member_id = m.id
             ORDER BY s.end_date DESC
             LIMIT 1),
            m.status = 'ACTIVE'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    let new_members_this_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM members WHERE created_at >= $1",
    )
    .bind(month_start)
    .fetch_one(pool)
    .await?;

    let today_revenue = sum_revenue(pool, today_start, today_end).await?;
    let today_visits = count_visits(pool, today_start, today_end).await?;

    Ok(DashboardStats {
        total_members,
        active_members,
        inactive_members: total_members - active_members,
        new_members_this_month,
        today_revenue,
        today_visits,
    })
}

pub async fn monthly_report(
    pool: &PgPool,
    local_time: &LocalTime,
) -> Result<MonthlyReportStats, sqlx::Error> {
    let now = Utc::now();
    let (start, end, month_label) = local_time.month_bounds(now);

    let new_members = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM members WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let subscription_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM subscriptions WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let total_revenue = sum_revenue(pool, start, end).await?;
    let total_visits = count_visits(pool, start, end).await?;

    Ok(MonthlyReportStats {
        month_label,
        new_members,
        subscription_count,
        total_revenue,
        total_visits,
    })
}

/// Builds the current month's report and emits it as a MONTHLY_REPORT
/// event. The aggregates are returned to the caller either way;
/// delivery is best-effort.
pub async fn send_monthly_report(
    pool: &PgPool,
    local_time: &LocalTime,
    notifier: &WebhookNotifier,
) -> Result<MonthlyReportStats, sqlx::Error> {
    let stats = monthly_report(pool, local_time).await?;

    notifier.notify(WebhookEvent::MonthlyReport {
        report_month: stats.month_label.clone(),
        new_members: stats.new_members,
        total_revenue: stats.total_revenue,
        subscription_count: stats.subscription_count,
        total_visits: stats.total_visits,
        report_date: Utc::now(),
    });

    Ok(stats)
}

async fn sum_revenue(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(price), 0)::BIGINT FROM subscriptions WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}

async fn count_visits(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE check_in >= $1 AND check_in < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}
