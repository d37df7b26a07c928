use sqlx::PgPool;

#[derive(Debug)]
pub struct SweepStats {
    pub deactivated: u64,
}

/// Nightly job that folds expired subscriptions into the stored status
/// flag: members whose current subscription has ended are flipped to
/// INACTIVE. The flag stays a convenience snapshot; every read still
/// derives the effective status from the subscription itself.
pub async fn deactivate_expired_members(pool: &PgPool) -> Result<SweepStats, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE members m
        SET status = 'INACTIVE'
        WHERE m.status = 'ACTIVE'
          AND (
            SELECT s.end_date
            FROM subscriptions s
            WHERE s.member_id = m.id
            ORDER BY s.end_date DESC
            LIMIT 1
          ) < NOW()
        "#,
    )
    .execute(pool)
    .await?;

    let stats = SweepStats {
        deactivated: result.rows_affected(),
    };

    tracing::info!(deactivated = stats.deactivated, "Status sweep completed");

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires a running PostgreSQL instance
    async fn sweep_runs_against_live_database() {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL required for this test");
        let pool = crate::db::create_pool(&database_url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        deactivate_expired_members(&pool).await.unwrap();
    }
}
