use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// The two membership tiers offered by the facility. Prices are whole
/// currency units (so'm), no fractional handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    /// Admission on at most every other calendar day
    AlternateDay,
    /// Unrestricted daily admission
    Daily,
}

impl Plan {
    pub fn price(self) -> i64 {
        match self {
            Plan::AlternateDay => 300_000,
            Plan::Daily => 550_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::AlternateDay => "ALTERNATE_DAY",
            Plan::Daily => "DAILY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub member_id: Uuid,
    pub plan: Plan,
    pub price: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// The member's current subscription: the row with the latest end date.
    pub async fn latest_for_member(
        pool: &PgPool,
        member_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM subscriptions
            WHERE member_id = $1
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    pub async fn list_for_member(
        pool: &PgPool,
        member_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let subscriptions = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM subscriptions
            WHERE member_id = $1
            ORDER BY end_date DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(subscriptions)
    }

    /// Renewal: appends a new subscription row and flips the member's
    /// stored status back to ACTIVE, in one transaction. Prior rows are
    /// never touched.
    pub async fn renew(
        pool: &PgPool,
        member_id: Uuid,
        plan: Plan,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let subscription = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO subscriptions (member_id, plan, price, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(plan)
        .bind(plan.price())
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE members SET status = 'ACTIVE' WHERE id = $1
            "#,
        )
        .bind(member_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(subscription)
    }

    /// The plan of the current subscription is mutable in place on
    /// member edit; dates and price of past rows never change.
    pub async fn update_current_plan(
        pool: &PgPool,
        member_id: Uuid,
        plan: Plan,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE subscriptions SET plan = $2
            WHERE id = (
                SELECT id FROM subscriptions
                WHERE member_id = $1
                ORDER BY end_date DESC
                LIMIT 1
            )
            "#,
        )
        .bind(member_id)
        .bind(plan)
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_price_table() {
        assert_eq!(Plan::AlternateDay.price(), 300_000);
        assert_eq!(Plan::Daily.price(), 550_000);
    }

    #[test]
    fn plan_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&Plan::AlternateDay).unwrap(),
            r#""ALTERNATE_DAY""#
        );
        assert_eq!(serde_json::to_string(&Plan::Daily).unwrap(), r#""DAILY""#);
    }
}
