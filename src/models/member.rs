use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::subscription::{Plan, Subscription};

#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    #[error("Phone number is already registered to {existing_name}")]
    DuplicatePhone { existing_name: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const MIN_ID_PREFIX_LEN: usize = 8;

/// Whether a scanned string may stand in for an id prefix. UUID text is
/// hex digits and hyphens; everything else is operator input noise.
fn is_id_prefix(code: &str) -> bool {
    code.len() >= MIN_ID_PREFIX_LEN && code.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// Stored status flag. A convenience snapshot written at creation,
/// renewal and by the nightly sweep; reads derive the effective status
/// from the current subscription instead of trusting this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub image_url: Option<String>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMemberData {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub image_url: Option<String>,
    pub plan: Plan,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Member {
    /// Registration: creates the member together with its initial
    /// subscription in one transaction. Either both rows land or
    /// neither. A phone number already held by another member rejects
    /// the registration naming the existing holder.
    pub async fn create_with_subscription(
        pool: &PgPool,
        data: CreateMemberData,
    ) -> Result<(Self, Subscription), RegistrationError> {
        let mut tx = pool.begin().await?;

        if let Some(existing) = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members WHERE phone = $1
            "#,
        )
        .bind(&data.phone)
        .fetch_optional(&mut *tx)
        .await?
        {
            return Err(RegistrationError::DuplicatePhone {
                existing_name: existing.full_name,
            });
        }

        let member = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO members (full_name, email, phone, image_url, status)
            VALUES ($1, $2, $3, $4, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(&data.full_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.image_url)
        .fetch_one(&mut *tx)
        .await?;

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (member_id, plan, price, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(member.id)
        .bind(data.plan)
        .bind(data.plan.price())
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((member, subscription))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Scanner lookup: exact id match first, then a textual prefix
    /// match. The id space is designed so an 8-character prefix is
    /// effectively unique; anything shorter, or anything that is not
    /// made of id characters, never matches. That also keeps LIKE
    /// metacharacters like `%` and `_` out of the pattern.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        if let Ok(id) = Uuid::parse_str(code) {
            if let Some(member) = Self::find_by_id(pool, id).await? {
                return Ok(Some(member));
            }
        }

        if !is_id_prefix(code) {
            return Ok(None);
        }

        let member = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members
            WHERE id::text LIKE $1 || '%'
            LIMIT 1
            "#,
        )
        .bind(code.to_lowercase())
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Phone numbers are unique across members; used for the duplicate
    /// check at registration and edit.
    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members WHERE phone = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Substring search over name, email and phone, newest first.
    pub async fn search(pool: &PgPool, query: &str) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", query);
        let members = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members
            WHERE full_name ILIKE $1 OR email ILIKE $1 OR phone ILIKE $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Candidate list for operator disambiguation at the scanner; never
    /// part of the deterministic admission decision itself.
    pub async fn search_candidates(
        pool: &PgPool,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", query);
        let members = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members
            WHERE full_name ILIKE $1 OR phone ILIKE $1
            ORDER BY full_name ASC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        full_name: &str,
        email: Option<String>,
        phone: &str,
        image_url: Option<String>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE members
            SET
                full_name = $2,
                email = $3,
                phone = $4,
                image_url = COALESCE($5, image_url)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(phone)
        .bind(image_url)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Hard delete with explicit cascade: subscriptions and attendance
    /// rows go with the member, in one transaction.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM attendance WHERE member_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM subscriptions WHERE member_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
