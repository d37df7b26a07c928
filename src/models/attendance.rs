use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub member_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub check_in_day: NaiveDate,
}

/// Attendance row joined with the member it belongs to, for the daily
/// attendance view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceWithMember {
    pub id: Uuid,
    pub member_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub full_name: String,
    pub phone: String,
    pub image_url: Option<String>,
}

impl Attendance {
    /// Records one check-in. The unique constraint on
    /// (member_id, check_in_day) is the storage-level once-per-day
    /// guarantee; a conflict returns `None` instead of a row. Rows are
    /// never updated after insert.
    pub async fn record(
        pool: &PgPool,
        member_id: Uuid,
        check_in: DateTime<Utc>,
        check_in_day: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let attendance = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO attendance (member_id, check_in, check_in_day)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT attendance_member_day_key DO NOTHING
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(check_in)
        .bind(check_in_day)
        .fetch_optional(pool)
        .await?;

        Ok(attendance)
    }

    /// Whether the member has a check-in within [from, to).
    pub async fn exists_in_range(
        pool: &PgPool,
        member_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM attendance
                WHERE member_id = $1 AND check_in >= $2 AND check_in < $3
            )
            "#,
        )
        .bind(member_id)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// All check-ins within [from, to), newest first, with member info.
    pub async fn list_in_range(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceWithMember>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AttendanceWithMember>(
            r#"
            SELECT a.id, a.member_id, a.check_in, m.full_name, m.phone, m.image_url
            FROM attendance a
            JOIN members m ON m.id = a.member_id
            WHERE a.check_in >= $1 AND a.check_in < $2
            ORDER BY a.check_in DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
