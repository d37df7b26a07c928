use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::attendance::Attendance;
use crate::models::member::{Member, MemberStatus};
use crate::models::subscription::{Plan, Subscription};
use crate::services::localtime::LocalTime;
use crate::services::webhook::{WebhookEvent, WebhookNotifier};

#[derive(thiserror::Error, Debug)]
pub enum AdmissionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why an admission call was denied, or `Allowed`. Policy denials are
/// expected outcomes returned as data, never as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionReason {
    Allowed,
    MemberNotFound,
    AlreadyCheckedInToday,
    SubscriptionExpired,
    InactiveMember,
    AlternateDayViolation,
}

impl AdmissionReason {
    pub fn code(self) -> &'static str {
        match self {
            AdmissionReason::Allowed => "ALLOWED",
            AdmissionReason::MemberNotFound => "MEMBER_NOT_FOUND",
            AdmissionReason::AlreadyCheckedInToday => "ALREADY_CHECKED_IN_TODAY",
            AdmissionReason::SubscriptionExpired => "SUBSCRIPTION_EXPIRED",
            AdmissionReason::InactiveMember => "INACTIVE_MEMBER",
            AdmissionReason::AlternateDayViolation => "ALTERNATE_DAY_VIOLATION",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AdmissionReason::Allowed => "Welcome! Entry allowed.",
            AdmissionReason::MemberNotFound => "Member not found.",
            AdmissionReason::AlreadyCheckedInToday => "Already checked in today.",
            AdmissionReason::SubscriptionExpired => "Subscription has expired.",
            AdmissionReason::InactiveMember => "Membership is inactive.",
            AdmissionReason::AlternateDayViolation => {
                "Every-other-day plan: this member already visited yesterday."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmissionResult {
    pub allowed: bool,
    pub reason: AdmissionReason,
    pub member: Option<Member>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl AdmissionResult {
    fn denied(reason: AdmissionReason, member: Option<Member>) -> Self {
        Self {
            allowed: false,
            reason,
            member,
            checked_in_at: None,
        }
    }
}

/// Per-member mutual exclusion around the duplicate-check / insert
/// sequence. The database unique constraint on (member_id, day) is the
/// backstop when multiple processes share the store.
#[derive(Debug, Clone, Default)]
struct MemberLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl MemberLocks {
    fn for_member(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // An entry only the map still references belongs to a finished
        // admission; drop it so the registry stays bounded by the
        // number of in-flight scans.
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(id).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// The check-in admission engine. Holds no mutable state of its own;
/// the database is the single shared resource across concurrent calls.
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    pool: PgPool,
    local_time: LocalTime,
    notifier: WebhookNotifier,
    locks: MemberLocks,
}

impl AdmissionEngine {
    pub fn new(pool: PgPool, local_time: LocalTime, notifier: WebhookNotifier) -> Self {
        Self {
            pool,
            local_time,
            notifier,
            locks: MemberLocks::default(),
        }
    }

    /// Decides whether the scanned identifier may enter, and on ALLOW
    /// records the attendance row and emits a MEMBER_CHECKIN event.
    /// Storage faults propagate as errors; everything else is a
    /// definitive allow/deny.
    #[tracing::instrument(skip(self))]
    pub async fn admit(&self, raw_code: &str) -> Result<AdmissionResult, AdmissionError> {
        let code = raw_code.trim();

        let Some(member) = Member::find_by_code(&self.pool, code).await? else {
            tracing::info!(code, "Scan did not match any member");
            return Ok(AdmissionResult::denied(AdmissionReason::MemberNotFound, None));
        };

        // Serialize the check-then-write sequence per member so two
        // simultaneous scans cannot both pass the duplicate check.
        let lock = self.locks.for_member(member.id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let today = self.local_time.local_day(now);
        let (today_start, today_end) = self.local_time.day_bounds(today);

        let attended_today =
            Attendance::exists_in_range(&self.pool, member.id, today_start, today_end).await?;

        let latest = Subscription::latest_for_member(&self.pool, member.id).await?;

        // Yesterday's attendance only matters for the alternate-day plan.
        let attended_yesterday = if latest.as_ref().map(|s| s.plan) == Some(Plan::AlternateDay) {
            let (y_start, y_end) = self.local_time.day_bounds(today - Duration::days(1));
            Attendance::exists_in_range(&self.pool, member.id, y_start, y_end).await?
        } else {
            false
        };

        if let Err(reason) = evaluate(
            member.status,
            latest.as_ref(),
            now,
            attended_today,
            attended_yesterday,
        ) {
            tracing::info!(
                member_id = %member.id,
                reason = ?reason,
                "Admission denied"
            );
            return Ok(AdmissionResult::denied(reason, Some(member)));
        }

        // The recorder returns None when the unique constraint already
        // holds a row for this local day: another writer won the race.
        let Some(attendance) = Attendance::record(&self.pool, member.id, now, today).await? else {
            tracing::warn!(member_id = %member.id, "Duplicate check-in caught by constraint");
            return Ok(AdmissionResult::denied(
                AdmissionReason::AlreadyCheckedInToday,
                Some(member),
            ));
        };

        tracing::info!(
            member_id = %member.id,
            check_in = %attendance.check_in,
            "Admission allowed"
        );

        self.notifier.notify(WebhookEvent::MemberCheckin {
            member_id: member.id,
            member_name: member.full_name.clone(),
            check_in_time: attendance.check_in,
            formatted_time: self.local_time.format(attendance.check_in),
            plan: latest.map(|s| s.plan),
        });

        Ok(AdmissionResult {
            allowed: true,
            reason: AdmissionReason::Allowed,
            member: Some(member),
            checked_in_at: Some(attendance.check_in),
        })
    }
}

/// The eligibility rules, in fixed order; the first failing check wins.
/// The duplicate-today check runs before the expiration checks, so a
/// member who is both expired and already inside gets the duplicate
/// message.
fn evaluate(
    stored_status: MemberStatus,
    latest: Option<&Subscription>,
    now: DateTime<Utc>,
    attended_today: bool,
    attended_yesterday: bool,
) -> Result<(), AdmissionReason> {
    // 1. Once per calendar day, for every plan.
    if attended_today {
        return Err(AdmissionReason::AlreadyCheckedInToday);
    }

    // 2. Base eligibility. A valid subscription overrides a stale
    //    stored flag; an expired one denies regardless of the flag.
    match latest {
        Some(sub) if sub.end_date < now => return Err(AdmissionReason::SubscriptionExpired),
        Some(_) => {}
        None if stored_status != MemberStatus::Active => {
            return Err(AdmissionReason::InactiveMember)
        }
        None => {}
    }

    // 3. Alternate-day restriction.
    if latest.map(|s| s.plan) == Some(Plan::AlternateDay) && attended_yesterday {
        return Err(AdmissionReason::AlternateDayViolation);
    }

    Ok(())
}
