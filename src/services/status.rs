use chrono::{DateTime, Utc};

use crate::models::member::MemberStatus;
use crate::models::subscription::Subscription;

/// Effective status of a member at a given instant.
///
/// The current subscription's end date is the ground truth: unexpired
/// means ACTIVE, expired means INACTIVE, regardless of what the stored
/// flag says. Only when no subscription exists does the stored flag
/// stand. Re-evaluated on every read, never written back here.
pub fn resolve_status(
    stored: MemberStatus,
    latest_subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> MemberStatus {
    match latest_subscription {
        Some(sub) if sub.end_date >= now => MemberStatus::Active,
        Some(_) => MemberStatus::Inactive,
        None => stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::Plan;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn subscription(end_date: DateTime<Utc>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            plan: Plan::Daily,
            price: Plan::Daily.price(),
            start_date: end_date - Duration::days(30),
            end_date,
            created_at: end_date - Duration::days(30),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn unexpired_subscription_overrides_stale_inactive_flag() {
        let sub = subscription(now() + Duration::days(5));
        assert_eq!(
            resolve_status(MemberStatus::Inactive, Some(&sub), now()),
            MemberStatus::Active
        );
    }

    #[test]
    fn expired_subscription_overrides_stale_active_flag() {
        let sub = subscription(now() - Duration::seconds(1));
        assert_eq!(
            resolve_status(MemberStatus::Active, Some(&sub), now()),
            MemberStatus::Inactive
        );
    }

    #[test]
    fn end_date_equal_to_now_is_still_active() {
        let sub = subscription(now());
        assert_eq!(
            resolve_status(MemberStatus::Inactive, Some(&sub), now()),
            MemberStatus::Active
        );
    }

    #[test]
    fn stored_flag_stands_when_no_subscription_exists() {
        assert_eq!(
            resolve_status(MemberStatus::Inactive, None, now()),
            MemberStatus::Inactive
        );
        assert_eq!(
            resolve_status(MemberStatus::Active, None, now()),
            MemberStatus::Active
        );
    }
}
