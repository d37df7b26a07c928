use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::models::subscription::Plan;

/// Structured events emitted to the external webhook endpoint.
/// Serialized with a top-level `event_type` tag and camelCase payload
/// fields, matching what the downstream automation expects.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookEvent {
    #[serde(rename_all = "camelCase")]
    MemberCreated {
        full_name: String,
        phone: String,
        plan: Plan,
        price: i64,
    },
    #[serde(rename_all = "camelCase")]
    SubscriptionRenewed {
        member_id: Uuid,
        member_name: String,
        plan: Plan,
        price: i64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    MemberCheckin {
        member_id: Uuid,
        member_name: String,
        check_in_time: DateTime<Utc>,
        formatted_time: String,
        plan: Option<Plan>,
    },
    #[serde(rename_all = "camelCase")]
    MonthlyReport {
        report_month: String,
        new_members: i64,
        total_revenue: i64,
        subscription_count: i64,
        total_visits: i64,
        report_date: DateTime<Utc>,
    },
}

impl WebhookEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WebhookEvent::MemberCreated { .. } => "MEMBER_CREATED",
            WebhookEvent::SubscriptionRenewed { .. } => "SUBSCRIPTION_RENEWED",
            WebhookEvent::MemberCheckin { .. } => "MEMBER_CHECKIN",
            WebhookEvent::MonthlyReport { .. } => "MONTHLY_REPORT",
        }
    }
}

/// Best-effort dispatcher. Failures are logged and swallowed, never
/// retried, and never surface to the caller's success path.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(endpoint: Option<&str>) -> anyhow::Result<Self> {
        let endpoint = endpoint.map(Url::parse).transpose()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Fire-and-forget: spawns the delivery so the caller never waits
    /// on the webhook endpoint.
    pub fn notify(&self, event: WebhookEvent) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&event).await {
                tracing::warn!(
                    event_type = event.event_type(),
                    error = %e,
                    "Webhook delivery failed"
                );
            }
        });
    }

    /// One delivery attempt. Exposed separately so tests can await it.
    pub async fn send(&self, event: &WebhookEvent) -> anyhow::Result<()> {
        let Some(endpoint) = &self.endpoint else {
            tracing::debug!(
                event_type = event.event_type(),
                "Webhook endpoint not configured, skipping"
            );
            return Ok(());
        };

        let body = Self::envelope(event, Utc::now())?;

        let response = self
            .client
            .post(endpoint.clone())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook endpoint returned {}", response.status());
        }

        tracing::debug!(event_type = event.event_type(), "Webhook delivered");
        Ok(())
    }

    /// Flat JSON object: event_type tag, ISO-8601 timestamp, payload.
    fn envelope(event: &WebhookEvent, at: DateTime<Utc>) -> anyhow::Result<serde_json::Value> {
        let mut body = serde_json::to_value(event)?;
        let map = body
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("event did not serialize to an object"))?;
        map.insert(
            "timestamp".to_string(),
            serde_json::Value::String(at.to_rfc3339()),
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn checkin_event_envelope_shape() {
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let event = WebhookEvent::MemberCheckin {
            member_id: Uuid::new_v4(),
            member_name: "Alisher Karimov".to_string(),
            check_in_time: at,
            formatted_time: "10.03.2026 17:00".to_string(),
            plan: Some(Plan::AlternateDay),
        };

        let body = WebhookNotifier::envelope(&event, at).unwrap();
        assert_eq!(body["event_type"], "MEMBER_CHECKIN");
        assert_eq!(body["memberName"], "Alisher Karimov");
        assert_eq!(body["formattedTime"], "10.03.2026 17:00");
        assert_eq!(body["plan"], "ALTERNATE_DAY");
        assert_eq!(body["timestamp"], at.to_rfc3339());
    }

    #[test]
    fn monthly_report_envelope_shape() {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
        let event = WebhookEvent::MonthlyReport {
            report_month: "March 2026".to_string(),
            new_members: 14,
            total_revenue: 6_150_000,
            subscription_count: 17,
            total_visits: 412,
            report_date: at,
        };

        let body = WebhookNotifier::envelope(&event, at).unwrap();
        assert_eq!(body["event_type"], "MONTHLY_REPORT");
        assert_eq!(body["reportMonth"], "March 2026");
        assert_eq!(body["totalRevenue"], 6_150_000);
        assert_eq!(body["totalVisits"], 412);
    }

    #[tokio::test]
    async fn unconfigured_endpoint_is_a_silent_skip() {
        let notifier = WebhookNotifier::new(None).unwrap();
        let event = WebhookEvent::MemberCreated {
            full_name: "Malika Azimova".to_string(),
            phone: "+998901234567".to_string(),
            plan: Plan::Daily,
            price: Plan::Daily.price(),
        };
        // No endpoint: send resolves Ok without any I/O.
        assert!(notifier.send(&event).await.is_ok());
    }
}
