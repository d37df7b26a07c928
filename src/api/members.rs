use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use chrono::{DateTime, Duration, Months, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::member::{CreateMemberData, Member, MemberStatus, RegistrationError};
use crate::models::subscription::{Plan, Subscription};
use crate::services::qr_badge::{self, BadgePayload};
use crate::services::status::resolve_status;
use crate::services::webhook::WebhookEvent;

/// Member as served to the dashboard: the status field carries the
/// effective status derived from the current subscription, not the
/// stored flag.
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub image_url: Option<String>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub latest_subscription: Option<Subscription>,
}

impl MemberView {
    fn new(member: Member, latest: Option<Subscription>, now: DateTime<Utc>) -> Self {
        let status = resolve_status(member.status, latest.as_ref(), now);
        Self {
            id: member.id,
            full_name: member.full_name,
            email: member.email,
            phone: member.phone,
            image_url: member.image_url,
            status,
            created_at: member.created_at,
            latest_subscription: latest,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub image_url: Option<String>,
    pub plan: Plan,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub image_url: Option<String>,
    pub plan: Option<Plan>,
}

#[derive(Debug, Deserialize)]
pub struct RenewRequest {
    pub plan: Plan,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct QrParams {
    pub format: Option<String>,
}

fn require_field(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} is required")));
    }
    Ok(())
}

/// One month out by default; the front desk can override both dates.
fn subscription_window(
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_date.unwrap_or_else(Utc::now);
    let end = end_date.unwrap_or_else(|| {
        start
            .checked_add_months(Months::new(1))
            .unwrap_or(start + Duration::days(30))
    });
    (start, end)
}

async fn list_members(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MemberView>>> {
    let query = params.query.unwrap_or_default();
    let members = Member::search(&state.pool, &query).await?;

    let now = Utc::now();
    let mut views = Vec::with_capacity(members.len());
    for member in members {
        let latest = Subscription::latest_for_member(&state.pool, member.id).await?;
        views.push(MemberView::new(member, latest, now));
    }

    Ok(Json(views))
}

async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MemberView>> {
    let member = Member::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
    let latest = Subscription::latest_for_member(&state.pool, member.id).await?;

    Ok(Json(MemberView::new(member, latest, Utc::now())))
}

async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<MemberView>)> {
    require_field(&request.full_name, "full_name")?;
    require_field(&request.phone, "phone")?;

    let (start_date, end_date) = subscription_window(request.start_date, request.end_date);

    let (member, subscription) = Member::create_with_subscription(
        &state.pool,
        CreateMemberData {
            full_name: request.full_name.trim().to_string(),
            email: request.email.filter(|e| !e.trim().is_empty()),
            phone: request.phone.trim().to_string(),
            image_url: request.image_url,
            plan: request.plan,
            start_date,
            end_date,
        },
    )
    .await
    .map_err(|e| match e {
        RegistrationError::DuplicatePhone { .. } => AppError::Validation(e.to_string()),
        RegistrationError::Database(e) => AppError::Database(e),
    })?;

    tracing::info!(member_id = %member.id, plan = request.plan.as_str(), "Member registered");

    state.notifier.notify(WebhookEvent::MemberCreated {
        full_name: member.full_name.clone(),
        phone: member.phone.clone(),
        plan: subscription.plan,
        price: subscription.price,
    });

    Ok((
        StatusCode::CREATED,
        Json(MemberView::new(member, Some(subscription), Utc::now())),
    ))
}

async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMemberRequest>,
) -> Result<Json<MemberView>> {
    require_field(&request.full_name, "full_name")?;
    require_field(&request.phone, "phone")?;

    let member = Member::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    if let Some(existing) = Member::find_by_phone(&state.pool, request.phone.trim()).await? {
        if existing.id != member.id {
            return Err(AppError::Validation(format!(
                "Phone number is already registered to {}",
                existing.full_name
            )));
        }
    }

    Member::update_profile(
        &state.pool,
        member.id,
        request.full_name.trim(),
        request.email.filter(|e| !e.trim().is_empty()),
        request.phone.trim(),
        request.image_url,
    )
    .await?;

    if let Some(plan) = request.plan {
        Subscription::update_current_plan(&state.pool, member.id, plan).await?;
    }

    let updated = Member::find_by_id(&state.pool, member.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
    let latest = Subscription::latest_for_member(&state.pool, member.id).await?;

    Ok(Json(MemberView::new(updated, latest, Utc::now())))
}

async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    Member::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    Member::delete(&state.pool, id).await?;
    tracing::info!(member_id = %id, "Member deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn renew_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenewRequest>,
) -> Result<Json<Subscription>> {
    let member = Member::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let (start_date, end_date) = subscription_window(request.start_date, request.end_date);

    let subscription =
        Subscription::renew(&state.pool, member.id, request.plan, start_date, end_date).await?;

    tracing::info!(
        member_id = %member.id,
        plan = request.plan.as_str(),
        end_date = %subscription.end_date,
        "Subscription renewed"
    );

    state.notifier.notify(WebhookEvent::SubscriptionRenewed {
        member_id: member.id,
        member_name: member.full_name,
        plan: subscription.plan,
        price: subscription.price,
        start_date: subscription.start_date,
        end_date: subscription.end_date,
    });

    Ok(Json(subscription))
}

/// Member badge QR: SVG by default, `?format=png` for a base64 PNG the
/// dashboard can embed directly.
async fn member_qr(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<QrParams>,
) -> Result<Response> {
    let member = Member::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let key = state.config.qr_signing_key.expose_secret().as_bytes();
    let payload = BadgePayload::new(member.id, member.full_name.clone())
        .signed(key)
        .map_err(|e| AppError::Internal(e.into()))?;

    match params.format.as_deref() {
        Some("png") => {
            let png = qr_badge::generate_png(&payload)
                .map_err(|e| AppError::Internal(e.into()))?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(png);
            Ok(Json(json!({ "qrcode_image": encoded })).into_response())
        }
        _ => {
            let svg = qr_badge::generate_svg(&payload)
                .map_err(|e| AppError::Internal(e.into()))?;
            Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/members/:id/renew", post(renew_subscription))
        .route("/members/:id/qr", get(member_qr))
}
