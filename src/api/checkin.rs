use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::member::Member;
use crate::services::admission::AdmissionResult;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<ScanMemberView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ScanMemberView {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub image_url: Option<String>,
}

impl From<Member> for ScanMemberView {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            full_name: member.full_name,
            phone: member.phone,
            image_url: member.image_url,
        }
    }
}

impl From<AdmissionResult> for ScanResponse {
    fn from(result: AdmissionResult) -> Self {
        Self {
            success: result.allowed,
            reason: result.reason.code().to_string(),
            message: result.reason.message().to_string(),
            member: result.member.map(ScanMemberView::from),
            checked_in_at: result.checked_in_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CandidateParams {
    pub query: String,
}

/// The scanner endpoint. Policy denials and not-found come back as
/// definitive deny responses; only unexpected storage faults map to the
/// generic SYSTEM_ERROR denial.
async fn scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Json<ScanResponse> {
    match state.engine.admit(&request.code).await {
        Ok(result) => Json(ScanResponse::from(result)),
        Err(e) => {
            tracing::error!(error = %e, "Admission failed with a system error");
            Json(ScanResponse {
                success: false,
                reason: "SYSTEM_ERROR".to_string(),
                message: "System error, please try again.".to_string(),
                member: None,
                checked_in_at: None,
            })
        }
    }
}

/// Optional pre-step for the front desk: fuzzy name/phone search that
/// returns candidates for the operator to pick from before re-invoking
/// the single-identifier scan.
async fn search_candidates(
    State(state): State<AppState>,
    Query(params): Query<CandidateParams>,
) -> Result<Json<Vec<ScanMemberView>>> {
    let members = Member::search_candidates(&state.pool, params.query.trim(), 10).await?;
    Ok(Json(members.into_iter().map(ScanMemberView::from).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkin", post(scan))
        .route("/checkin/search", get(search_candidates))
}
