use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::services::reporting::{self, DashboardStats, MonthlyReportStats};

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    let stats = reporting::dashboard_stats(&state.pool, &state.local_time).await?;
    Ok(Json(stats))
}

async fn monthly(State(state): State<AppState>) -> Result<Json<MonthlyReportStats>> {
    let stats = reporting::monthly_report(&state.pool, &state.local_time).await?;
    Ok(Json(stats))
}

/// Builds the current month's report and pushes it to the webhook
/// endpoint (best-effort); the stats come back to the caller either way.
async fn send_monthly(State(state): State<AppState>) -> Result<Json<MonthlyReportStats>> {
    let stats =
        reporting::send_monthly_report(&state.pool, &state.local_time, &state.notifier).await?;
    Ok(Json(stats))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/dashboard", get(dashboard))
        .route("/reports/monthly", get(monthly))
        .route("/reports/monthly/send", post(send_monthly))
}
