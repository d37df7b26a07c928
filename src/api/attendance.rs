use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::attendance::{Attendance, AttendanceWithMember};

#[derive(Debug, Deserialize)]
pub struct AttendanceParams {
    /// Local calendar day (YYYY-MM-DD); defaults to today.
    pub date: Option<NaiveDate>,
}

async fn list_attendance(
    State(state): State<AppState>,
    Query(params): Query<AttendanceParams>,
) -> Result<Json<Vec<AttendanceWithMember>>> {
    let day = params
        .date
        .unwrap_or_else(|| state.local_time.local_day(Utc::now()));
    let (from, to) = state.local_time.day_bounds(day);

    let rows = Attendance::list_in_range(&state.pool, from, to).await?;
    Ok(Json(rows))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/attendance", get(list_attendance))
}
