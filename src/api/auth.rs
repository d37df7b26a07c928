use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;

use crate::api::middleware::session::{AppState, SESSION_KEY_ADMIN};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    let credentials_ok = request.username == state.config.admin_username
        && request.password == *state.config.admin_password.expose_secret();

    if !credentials_ok {
        tracing::warn!(username = %request.username, "Failed login attempt");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid username or password" })),
        );
    }

    if session.insert(SESSION_KEY_ADMIN, true).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Session error occurred" })),
        );
    }

    tracing::info!(username = %request.username, "Admin logged in");
    (StatusCode::OK, Json(json!({ "message": "Logged in" })))
}

async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.delete().await;
    (StatusCode::OK, Json(json!({ "message": "Logged out" })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}
