use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::session::SESSION_KEY_ADMIN;

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    SessionError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required. Please log in.",
            )
                .into_response(),
            AuthError::SessionError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error occurred.").into_response()
            }
        }
    }
}

/// Middleware that requires an authenticated admin session.
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authenticated: Option<bool> = session
        .get(SESSION_KEY_ADMIN)
        .await
        .map_err(|_| AuthError::SessionError)?;

    if authenticated != Some(true) {
        return Err(AuthError::Unauthorized);
    }

    Ok(next.run(request).await)
}
