use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::Config;
use crate::services::admission::AdmissionEngine;
use crate::services::localtime::LocalTime;
use crate::services::webhook::WebhookNotifier;

/// Session keys used in the application
pub const SESSION_KEY_ADMIN: &str = "admin_authenticated";

/// Creates the cookie-session layer backed by PostgreSQL. The secret is
/// reserved for cookie signing once the store grows that option.
pub async fn create_session_layer(
    pool: PgPool,
    _session_secret: &[u8],
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false) // behind a TLS-terminating proxy in production
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(7)));

    Ok(session_layer)
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub local_time: LocalTime,
    pub notifier: WebhookNotifier,
    pub engine: Arc<AdmissionEngine>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
