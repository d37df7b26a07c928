use axum::{routing::get, Router};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gymdesk::api::middleware::session::{create_session_layer, AppState};
use gymdesk::config::Config;
use gymdesk::services::admission::AdmissionEngine;
use gymdesk::services::localtime::LocalTime;
use gymdesk::services::webhook::WebhookNotifier;
use gymdesk::{api, db, jobs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gymdesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gymdesk server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create session layer
    let session_secret = config.session_secret.expose_secret().as_bytes();
    let session_layer = create_session_layer(pool.clone(), session_secret).await?;
    tracing::info!("Session layer initialized");

    let local_time = LocalTime::from_offset_hours(config.timezone_offset_hours)?;
    let notifier = WebhookNotifier::new(config.webhook_url.as_deref())?;
    let engine = Arc::new(AdmissionEngine::new(
        pool.clone(),
        local_time,
        notifier.clone(),
    ));

    // Nightly sweep folding expired subscriptions into the stored flag
    let scheduler = JobScheduler::new().await?;
    let sweep_pool = pool.clone();
    scheduler
        .add(Job::new_async("0 0 3 * * *", move |_id, _sched| {
            let pool = sweep_pool.clone();
            Box::pin(async move {
                if let Err(e) = jobs::status_sweep::deactivate_expired_members(&pool).await {
                    tracing::error!(error = %e, "Status sweep failed");
                }
            })
        })?)
        .await?;
    scheduler.start().await?;
    tracing::info!("Status sweep scheduled");

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        local_time,
        notifier,
        engine,
    };

    // Everything except /health and /login sits behind the admin session
    let protected = Router::new()
        .merge(api::members::router())
        .merge(api::checkin::router())
        .merge(api::attendance::router())
        .merge(api::reports::router())
        .route_layer(axum::middleware::from_fn(
            api::middleware::auth::require_auth,
        ));

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(api::auth::router())
        .merge(protected)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, cleaning up...");
}
