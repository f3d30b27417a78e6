//! Duet API server entry point.

use std::sync::Arc;

use duet_api::config::AppConfig;
use duet_api::error::AppError;
use duet_api::state::AppState;
use duet_api::telemetry;
use duet_core::clock::SystemClock;
use duet_core::turn::ThreadTag;
use duet_narrator::{GeminiNarrator, NarratorPair};
use duet_store::pg_session_repository::PgSessionRepository;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting Duet API server");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    duet_store::migrate(&pool).await?;

    // Both narrators share one connection pool.
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| AppError::Config(format!("cannot build HTTP client: {e}")))?;
    let narrators = NarratorPair::new(
        Arc::new(GeminiNarrator::new(
            config.narrator_config(ThreadTag::A),
            http.clone(),
        )),
        Arc::new(GeminiNarrator::new(config.narrator_config(ThreadTag::B), http)),
    );

    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgSessionRepository::new(pool)),
        narrators,
        config.narrator_timeout,
    );
    let app = duet_api::app(app_state);

    let addr = config.bind_addr()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            error!(error = %e, "failed to flush spans");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
    }
    info!("Shutting down");
}
