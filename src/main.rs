// src/main.rs
// Prompt Workbench HTTP service entrypoint.

use std::sync::Arc;

use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prompt_workbench::api::http::{health_check, liveness_check, readiness_check, workbench_router};
use prompt_workbench::{AppState, CONFIG};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(CONFIG.logging.filter.clone()))
        .init();

    info!("starting prompt workbench on {}", CONFIG.bind_address());

    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.database.max_connections)
        .connect(&CONFIG.database.url)
        .await?;
    info!("database connected: {}", CONFIG.database.url);

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations applied");

    let state = Arc::new(AppState::new(pool).await?);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(CONFIG.bind_address()).await?;
    info!("listening on {}", CONFIG.bind_address());
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route("/ready", axum::routing::get(readiness_check))
        .route("/live", axum::routing::get(liveness_check))
        .merge(workbench_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
