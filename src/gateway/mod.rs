pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "admin-api")]
use axum::routing::post;

use crate::config::GatewayConfig;
use state::AppState;

/// Build the complete router: ledger API, optional admin routes, Swagger UI.
pub fn build_router(state: Arc<AppState>) -> Router {
    let fund_routes = Router::new()
        .route("/", get(handlers::list_funds).post(handlers::create_fund))
        .route("/{fund_id}", get(handlers::get_fund))
        .route("/{fund_id}/cap-table", get(handlers::get_cap_table))
        .route("/{fund_id}/cap-table/{owner}", get(handlers::get_ownership))
        .route(
            "/{fund_id}/transfers",
            get(handlers::list_transfers).post(handlers::create_transfer),
        );

    let app = Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/funds", fund_routes);

    // [SECURITY] Admin routes - only compiled when 'admin-api' feature is enabled.
    // Production builds MUST be compiled with `--no-default-features` to exclude this.
    #[cfg(feature = "admin-api")]
    let app = app.nest(
        "/internal",
        Router::new().route("/reset", post(handlers::reset_ledger)),
    );

    app.with_state(state)
        // Swagger UI is stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::document()))
}

/// Start HTTP Gateway server; returns when ctrl-c is received.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} (port already in use?)", addr))?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);
    #[cfg(feature = "admin-api")]
    tracing::warn!("admin-api enabled: POST /internal/reset deletes all ledger data");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Keep serving; the process can still be stopped externally
        std::future::pending::<()>().await;
    }
}
