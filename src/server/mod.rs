pub mod handlers;
pub mod types;

use crate::{analysis::AnalysisService, config::Config, llm::OpenAiClient, Result};
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use handlers::AppState;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/analyze",
            get(handlers::status).post(handlers::analyze),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    info!(
        "Using {} provider with model {}",
        config.llm.provider, config.llm.model
    );

    let llm = Arc::new(OpenAiClient::new(config.llm.clone()));
    let analysis = AnalysisService::new(llm, &config.llm);

    let app_state = AppState {
        analysis: Arc::new(analysis),
    };

    let app = router(app_state, config.server.max_body_bytes);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
