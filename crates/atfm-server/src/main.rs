//! ATFM session server: hosts one simulation session for a UI.

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atfm_server::config::Config;
use atfm_server::state::AppState;
use atfm_server::{api, loader, loops};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atfm_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting ATFM session server...");

    let config = Config::from_env();
    let port = config.server_port;
    let state = Arc::new(AppState::new(config.clone())?);
    loader::load_configured(&state, &config).await?;
    tracing::info!("Analytics backend at {}", state.client().base_url());

    tokio::spawn(loops::tick_loop::run_tick_loop(state.clone()));
    tokio::spawn(loops::hotspot_loop::run_hotspot_loop(state.clone()));

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
