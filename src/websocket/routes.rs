use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;

use crate::config::ProtocolConfig;
use crate::server::{HealthStatus, PairServer, ServerConfig};

use super::handler::websocket_handler;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<PairServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Parse CORS origins
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint with registry aggregates
async fn health_check(State(server): State<Arc<PairServer>>) -> Json<HealthStatus> {
    Json(server.health_status().await)
}

/// Start the server with its background matching and cleanup loops
pub async fn run_server(
    addr: SocketAddr,
    server_config: ServerConfig,
    protocol_config: ProtocolConfig,
    cors_origins: String,
) -> anyhow::Result<()> {
    let server = PairServer::new(server_config, protocol_config);

    let matching_server = server.clone();
    tokio::spawn(async move {
        matching_server.matching_task().await;
    });
    let cleanup_server = server.clone();
    tokio::spawn(async move {
        cleanup_server.cleanup_task().await;
    });
    let sweep_server = server.clone();
    tokio::spawn(async move {
        sweep_server.sweep_task().await;
    });

    let app = create_router(&cors_origins).with_state(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting pairing server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
