mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{EngineState, RunMode, SignalRecord};
use signal::SignalEngine;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub engine_state: Arc<RwLock<EngineState>>,
    pub run_mode: RunMode,
    pub dashboard_token: String,
    /// Live feed of emitted signal records for WebSocket subscribers.
    pub signal_tx: broadcast::Sender<SignalRecord>,
    /// The signal engine, for live hot-zone and observation snapshots.
    pub signal_engine: Arc<SignalEngine>,
}

/// Build and run the Axum API server.
pub async fn serve(state: AppState, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    let protected = routes::api_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    let app = Router::new()
        .merge(protected)
        .merge(routes::ws_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors);

    info!(%addr, "Dashboard API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
