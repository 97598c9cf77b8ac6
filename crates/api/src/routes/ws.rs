use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::warn;

use common::SignalRecord;

use crate::AppState;

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/ws/signals", get(ws_signals_handler))
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// WebSocket endpoint that pushes every emitted signal record to
/// subscribers as JSON. Auth via query param `?token=<DASHBOARD_TOKEN>`
/// (header auth not supported in browser WebSocket API).
async fn ws_signals_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
) -> Response {
    let authed = q
        .token
        .as_deref()
        .map(|t| t == state.dashboard_token)
        .unwrap_or(false);

    if !authed {
        return axum::response::IntoResponse::into_response((
            axum::http::StatusCode::UNAUTHORIZED,
            "unauthorized",
        ));
    }

    let signal_rx = state.signal_tx.subscribe();
    ws.on_upgrade(move |socket| handle_ws(socket, signal_rx))
}

async fn handle_ws(
    mut socket: WebSocket,
    mut signal_rx: tokio::sync::broadcast::Receiver<SignalRecord>,
) {
    loop {
        match signal_rx.recv().await {
            Ok(record) => {
                let text = match serde_json::to_string(&record) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize signal record");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(dropped = n, "WebSocket signal client lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                break;
            }
        }
    }
}
