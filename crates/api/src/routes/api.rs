use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::Row;
use tracing::warn;

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/signals", get(get_signals))
        .route("/api/hotzones", get(get_hotzones))
        .route("/api/hotzones/reset", post(reset_hotzone))
        .route("/api/observations", get(get_observations))
}

// ─── Signals ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SignalsQuery {
    page: Option<i64>,
    limit: Option<i64>,
    symbol: Option<String>,
    strategy: Option<String>,
}

async fn get_signals(
    State(state): State<AppState>,
    Query(q): Query<SignalsQuery>,
) -> Json<Value> {
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(50).clamp(1, 200);
    let offset = (page - 1) * limit;

    let mut sql = String::from(
        "SELECT id, symbol, strategy, side, payload, produced_at_ms FROM signals",
    );
    let mut clauses = Vec::new();
    if q.symbol.is_some() {
        clauses.push("symbol = ?");
    }
    if q.strategy.is_some() {
        clauses.push("strategy = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY produced_at_ms DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query(&sql);
    if let Some(symbol) = &q.symbol {
        query = query.bind(symbol);
    }
    if let Some(strategy) = &q.strategy {
        query = query.bind(strategy);
    }
    query = query.bind(limit).bind(offset);

    let rows = query.fetch_all(&state.db).await.unwrap_or_else(|e| {
        warn!(error = %e, "signals query failed");
        Vec::new()
    });

    let signals: Vec<Value> = rows
        .iter()
        .map(|row| {
            let payload: String = row.get("payload");
            json!({
                "id": row.get::<String, _>("id"),
                "symbol": row.get::<String, _>("symbol"),
                "strategy": row.get::<String, _>("strategy"),
                "side": row.get::<String, _>("side"),
                "payload": serde_json::from_str::<Value>(&payload).unwrap_or(Value::Null),
                "produced_at_ms": row.get::<i64, _>("produced_at_ms"),
            })
        })
        .collect();

    Json(json!({
        "page": page,
        "limit": limit,
        "signals": signals,
    }))
}

// ─── Hot zones ───────────────────────────────────────────────────────────────

async fn get_hotzones(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.signal_engine.hot_zone_snapshot().await;
    let zones: Vec<Value> = snapshot
        .iter()
        .map(|(symbol, hz)| {
            json!({
                "symbol": symbol,
                "anchor": hz.anchor,
                "hottest": hz.hottest,
                "high_sum": hz.high_sum,
                "low_sum": hz.low_sum,
            })
        })
        .collect();

    Json(json!({ "hotzones": zones }))
}

#[derive(Deserialize)]
struct ResetQuery {
    symbol: String,
}

async fn reset_hotzone(
    State(state): State<AppState>,
    Query(q): Query<ResetQuery>,
) -> (StatusCode, Json<Value>) {
    let cleared = state.signal_engine.reset_hot_zone(&q.symbol).await;
    if cleared {
        (StatusCode::OK, Json(json!({ "reset": q.symbol })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no hot-zone state for '{}'", q.symbol) })),
        )
    }
}

// ─── Observations ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ObservationsQuery {
    symbol: String,
    /// Lookback window in seconds (default one hour).
    window_secs: Option<i64>,
}

async fn get_observations(
    State(state): State<AppState>,
    Query(q): Query<ObservationsQuery>,
) -> Json<Value> {
    let window_secs = q.window_secs.unwrap_or(3_600).max(0);
    let since_ms = chrono::Utc::now().timestamp_millis() - window_secs * 1_000;

    let observations = state
        .signal_engine
        .recent_observations(&q.symbol, since_ms)
        .await;

    Json(json!({
        "symbol": q.symbol,
        "observations": observations,
    }))
}
