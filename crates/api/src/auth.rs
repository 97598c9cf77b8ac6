use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

/// Middleware enforcing token authentication on the protected routes.
///
/// Accepts either `Authorization: Bearer <token>` or the plain
/// `X-Dashboard-Token` header (handy for curl and ops scripts).
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if presented_token(&headers) == Some(state.dashboard_token.as_str()) {
        return next.run(request).await;
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
        .into_response()
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    bearer.or_else(|| {
        headers
            .get("X-Dashboard-Token")
            .and_then(|v| v.to_str().ok())
    })
}
