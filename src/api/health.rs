//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

use crate::http::response::json_envelope;
use crate::http::server::AppState;

pub async fn healthcheck(State(state): State<AppState>) -> Response {
    json_envelope(
        StatusCode::OK,
        json!({
            "data": {
                "status": "available",
                "version": env!("CARGO_PKG_VERSION"),
                "environment": state.config.server.environment,
            }
        }),
    )
}
