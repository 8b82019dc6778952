//! API handlers module

pub mod headlines;
pub mod health;
pub mod preferences;
pub mod search;

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use newsdesk_common::errors::AppError;
use serde_json::json;

use crate::respond::RequestLog;
use crate::AppState;

/// Answer `OPTIONS` when no CORS layer intercepted it
pub async fn preflight() -> Response {
    StatusCode::OK.into_response()
}

/// Any method a route does not serve
pub async fn method_not_allowed(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let endpoint = match uri.path() {
        "/headlines" => "/headlines",
        "/search" => "/search",
        "/preferences" => "/preferences",
        _ => "unknown",
    };
    let log = RequestLog::start(&method, endpoint, json!({ "method": method.as_str() }));
    log.finish::<()>(&state, Err(AppError::MethodNotAllowed))
}
