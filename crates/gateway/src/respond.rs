//! Response assembly
//!
//! Every endpoint funnels its outcome through [`RequestLog::finish`], which
//! renders the success body or error envelope and emits exactly one usage
//! log entry and one request metric.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use newsdesk_common::{activity::UsageLogEntry, errors::Result, metrics::RequestMetrics};
use serde::Serialize;
use serde_json::Value;

use crate::AppState;

/// Bookkeeping for one in-flight request
pub struct RequestLog {
    endpoint: &'static str,
    params: Value,
    metrics: RequestMetrics,
}

impl RequestLog {
    /// `params` must already be redacted
    pub fn start(method: &Method, endpoint: &'static str, params: Value) -> Self {
        Self {
            endpoint,
            params,
            metrics: RequestMetrics::start(method.as_str(), endpoint),
        }
    }

    /// Replace the parameters recorded in the usage log
    pub fn set_params(&mut self, params: Value) {
        self.params = params;
    }

    pub fn finish<T: Serialize>(self, state: &AppState, outcome: Result<T>) -> Response {
        let response = match outcome {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(err) => {
                if err.is_server_error() {
                    tracing::error!(
                        error = %err,
                        code = ?err.code(),
                        endpoint = self.endpoint,
                        "Request failed"
                    );
                } else {
                    tracing::warn!(
                        error = %err,
                        code = ?err.code(),
                        endpoint = self.endpoint,
                        "Request rejected"
                    );
                }
                let envelope = err.envelope(state.config.app.debug, self.endpoint);
                (err.status_code(), Json(envelope)).into_response()
            }
        };

        let status = response.status().as_u16();
        state.activity.usage(UsageLogEntry {
            endpoint: self.endpoint.to_string(),
            params: self.params,
            status,
            elapsed_ms: self.metrics.elapsed_ms(),
        });
        self.metrics.finish(status);

        response
    }
}
