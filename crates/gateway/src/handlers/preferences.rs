//! Preference handlers

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::Method,
    response::Response,
};
use newsdesk_common::{
    errors::{Result, ValidationError},
    news::Category,
    preferences::StatsReport,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::middleware::identity::Caller;
use crate::respond::RequestLog;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub success: bool,
    pub preferences: Vec<Category>,
    pub available_categories: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsReport,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub success: bool,
    pub message: &'static str,
    pub preferences: Vec<Category>,
}

/// `GET /preferences`, or aggregate stats with `?stats=true`
pub async fn get_preferences(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("stats").map(String::as_str) == Some("true") {
        let log = RequestLog::start(
            &Method::GET,
            "/preferences",
            json!({ "method": "GET", "stats": true }),
        );
        let stats = state.preferences.stats(caller.identity()).await;
        return log.finish(&state, Ok(StatsResponse { success: true, stats }));
    }

    let log = RequestLog::start(&Method::GET, "/preferences", json!({ "method": "GET" }));
    let preferences = state.preferences.get(caller.identity()).await;
    log.finish(
        &state,
        Ok(PreferencesResponse {
            success: true,
            preferences,
            available_categories: Category::names(),
        }),
    )
}

/// `POST /preferences` with `{"categories": [...]}`
pub async fn save_preferences(State(state): State<AppState>, caller: Caller, body: Bytes) -> Response {
    let mut log = RequestLog::start(&Method::POST, "/preferences", json!({ "method": "POST" }));

    let outcome = save(&state, &caller, &body).await;
    if let Ok(saved) = &outcome {
        log.set_params(json!({ "method": "POST", "categories": saved.preferences }));
    }

    log.finish(&state, outcome)
}

async fn save(state: &AppState, caller: &Caller, body: &[u8]) -> Result<SavedResponse> {
    let requested = parse_categories(body)?;
    let preferences = state.preferences.replace(caller.identity(), &requested).await?;

    Ok(SavedResponse {
        success: true,
        message: "Preferences saved successfully",
        preferences,
    })
}

/// Category names from a request body. A missing list reads as empty and
/// non-string entries are skipped.
fn parse_categories(body: &[u8]) -> std::result::Result<Vec<String>, ValidationError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;

    match payload.get("categories") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Some(_) => Err(ValidationError::CategoriesNotArray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories() {
        assert_eq!(
            parse_categories(br#"{"categories": ["sports", 3, null, "health"]}"#).unwrap(),
            ["sports", "health"]
        );
        assert!(parse_categories(br#"{"other": 1}"#).unwrap().is_empty());
        assert!(parse_categories(br#"["sports"]"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_categories_errors() {
        assert_eq!(
            parse_categories(b"{not json").unwrap_err(),
            ValidationError::InvalidJson
        );
        assert_eq!(parse_categories(b"").unwrap_err(), ValidationError::InvalidJson);
        assert_eq!(
            parse_categories(br#"{"categories": "sports"}"#).unwrap_err(),
            ValidationError::CategoriesNotArray
        );
        assert_eq!(
            parse_categories(br#"{"categories": {"a": "sports"}}"#).unwrap_err(),
            ValidationError::CategoriesNotArray
        );
    }
}
