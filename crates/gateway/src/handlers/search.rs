//! Keyword search handler

use axum::{
    extract::{Query, State},
    http::Method,
    response::Response,
};
use newsdesk_common::{
    activity::params_to_json,
    errors::Result,
    metrics,
    news::{Article, SortBy},
};
use serde::Serialize;
use std::collections::HashMap;

use crate::middleware::identity::Caller;
use crate::respond::RequestLog;
use crate::AppState;

/// Search response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub total_results: u64,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub articles: Vec<Article>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// `GET /search?query=&page=&pageSize=&sortBy=&language=`
pub async fn search(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let log = RequestLog::start(&Method::GET, "/search", params_to_json(&params));
    let outcome = run_search(&state, &caller, &params).await;
    log.finish(&state, outcome)
}

async fn run_search(
    state: &AppState,
    caller: &Caller,
    params: &HashMap<String, String>,
) -> Result<SearchResponse> {
    let query = state.validator.search(params)?;

    let pending = state.activity.search(&query.query, caller.user_id());

    let batch = match state.news.search(&query).await {
        Ok(batch) => batch,
        Err(e) => {
            pending.abandon();
            return Err(e);
        }
    };

    pending.complete(batch.articles.len() as u64);
    metrics::record_search(state.news.name(), batch.articles.len());

    tracing::debug!(
        results = batch.articles.len(),
        total = batch.total_results,
        sort_by = %query.sort_by,
        "Search completed"
    );

    Ok(SearchResponse {
        success: true,
        query: query.query,
        total_results: batch.total_results,
        page: query.page,
        page_size: query.page_size,
        sort_by: query.sort_by,
        articles: batch.articles,
        note: batch.note,
    })
}
