//! Top headlines handler

use axum::{
    extract::{Query, State},
    http::Method,
    response::Response,
};
use newsdesk_common::{
    activity::params_to_json,
    errors::Result,
    news::{Article, Category},
};
use serde::Serialize;
use std::collections::HashMap;

use crate::respond::RequestLog;
use crate::AppState;

/// Headlines response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlinesResponse {
    pub success: bool,
    pub category: Category,
    pub total_results: u64,
    pub page: u32,
    pub page_size: u32,
    pub articles: Vec<Article>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// `GET /headlines?category=&page=&pageSize=`
pub async fn headlines(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let log = RequestLog::start(&Method::GET, "/headlines", params_to_json(&params));
    let outcome = fetch_headlines(&state, &params).await;
    log.finish(&state, outcome)
}

async fn fetch_headlines(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<HeadlinesResponse> {
    let query = state.validator.headlines(params)?;

    tracing::debug!(
        category = %query.category,
        page = query.page,
        page_size = query.page_size,
        source = state.news.name(),
        "Fetching headlines"
    );

    let batch = state.news.headlines(&query).await?;

    Ok(HeadlinesResponse {
        success: true,
        category: query.category,
        total_results: batch.total_results,
        page: query.page,
        page_size: query.page_size,
        articles: batch.articles,
        note: batch.note,
    })
}
