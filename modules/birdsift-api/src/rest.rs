use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use birdsift_parser::{extract_tweet_info, TweetInfo};
use xscrape_client::SearchInput;

use crate::AppState;

const NO_QUERIES_ERROR: &str = "No queries provided. Use either 'queries' or 'query' field.";

fn default_category() -> String {
    "Latest".to_string()
}

fn default_limit() -> u32 {
    10
}

fn default_retries() -> u32 {
    7
}

/// One search in a request. `limit` and `retries` ride along on every query
/// but only the first query's values drive the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default = "default_category")]
    pub category: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

/// Search request body. `query` is the legacy spelling of `queries`, kept
/// for existing clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub queries: Option<Vec<SearchQuery>>,
    pub query: Option<Vec<SearchQuery>>,
}

impl SearchRequest {
    /// The queries, regardless of which field carried them.
    pub fn queries(&self) -> &[SearchQuery] {
        if let Some(queries) = &self.queries {
            return queries;
        }
        if let Some(queries) = &self.query {
            return queries;
        }
        &[]
    }

    pub fn field_used(&self) -> &'static str {
        if self.queries.is_some() {
            "queries"
        } else if self.query.is_some() {
            "query"
        } else {
            "none"
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total_results: usize,
    pub tweets: Vec<TweetInfo>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let queries = request.queries();
    info!(
        count = queries.len(),
        field = request.field_used(),
        "search: received request"
    );

    if queries.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": NO_QUERIES_ERROR})),
        )
            .into_response();
    }

    let inputs: Vec<SearchInput> = queries
        .iter()
        .map(|q| SearchInput {
            category: q.category.clone(),
            query: q.query.clone(),
        })
        .collect();
    // Limit and retries come from the first query; the request format has
    // always worked this way.
    let limit = queries[0].limit;
    let retries = queries[0].retries;

    let backend = state.backend.clone();
    let joined =
        tokio::task::spawn_blocking(move || backend.run_search(&inputs, limit, retries)).await;

    let batches = match joined {
        Ok(Ok(batches)) => batches,
        Ok(Err(e)) => return search_failure(e),
        Err(e) => return search_failure(e.into()),
    };

    let tweets: Vec<TweetInfo> = batches
        .iter()
        .flatten()
        .map(extract_tweet_info)
        .filter(|t| t.tweet_id != "unknown")
        .collect();

    info!(total = tweets.len(), "search: completed");
    Json(SearchResponse {
        total_results: tweets.len(),
        tweets,
    })
    .into_response()
}

/// 500 with the failure text in the body. The full chain goes to the log
/// only.
fn search_failure(e: anyhow::Error) -> Response {
    error!(error = ?e, "search failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": format!("Error during Twitter search: {e}")})),
    )
        .into_response()
}

/// Dry-run parser for request bodies. Reports how the body would be read
/// without running anything.
pub async fn validate_search(Json(body): Json<Value>) -> Json<Value> {
    match serde_json::from_value::<SearchRequest>(body.clone()) {
        Ok(parsed) => {
            let queries_found = parsed.queries().len();
            let field_used = parsed.field_used();
            Json(serde_json::json!({
                "valid": true,
                "parsed_request": parsed,
                "queries_found": queries_found,
                "field_used": field_used,
            }))
        }
        Err(e) => Json(serde_json::json!({
            "valid": false,
            "error": e.to_string(),
            "request_received": body,
        })),
    }
}

pub async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}
