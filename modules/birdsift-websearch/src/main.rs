//! HTTP wrapper around a web-search-capable chat model. One endpoint takes
//! a query, the hosted model searches the web and answers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use birdsift_common::Config;
use openai_client::{ChatMessage, ChatRequest, OpenAiClient, WebSearchOptions};

const SEARCH_MODEL: &str = "gpt-4o-search-preview";
const MAX_ANSWER_TOKENS: u32 = 1024;

struct AppState {
    client: OpenAiClient,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
}

/// Chat request for one web search. Search-preview models reject the
/// temperature knob, so it stays unset.
fn search_request(query: &str) -> ChatRequest {
    ChatRequest {
        model: SEARCH_MODEL.to_string(),
        messages: vec![ChatMessage::user(query)],
        max_tokens: Some(MAX_ANSWER_TOKENS),
        temperature: None,
        web_search_options: Some(WebSearchOptions::default()),
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    tracing::info!(query = %request.query, "websearch: received query");

    let answer = match state.client.chat(&search_request(&request.query)).await {
        Ok(response) => response.content().map(str::to_string),
        Err(e) => return failure(e.into()),
    };

    match answer {
        Some(content) => Json(json!({"result": content})).into_response(),
        None => failure(anyhow::anyhow!("model returned no choices")),
    }
}

fn failure(e: anyhow::Error) -> Response {
    tracing::error!(error = ?e, "websearch failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("websearch=info".parse()?)
                .add_directive("openai_client=info".parse()?),
        )
        .init();

    let config = Config::websearch_from_env();
    let state = Arc::new(AppState {
        client: OpenAiClient::new(&config.openai_api_key),
    });

    let app = Router::new()
        .route("/search", post(search))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        );

    let addr = format!("{}:{}", config.websearch_host, config.websearch_port);
    tracing::info!("Web search API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
