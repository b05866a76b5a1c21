mod backend;
mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use backend::{ScraperBackend, SearchBackend};
use birdsift_common::Config;
use xscrape_client::Credentials;

pub struct AppState {
    pub backend: Arc<dyn SearchBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("api=info".parse()?)
                .add_directive("xscrape_client=info".parse()?),
        )
        .init();

    let config = Config::api_from_env();

    let credentials = Credentials {
        email: config.twitter_email.clone(),
        username: config.twitter_username.clone(),
        password: config.twitter_password.clone(),
    };
    let backend = ScraperBackend::new(
        credentials,
        config.session_dir.clone(),
        config.cache_search_session,
    );
    let state = Arc::new(AppState {
        backend: Arc::new(backend),
    });

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .route("/search", post(rest::search))
        .route("/validate_search", post(rest::validate_search))
        .route("/health", get(rest::health))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        );

    let addr = format!("{}:{}", config.api_host, config.api_port);
    tracing::info!("Twitter search API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
