use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Twitter account used for session login
    pub twitter_email: String,
    pub twitter_username: String,
    pub twitter_password: String,

    // Session artifacts (browser cookie export, saved login session)
    pub session_dir: String,
    pub cache_search_session: bool,

    // OpenAI
    pub openai_api_key: String,

    // Search API server
    pub api_host: String,
    pub api_port: u16,
    pub cors_allowed_origins: Vec<String>,

    // Websearch server
    pub websearch_host: String,
    pub websearch_port: u16,
}

impl Config {
    /// Load configuration for the search API server.
    /// Panics with a clear message if required vars are missing.
    pub fn api_from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            twitter_email: required_env("TWITTER_EMAIL"),
            twitter_username: required_env("TWITTER_USERNAME"),
            twitter_password: required_env("TWITTER_PASSWORD"),
            session_dir: env::var("SESSION_DIR").unwrap_or_else(|_| ".".to_string()),
            cache_search_session: bool_env("CACHE_SEARCH_SESSION"),
            openai_api_key: String::new(),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
            cors_allowed_origins: origins_env(),
            websearch_host: String::new(),
            websearch_port: 0,
        }
    }

    /// Load a minimal config for the websearch server (no Twitter account needed).
    pub fn websearch_from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            twitter_email: String::new(),
            twitter_username: String::new(),
            twitter_password: String::new(),
            session_dir: String::new(),
            cache_search_session: false,
            openai_api_key: required_env("OPENAI_API_KEY"),
            api_host: String::new(),
            api_port: 0,
            cors_allowed_origins: Vec::new(),
            websearch_host: env::var("WEBSEARCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            websearch_port: env::var("WEBSEARCH_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("WEBSEARCH_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn bool_env(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

fn origins_env() -> Vec<String> {
    env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
