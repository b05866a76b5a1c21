pub mod error;
pub mod types;

pub use error::{OpenAiError, Result};
pub use types::{ChatMessage, ChatRequest, ChatResponse, WebSearchOptions};

use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (local test servers).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "openai: chat request");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_to_the_public_api() {
        let client = OpenAiClient::new("sk-test");
        assert_eq!(client.base_url, OPENAI_API_URL);
    }

    #[test]
    fn base_url_can_be_overridden() {
        let client = OpenAiClient::new("sk-test").with_base_url("http://localhost:9000");
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
