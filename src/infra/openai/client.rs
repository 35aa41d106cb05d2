use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::fetch::auth::ApiKey;
use crate::fetch::{self, BasicClient};
use crate::services::chat_api::{ChatApi, Message};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat client for OpenAI-compatible `/v1/chat/completions` endpoints.
pub struct OpenAiChat {
    client: ApiKey<BasicClient>,
    base_url: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Result<Self> {
        let inner = BasicClient::with_timeout(Duration::from_secs(60))?;
        Ok(Self {
            client: ApiKey::bearer(inner, api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    /// Returns `Ok(None)` when no key is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(api_key) = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
        else {
            return Ok(None);
        };
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Some(Self::new(&api_key, &base_url, &model)?))
    }
}

/// Pulls the first choice's text out of a completion payload.
fn extract_reply(body: &[u8]) -> Result<String, QueryError> {
    let parsed: CompletionResponse = serde_json::from_slice(body)
        .map_err(|e| QueryError::UpstreamApi(format!("unexpected response shape: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| QueryError::UpstreamApi("response contained no message".to_string()))
}

#[async_trait]
impl ChatApi for OpenAiChat {
    #[tracing::instrument(skip_all, fields(model = %self.model, turns = messages.len()))]
    async fn complete(&self, messages: &[Message]) -> Result<String, QueryError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = fetch::post_json(&self.client, &url, &request)
            .await
            .map_err(|e| QueryError::UpstreamApi(format!("failed to send request: {e:#}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| QueryError::UpstreamApi(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            warn!(%status, "Chat API returned an error status");
            return Err(QueryError::UpstreamApi(format!(
                "API returned status {}: {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        debug!(bytes = body.len(), "Chat API response received");
        extract_reply(&body)
    }
}
