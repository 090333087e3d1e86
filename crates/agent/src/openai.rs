use std::time::{Duration, Instant};

use async_trait::async_trait;
use gpfolio_core::config::LlmConfig;
use gpfolio_core::ChatMessage;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .user_agent(concat!("gpfolio/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: completions_endpoint(&config.base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim().trim_end_matches('/'))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        debug!(
            event_name = "llm.request.sent",
            purpose = request.purpose.as_str(),
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "sending chat completion request"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        debug!(
            event_name = "llm.response.received",
            purpose = request.purpose.as_str(),
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = text.len(),
            "chat completion response received"
        );

        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), body: text });
        }

        parse_completion(&text)
    }
}

fn parse_completion(raw: &str) -> Result<String, LlmError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(raw).map_err(|error| LlmError::Decode(error.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(LlmError::Api(error.message));
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::EmptyResponse)
}
