use crate::core::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionClient, ConfigProvider};
use crate::utils::error::{RelayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "minimax/minimax-m2:free";
pub const DEFAULT_REFERER: &str = "http://localhost";
pub const DEFAULT_TITLE: &str = "Integration Demo";

/// Chat completions client for OpenRouter (or any endpoint speaking the same
/// protocol). One request per call, no retries.
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds() {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.api_endpoint().to_string(),
            api_key: config.api_key().to_string(),
            model: config.model().to_string(),
            referer: config.referer().to_string(),
            title: config.title().to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, system_prompt: &str, user_prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
        }
    }

    fn first_choice_text(body: ChatCompletionResponse) -> Result<String> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::MalformedResponse {
                message: "No choices in completion response".to_string(),
            })?;

        choice.message.content.ok_or_else(|| RelayError::MalformedResponse {
            message: "First choice has no message content".to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = self.build_request(system_prompt, user_prompt);

        tracing::debug!("Making completion request to: {} (model {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Completion response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| RelayError::MalformedResponse {
                message: format!(
                    "{} - Body: {}",
                    e,
                    text.chars().take(500).collect::<String>()
                ),
            })?;

        Self::first_choice_text(parsed)
    }
}
