use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use tably_core::config::Settings;
use tably_core::errors::ChatError;

use crate::provider::{CompletionProvider, TokenStream};
use crate::relay::TokenRelay;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: CompletionMessage,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completion backend. Completion calls do not
/// go through the retrying client: replaying a partially-streamed
/// completion would duplicate output, so failures surface directly.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Result<Self, ChatError> {
        if api_key.expose_secret().is_empty() {
            return Err(ChatError::Configuration(
                "completion API key is not set".to_string(),
            ));
        }

        Ok(Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .map_err(|e| ChatError::Configuration(format!("HTTP client: {e}")))?,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ChatError> {
        Self::new(
            settings.completion_base_url.clone(),
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
        )
    }

    fn request_body(&self, system: &str, user: &str, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "stream": stream,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        })
    }

    async fn send(&self, body: serde_json::Value) -> Result<reqwest::Response, ChatError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String, ChatError> {
        let response = self.send(self.request_body(system, user, false)).await?;
        let payload: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("invalid completion payload: {e}")))?;

        Ok(payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn stream(&self, system: &str, user: &str) -> Result<TokenStream, ChatError> {
        let response = self.send(self.request_body(system, user, true)).await?;
        Ok(Box::pin(TokenRelay::new(response.bytes_stream())))
    }
}
