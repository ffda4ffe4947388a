use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};

/// External text-generation service: system instruction + prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> Result<String>;
}

pub type SharedGenerator = Arc<dyn TextGenerator>;

/// Runs one generation call bounded by `timeout`.
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    system: &str,
    prompt: &str,
    temperature: f32,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, generator.generate(system, prompt, temperature)).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout(timeout)),
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Azure OpenAI chat-completions deployment.
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl AzureOpenAiClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.deployment,
            config.api_version
        );
        tracing::info!(deployment = %config.deployment, "Azure OpenAI client initialized");
        Ok(Self {
            http,
            url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for AzureOpenAiClient {
    async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature,
        };

        tracing::debug!(prompt_len = prompt.len(), "calling text generation");
        let response = self
            .http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| PipelineError::MalformedResponse(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PipelineError::MalformedResponse("response has no message content".to_string())
            })
    }
}
