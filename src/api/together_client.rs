use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ChatModel;
use crate::models::Config;

/// Together.ai chat-completion client used for sector classification.
pub struct TogetherClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl TogetherClient {
    /// Create a new client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("bizval/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.together_api_key.clone(),
            model: config.together_model.clone(),
            base_url: config.together_base_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ChatModel for TogetherClient {
    /// One attempt, 30-second timeout, no retry. Failures are logged here
    /// and handled by the caller degrading to the default sector.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 50,
        };

        debug!("Making request to: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Together.ai API error: HTTP {}, Response: {}", status, error_text);
            return Err(anyhow!("chat completion failed with status {}", status));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| anyhow!("chat completion response contained no choices"))
    }
}
