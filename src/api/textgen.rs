use crate::core::config::AiConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Produces text for a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for an Ollama-style `/api/generate` endpoint
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateReply {
    pub response: String,
}

impl OllamaClient {
    pub fn new(endpoint: String, model: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    pub fn from_config(config: &AiConfig) -> Result<Self> {
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout),
        )
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut request = self.client.post(&self.endpoint).json(&GenerateBody {
            model: &self.model,
            prompt,
            stream: false,
        });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to text generation service")?;

        if !response.status().is_success() {
            bail!(
                "Text generation service returned error status: {}",
                response.status()
            );
        }

        let reply = response
            .json::<GenerateReply>()
            .await
            .context("Failed to parse JSON response from text generation service")?;

        Ok(reply.response)
    }
}
