use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::TextCompletion;
use super::CompletionError;
use crate::config::AdvisorConfig;

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    system: Option<String>,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CompletionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            system: None,
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AdvisorConfig) -> Result<Self, CompletionError> {
        Self::new(&config.ollama_url, &config.model, config.timeout_secs)
    }

    /// Attach a system prompt sent with every request.
    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(system.to_string());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_transport_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(Duration::from_secs(self.timeout_secs))
        } else if e.is_connect() {
            CompletionError::Connection(self.base_url.clone())
        } else {
            CompletionError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl TextCompletion for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            system: self.system.as_deref(),
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(Duration::from_secs(self.timeout_secs))
            } else {
                CompletionError::MalformedResponse(e.to_string())
            }
        })?;

        if parsed.response.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        tracing::debug!(
            model = %self.model,
            response_len = parsed.response.len(),
            "Ollama completion received"
        );

        Ok(parsed.response)
    }
}
