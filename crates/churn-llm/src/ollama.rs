//! Ollama API Client (Cloud and Local)
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|--------|
//! | Local API | `http://localhost:11434` | Local Ollama instance |
//! | Chat | `/api/chat` | Chat completions |
//! | Models | `/api/tags` | List local models |
//!
//! ## Authentication
//! - Header: `Authorization: Bearer {OLLAMA_API_KEY}` (hosted endpoints only)
//! - Environment: `OLLAMA_API_KEY` (optional)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::provider::{
    ChatMessage, ChatRequest, ChatResponse, LlmProvider, ModelInfo, ProviderType, TokenUsage,
};

/// Ollama API endpoints
pub mod endpoints {
    /// Local API URL (default)
    pub const LOCAL_API: &str = "http://localhost:11434";

    /// Full URL: {API}/api/chat
    pub const CHAT: &str = "/api/chat";

    /// Full URL: {API}/api/tags
    pub const TAGS: &str = "/api/tags";
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct OllamaModelsResponse {
    models: Option<Vec<OllamaModel>>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
    modified_at: Option<String>,
    details: Option<OllamaModelDetails>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelDetails {
    family: Option<String>,
    parameter_size: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaChatMessage>,
    stream: bool,
    options: OllamaChatOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
    model: Option<String>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

/// Ollama Client (Cloud or Local)
pub struct OllamaClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl OllamaClient {
    /// Create a client for `api_url`
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_timeout(api_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|k| !k.is_empty()),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create for local Ollama instance
    pub fn local() -> Self {
        Self::new(endpoints::LOCAL_API, None)
    }

    /// Create from `OLLAMA_API_URL` / `OLLAMA_API_KEY`
    pub fn from_env() -> Self {
        let api_key = std::env::var("OLLAMA_API_KEY").ok();
        let api_url =
            std::env::var("OLLAMA_API_URL").unwrap_or_else(|_| endpoints::LOCAL_API.to_string());
        Self::new(api_url, api_key)
    }

    /// Get the current API URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    fn convert_model(model: OllamaModel) -> ModelInfo {
        let parameters = model.details.as_ref().and_then(|d| d.parameter_size.clone());

        ModelInfo {
            id: model.name.clone(),
            name: model.name,
            description: model.details.as_ref().and_then(|d| d.family.clone()),
            parameters,
            updated_at: model.modified_at,
        }
    }
}

fn build_request(model: &str, request: ChatRequest) -> OllamaChatRequest {
    OllamaChatRequest {
        model: model.to_string(),
        messages: request
            .messages
            .into_iter()
            .map(|m| OllamaChatMessage {
                role: m.role,
                content: m.content,
            })
            .collect(),
        stream: false,
        options: OllamaChatOptions {
            temperature: request.temperature,
            top_p: request.top_p,
            num_predict: request.max_tokens,
            stop: request.stop,
        },
    }
}

fn convert_response(model: &str, result: OllamaChatResponse) -> ChatResponse {
    let usage = if result.prompt_eval_count.is_some() || result.eval_count.is_some() {
        let prompt = result.prompt_eval_count.unwrap_or(0);
        let completion = result.eval_count.unwrap_or(0);
        Some(TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        })
    } else {
        None
    };

    ChatResponse {
        message: ChatMessage {
            role: result.message.role,
            content: result.message.content,
        },
        model: result.model.unwrap_or_else(|| model.to_string()),
        provider: "ollama".to_string(),
        finish_reason: result.done_reason,
        usage,
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}{}", self.api_url, endpoints::TAGS);
        debug!("Fetching Ollama models: {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .context("Failed to reach Ollama")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Ollama model listing failed: {}",
                response.status()
            ));
        }

        let data: OllamaModelsResponse = response
            .json()
            .await
            .context("Failed to parse Ollama model list")?;
        let models: Vec<ModelInfo> = data
            .models
            .unwrap_or_default()
            .into_iter()
            .map(Self::convert_model)
            .collect();

        info!("Fetched {} models from Ollama", models.len());
        Ok(models)
    }

    async fn chat(&self, model: &str, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}{}", self.api_url, endpoints::CHAT);
        debug!(model, endpoint = %self.api_url, "Ollama chat");

        let body = build_request(model, request);
        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .context("Failed to send Ollama request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, text));
        }

        let result: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(convert_response(model, result))
    }
}
