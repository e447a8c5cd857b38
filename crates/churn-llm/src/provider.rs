//! LLM Provider Traits and Types
//!
//! This module defines the interface the agent loop uses to reach its
//! reasoning engine. The engine is driven with plain text; tool selection is
//! expressed in the completion itself, so requests carry no tool schema.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Provider types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Ollama,
    /// In-process or test providers
    Custom(String),
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderType::Ollama),
            "" => Err("Empty provider type".to_string()),
            other => Ok(ProviderType::Custom(other.to_string())),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Full chat request
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    /// Generation halts before any of these strings
    pub stop: Vec<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub model: String,
    pub provider: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Plain assistant response, mostly for in-process providers
    pub fn text(model: &str, provider: &str, content: impl Into<String>) -> Self {
        Self {
            message: ChatMessage::assistant(content),
            model: model.to_string(),
            provider: provider.to_string(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        }
    }
}

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub updated_at: Option<String>,
}

/// Shared provider for dynamic dispatch
pub type BoxedProvider = Arc<dyn LlmProvider>;

/// LLM Provider trait
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// One completion for the given conversation
    async fn chat(&self, model: &str, request: ChatRequest) -> Result<ChatResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_round_trip() {
        assert_eq!("Ollama".parse::<ProviderType>().unwrap(), ProviderType::Ollama);
        assert_eq!(
            "scripted".parse::<ProviderType>().unwrap(),
            ProviderType::Custom("scripted".to_string())
        );
        assert!("  ".parse::<ProviderType>().is_err());
        assert_eq!(ProviderType::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.2)
            .with_max_tokens(512)
            .with_stop("\nObservation:");
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.stop, vec!["\nObservation:".to_string()]);
    }
}
