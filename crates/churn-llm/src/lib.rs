//! churn-llm: Reasoning Engine Providers
//!
//! The agent talks to its reasoning engine through [`LlmProvider`]. The
//! only network implementation is the Ollama client.

pub mod ollama;
pub mod provider;

pub use ollama::OllamaClient;
pub use provider::{
    BoxedProvider, ChatMessage, ChatRequest, ChatResponse, LlmProvider, ModelInfo, ProviderType,
    TokenUsage,
};
