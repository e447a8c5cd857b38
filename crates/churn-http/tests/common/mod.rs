//! Shared fixtures for exercising the router in-process.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use churn_agent::{Agent, AgentConfig, CallMetrics};
use churn_data::DatasetCache;
use churn_http::{create_router, AppState};
use churn_llm::{ChatRequest, ChatResponse, LlmProvider, ModelInfo, ProviderType};
use churn_tools::{register_data_tools, DataContext, ToolRegistry};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const CSV: &str = "\
RowNumber,CustomerId,Surname,CreditScore,Geography,Age,Exited
1,15634602,Hargrave,619,France,42,1
2,15647311,Hill,608,Spain,41,0
3,15619304,Onio,502,France,42,1
4,15701354,Boni,699,France,39,0
5,15737888,Mitchell,850,Spain,43,0
";

/// Replays canned completions; an empty script acts like a dead backend.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Custom("scripted".to_string())
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }

    async fn chat(&self, model: &str, _request: ChatRequest) -> anyhow::Result<ChatResponse> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))?;
        Ok(ChatResponse::text(model, "scripted", reply))
    }
}

/// Router over a fresh agent, plus the temp dir holding its CSV
pub async fn app(replies: &[&str]) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fintech.csv");
    std::fs::write(&path, CSV).unwrap();

    let registry = Arc::new(ToolRegistry::new());
    let ctx = DataContext::new(Arc::new(DatasetCache::new(2)), &path, "Exited");
    register_data_tools(&registry, ctx).await.unwrap();

    let agent = Agent::new(
        ScriptedProvider::new(replies),
        registry,
        Arc::new(CallMetrics::new().unwrap()),
        AgentConfig::default(),
    );
    (create_router(AppState::new(Arc::new(agent))), dir)
}

pub fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
