//! Shared fixtures: a scripted reasoning engine and churn CSV files.

#![allow(dead_code)]

use async_trait::async_trait;
use churn_agent::{Agent, AgentConfig, CallMetrics};
use churn_data::DatasetCache;
use churn_llm::{ChatRequest, ChatResponse, LlmProvider, ModelInfo, ProviderType};
use churn_tools::{register_data_tools, DataContext, ToolRegistry};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const TEN_ROWS: &str = "\
RowNumber,CustomerId,Surname,CreditScore,Geography,Gender,Age,Balance,Exited
1,15634602,Hargrave,619,France,Female,42,0.0,1
2,15647311,Hill,608,Spain,Female,41,83807.86,0
3,15619304,Onio,502,France,Female,42,159660.8,1
4,15701354,Boni,699,France,Female,39,0.0,0
5,15737888,Mitchell,850,Spain,Female,43,125510.82,0
6,15574012,Chu,645,Spain,Male,44,113755.78,1
7,15592531,Bartlett,822,France,Male,50,0.0,0
8,15656148,Obinna,376,Germany,Female,29,115046.74,1
9,15792365,He,501,France,Male,44,142051.07,0
10,15592389,H?,684,France,Male,27,134603.88,1
";

pub const THREE_ROWS: &str = "\
RowNumber,CustomerId,Surname,Geography,Exited
1,101,A,France,0
2,102,B,France,1
3,103,C,Spain,0
";

/// Reasoning engine that replays canned completions and records prompts.
/// Running out of replies behaves like an unreachable backend.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn push(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
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

    async fn chat(&self, model: &str, request: ChatRequest) -> anyhow::Result<ChatResponse> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))?;
        Ok(ChatResponse::text(model, "scripted", reply))
    }
}

pub fn write_csv(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("fintech.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

pub async fn agent_for(
    path: &Path,
    provider: Arc<ScriptedProvider>,
    max_iterations: usize,
) -> Agent {
    let registry = Arc::new(ToolRegistry::new());
    let ctx = DataContext::new(Arc::new(DatasetCache::new(4)), path, "Exited");
    register_data_tools(&registry, ctx).await.unwrap();

    let config = AgentConfig {
        max_iterations,
        ..AgentConfig::default()
    };
    Agent::new(
        provider,
        registry,
        Arc::new(CallMetrics::new().unwrap()),
        config,
    )
}
