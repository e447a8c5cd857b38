//! Agent Loop
//!
//! Drives one turn as a small state machine:
//!
//! ```text
//!   Thinking ──action──▶ Acting ──observation──▶ Thinking
//!      │
//!      └──final answer──▶ Done
//! ```
//!
//! Unparsable engine output stays in `Thinking` with a corrective
//! observation. The number of engine calls per turn is capped; hitting the
//! cap ends the turn with a fallback answer instead of an error. Only a
//! failing reasoning backend aborts a turn.

use churn_core::{Error, Result};
use churn_llm::{BoxedProvider, ChatMessage, ChatRequest};
use churn_tools::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics::{CallMetrics, Metered};
use crate::prompt::{build_prompt, Scratchpad};
use crate::react::{corrective_observation, parse_react_output, ReactStep};

/// Generation halts here so the engine cannot invent observations
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// Configuration for the agent loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f32,
    /// Engine calls allowed per turn
    pub max_iterations: usize,
    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            temperature: 0.2,
            max_iterations: 6,
            max_tokens: Some(512),
        }
    }
}

/// One tool call made during a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub tool: String,
    pub arg: String,
    pub observation: String,
}

/// Result of one user exchange
#[derive(Debug, Clone, Serialize)]
pub struct AgentTurn {
    pub id: Uuid,
    pub input: String,
    pub trace: Vec<TraceStep>,
    pub final_output: String,
    /// Engine calls made
    pub iterations: usize,
    /// Whether the iteration cap produced the answer
    pub stopped_early: bool,
}

enum LoopState {
    Thinking,
    Acting {
        log: String,
        tool: String,
        arg: String,
    },
    Done(String),
}

/// Tool-mediated ReAct agent
pub struct Agent {
    provider: BoxedProvider,
    registry: Arc<ToolRegistry>,
    metrics: Arc<CallMetrics>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(
        provider: BoxedProvider,
        registry: Arc<ToolRegistry>,
        metrics: Arc<CallMetrics>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<CallMetrics> {
        &self.metrics
    }

    /// Run one turn under the call metrics wrapper
    pub async fn handle(
        &self,
        input: &str,
    ) -> std::result::Result<Metered<AgentTurn>, Metered<Error>> {
        let outcome = self.metrics.wrap(|| self.run_turn(input)).await;
        match &outcome {
            Ok(m) => info!(
                turn = %m.result.id,
                latency_sec = m.metrics.latency_sec,
                total_requests = m.metrics.total_requests,
                tools = m.result.trace.len(),
                "Turn completed"
            ),
            Err(m) => error!(
                latency_sec = m.metrics.latency_sec,
                total_requests = m.metrics.total_requests,
                error = %m.result,
                "Turn failed"
            ),
        }
        outcome
    }

    /// Run one turn without metrics
    pub async fn run_turn(&self, input: &str) -> Result<AgentTurn> {
        let id = Uuid::new_v4();
        let catalog = self.registry.list().await;
        let mut dispatcher = self.registry.turn();
        let mut scratchpad = Scratchpad::default();
        let mut trace = Vec::new();
        let mut iterations = 0;
        let mut state = LoopState::Thinking;

        debug!(turn = %id, tools = catalog.len(), "Turn started");

        loop {
            state = match state {
                LoopState::Thinking => {
                    if iterations >= self.config.max_iterations {
                        warn!(turn = %id, iterations, "Iteration cap reached");
                        let final_output = self.fallback_answer(&scratchpad);
                        return Ok(AgentTurn {
                            id,
                            input: input.to_string(),
                            trace,
                            final_output,
                            iterations,
                            stopped_early: true,
                        });
                    }
                    iterations += 1;

                    let prompt = build_prompt(&catalog, input, &scratchpad);
                    let output = self.think(prompt).await?;

                    match parse_react_output(&output) {
                        Ok(ReactStep::Final { answer, .. }) => LoopState::Done(answer),
                        Ok(ReactStep::Action { tool, input: arg, .. }) => LoopState::Acting {
                            log: output,
                            tool,
                            arg,
                        },
                        Err(e) => {
                            warn!(turn = %id, iteration = iterations, error = %e, "Unparsable reasoning output");
                            scratchpad.push(output, corrective_observation(&e));
                            LoopState::Thinking
                        }
                    }
                }
                LoopState::Acting { log, tool, arg } => {
                    debug!(turn = %id, tool = %tool, arg = %arg, "Dispatching tool");
                    let observation = dispatcher.dispatch(&tool, &arg).await;
                    trace.push(TraceStep {
                        tool,
                        arg,
                        observation: observation.clone(),
                    });
                    scratchpad.push(log, observation);
                    LoopState::Thinking
                }
                LoopState::Done(final_output) => {
                    return Ok(AgentTurn {
                        id,
                        input: input.to_string(),
                        trace,
                        final_output,
                        iterations,
                        stopped_early: false,
                    });
                }
            };
        }
    }

    async fn think(&self, prompt: String) -> Result<String> {
        let mut request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.config.temperature)
            .with_stop(OBSERVATION_STOP);
        if let Some(tokens) = self.config.max_tokens {
            request = request.with_max_tokens(tokens);
        }

        let response = self
            .provider
            .chat(&self.config.model, request)
            .await
            .map_err(|e| Error::backend(format!("{:#}", e)))?;
        Ok(response.message.content)
    }

    fn fallback_answer(&self, scratchpad: &Scratchpad) -> String {
        let limit = self.config.max_iterations;
        match scratchpad.last_observation() {
            Some(observation)
                if !observation.starts_with("Invalid Format")
                    && !observation.starts_with("Error:") =>
            {
                format!(
                    "I could not finish reasoning within {} steps. The last tool result was:\n{}",
                    limit, observation
                )
            }
            _ => format!(
                "I could not finish reasoning within {} steps. Please rephrase the question.",
                limit
            ),
        }
    }
}
