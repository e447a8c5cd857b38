//! churn-agent: Tool-Mediated ReAct Agent
//!
//! Connects a reasoning engine ([`churn_llm::LlmProvider`]) to the tool
//! registry. Each user message is one turn; turns are timed and counted by
//! [`CallMetrics`].

pub mod agent_loop;
pub mod metrics;
pub mod prompt;
pub mod react;

pub use agent_loop::{Agent, AgentConfig, AgentTurn, TraceStep, OBSERVATION_STOP};
pub use metrics::{CallMetrics, Metered, TurnMetrics};
pub use react::{parse_react_output, ReactStep};
