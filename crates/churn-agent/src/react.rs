//! ReAct output parsing
//!
//! The reasoning engine answers in the text protocol
//!
//! ```text
//! Thought: ...
//! Action: <tool name>
//! Action Input: <argument>
//! ```
//!
//! or finishes with `Final Answer: ...`. Anything else is a [`Error::Parse`]
//! which the agent loop turns into a corrective observation.

use churn_core::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

const FINAL_ANSWER: &str = "Final Answer:";

/// One parsed engine step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactStep {
    /// Run a tool and come back with its observation
    Action {
        thought: String,
        tool: String,
        input: String,
    },
    /// Turn is complete
    Final { thought: String, answer: String },
}

fn action_regex() -> Option<&'static Regex> {
    static ACTION: OnceLock<Option<Regex>> = OnceLock::new();
    ACTION
        .get_or_init(|| {
            Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
                .ok()
        })
        .as_ref()
}

/// Parse one engine completion
pub fn parse_react_output(text: &str) -> Result<ReactStep> {
    let final_at = text.find(FINAL_ANSWER);

    if let Some(caps) = action_regex().and_then(|re| re.captures(text)) {
        if final_at.is_some() {
            return Err(Error::parse(
                "Parsing LLM output produced both a final answer and a parse-able action",
            ));
        }

        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let tool = clean_tool_name(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
        if tool.is_empty() {
            return Err(Error::parse("Missing tool name after 'Action:'"));
        }

        let raw_input = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let input = raw_input
            .split("\nObservation")
            .next()
            .unwrap_or("")
            .trim()
            .to_string();

        return Ok(ReactStep::Action {
            thought: thought_before(text, start),
            tool,
            input,
        });
    }

    if let Some(at) = final_at {
        let answer = text[at + FINAL_ANSWER.len()..].trim();
        if answer.is_empty() {
            return Err(Error::parse("Missing text after 'Final Answer:'"));
        }
        return Ok(ReactStep::Final {
            thought: thought_before(text, at),
            answer: answer.to_string(),
        });
    }

    if !text.contains("Action") || !text.contains(':') {
        Err(Error::parse("Missing 'Action:' after 'Thought:'"))
    } else {
        Err(Error::parse("Missing 'Action Input:' after 'Action:'"))
    }
}

/// Text shown to the engine after it produced unparsable output
pub fn corrective_observation(err: &Error) -> String {
    match err {
        Error::Parse(msg) => format!("Invalid Format: {}", msg),
        other => format!("Invalid Format: {}", other),
    }
}

fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '*' || c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn thought_before(text: &str, end: usize) -> String {
    let head = text[..end].trim();
    head.strip_prefix("Thought:").unwrap_or(head).trim().to_string()
}
