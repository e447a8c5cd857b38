//! Core Tool trait and argument types
//!
//! Tools take at most one textual argument. Each tool declares the shape it
//! accepts as an [`ArgSpec`]; the raw text chosen by the reasoning engine is
//! validated against it at the dispatch boundary and handed to the tool as
//! [`ToolArgs`].

use async_trait::async_trait;
use churn_core::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Argument shape a tool accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgSpec {
    /// No argument; any text supplied is ignored
    None,
    /// A single non-empty string
    Text {
        /// Short name of the value, e.g. `column`
        name: String,
    },
}

impl ArgSpec {
    pub fn text(name: impl Into<String>) -> Self {
        ArgSpec::Text { name: name.into() }
    }

    /// Validate raw engine text against this shape.
    ///
    /// Text arguments are trimmed and one layer of surrounding quotes is
    /// removed, since engines tend to write `"Geography"` or `'Geography'`.
    pub fn validate(&self, raw: &str) -> Result<ToolArgs> {
        match self {
            ArgSpec::None => Ok(ToolArgs::None),
            ArgSpec::Text { name } => {
                let value = strip_quotes(raw.trim()).trim();
                if value.is_empty() {
                    Err(Error::invalid_argument(format!("expected a {} name", name)))
                } else {
                    Ok(ToolArgs::Text(value.to_string()))
                }
            }
        }
    }

    /// Human-readable hint for prompts
    pub fn hint(&self) -> String {
        match self {
            ArgSpec::None => "no input".to_string(),
            ArgSpec::Text { name } => format!("input: {} name as a string", name),
        }
    }
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Validated tool input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolArgs {
    None,
    Text(String),
}

impl ToolArgs {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolArgs::None => None,
            ToolArgs::Text(value) => Some(value),
        }
    }

    /// The text argument, or an `InvalidArgument` error naming the tool
    pub fn require_text(&self, tool: &str) -> Result<&str> {
        self.as_text()
            .ok_or_else(|| Error::invalid_argument(format!("{} requires an input", tool)))
    }
}

impl fmt::Display for ToolArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolArgs::None => Ok(()),
            ToolArgs::Text(value) => f.write_str(value),
        }
    }
}

/// Core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name (unique identifier)
    fn name(&self) -> &str;

    /// Capability hint shown to the reasoning engine
    fn description(&self) -> &str;

    /// Argument shape accepted by `execute`
    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::None
    }

    /// How often the tool may run within one turn, `None` for unlimited
    fn max_calls_per_turn(&self) -> Option<u32> {
        None
    }

    /// Execute the tool, producing the observation text
    async fn execute(&self, args: ToolArgs) -> Result<String>;
}

/// Type alias for boxed tools
pub type BoxedTool = Arc<dyn Tool>;

type Handler = dyn Fn(ToolArgs) -> Result<String> + Send + Sync;

/// Closure-backed tool, handy for tests and ad-hoc registrations
#[derive(Clone)]
pub struct SimpleTool {
    name: String,
    description: String,
    arg_spec: ArgSpec,
    max_calls: Option<u32>,
    handler: Arc<Handler>,
}

impl SimpleTool {
    pub fn new<F>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(ToolArgs) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            arg_spec: ArgSpec::None,
            max_calls: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_arg(mut self, spec: ArgSpec) -> Self {
        self.arg_spec = spec;
        self
    }

    pub fn with_max_calls(mut self, limit: u32) -> Self {
        self.max_calls = Some(limit);
        self
    }
}

#[async_trait]
impl Tool for SimpleTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn arg_spec(&self) -> ArgSpec {
        self.arg_spec.clone()
    }

    fn max_calls_per_turn(&self) -> Option<u32> {
        self.max_calls
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        (self.handler)(args)
    }
}
