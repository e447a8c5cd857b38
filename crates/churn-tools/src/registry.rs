//! Tool Registry and Dispatcher
//!
//! Provides an ordered registry of tools with:
//! - Duplicate-name rejection
//! - Insertion order as catalog presentation order
//! - Infallible dispatch: every outcome becomes observation text
//! - Per-turn call budgets via [`TurnDispatcher`]
//! - Usage statistics

use churn_core::{Error, Result};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::tool::{ArgSpec, BoxedTool};

/// Tool definition metadata (without the actual tool implementation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub argument: ArgSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_calls_per_turn: Option<u32>,
}

impl ToolDefinition {
    fn from_tool(tool: &BoxedTool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            argument: tool.arg_spec(),
            max_calls_per_turn: tool.max_calls_per_turn(),
        }
    }
}

/// A registered tool with usage tracking
struct RegisteredTool {
    tool: BoxedTool,
    definition: ToolDefinition,
    use_count: AtomicU64,
}

/// Statistics about the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_registered: usize,
    /// Dispatches that reached a tool's `execute`
    pub total_calls: u64,
    pub failures: u64,
    pub not_found: u64,
    /// Dispatches refused by a per-turn budget
    pub refusals: u64,
}

#[derive(Default)]
struct Catalog {
    order: Vec<Arc<str>>,
    tools: HashMap<Arc<str>, Arc<RegisteredTool>>,
}

/// Ordered tool registry
#[derive(Default)]
pub struct ToolRegistry {
    catalog: RwLock<Catalog>,
    stats: RwLock<RegistryStats>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub async fn register(&self, tool: BoxedTool) -> Result<()> {
        let name: Arc<str> = Arc::from(tool.name());
        let definition = ToolDefinition::from_tool(&tool);

        {
            let mut catalog = self.catalog.write().await;
            if catalog.tools.contains_key(&name) {
                return Err(Error::invalid_argument(format!(
                    "tool '{}' is already registered",
                    name
                )));
            }
            catalog.order.push(name.clone());
            catalog.tools.insert(
                name.clone(),
                Arc::new(RegisteredTool {
                    tool,
                    definition,
                    use_count: AtomicU64::new(0),
                }),
            );
        }

        self.stats.write().await.total_registered += 1;
        debug!("Registered tool: {}", name);
        Ok(())
    }

    /// Get a tool by name
    pub async fn get(&self, name: &str) -> Option<BoxedTool> {
        let catalog = self.catalog.read().await;
        catalog.tools.get(name).map(|r| r.tool.clone())
    }

    pub async fn get_definition(&self, name: &str) -> Option<ToolDefinition> {
        let catalog = self.catalog.read().await;
        catalog.tools.get(name).map(|r| r.definition.clone())
    }

    /// All tool definitions in presentation order
    pub async fn list(&self) -> Vec<ToolDefinition> {
        let catalog = self.catalog.read().await;
        catalog
            .order
            .iter()
            .filter_map(|name| catalog.tools.get(name))
            .map(|r| r.definition.clone())
            .collect()
    }

    pub async fn names(&self) -> Vec<String> {
        let catalog = self.catalog.read().await;
        catalog.order.iter().map(|n| n.to_string()).collect()
    }

    pub async fn len(&self) -> usize {
        self.catalog.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// How many times a tool has executed over the process lifetime
    pub async fn use_count(&self, name: &str) -> u64 {
        let catalog = self.catalog.read().await;
        catalog
            .tools
            .get(name)
            .map(|r| r.use_count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn stats(&self) -> RegistryStats {
        self.stats.read().await.clone()
    }

    /// Start a turn with fresh call budgets
    pub fn turn(&self) -> TurnDispatcher<'_> {
        TurnDispatcher {
            registry: self,
            calls: HashMap::new(),
        }
    }

    /// Dispatch a single call outside of any turn. Never fails; errors come
    /// back as observation text.
    pub async fn dispatch(&self, name: &str, arg: &str) -> String {
        self.turn().dispatch(name, arg).await
    }

    async fn record(&self, update: impl FnOnce(&mut RegistryStats)) {
        update(&mut *self.stats.write().await);
    }
}

/// Dispatcher scoped to one agent turn.
///
/// Tracks how often each tool ran in the turn and refuses calls past the
/// tool's `max_calls_per_turn`.
pub struct TurnDispatcher<'a> {
    registry: &'a ToolRegistry,
    calls: HashMap<String, u32>,
}

impl TurnDispatcher<'_> {
    /// Run `name` with the raw engine argument, returning the observation.
    pub async fn dispatch(&mut self, name: &str, arg: &str) -> String {
        let name = name.trim();
        let registered = {
            let catalog = self.registry.catalog.read().await;
            catalog.tools.get(name).cloned()
        };

        let Some(registered) = registered else {
            self.registry.record(|s| s.not_found += 1).await;
            let available = self.registry.names().await.join(", ");
            warn!(tool = %name, "Reasoning engine selected an unknown tool");
            return format!(
                "Error: {}. Available tools: {}",
                Error::tool_not_found(name),
                available
            );
        };

        let used = self.calls.get(name).copied().unwrap_or(0);
        if let Some(limit) = registered.tool.max_calls_per_turn() {
            if used >= limit {
                self.registry.record(|s| s.refusals += 1).await;
                info!(tool = %name, limit, "Tool call refused by per-turn budget");
                return format!(
                    "Error: {} may only be called {} time(s) per turn and was already called. \
                     Use the earlier observation to answer.",
                    name, limit
                );
            }
        }

        let args = match registered.tool.arg_spec().validate(arg) {
            Ok(args) => args,
            Err(e) => {
                self.registry.record(|s| s.failures += 1).await;
                warn!(tool = %name, error = %e, "Rejected tool argument");
                return format!("Error: {}", e);
            }
        };

        self.calls.insert(name.to_string(), used + 1);
        registered.use_count.fetch_add(1, Ordering::Relaxed);

        let start = Instant::now();
        let result = AssertUnwindSafe(registered.tool.execute(args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::tool_execution(panic_message(&*panic))));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(observation) => {
                self.registry.record(|s| s.total_calls += 1).await;
                debug!(tool = %name, elapsed_ms, "Tool call completed");
                observation
            }
            Err(e) => {
                self.registry
                    .record(|s| {
                        s.total_calls += 1;
                        s.failures += 1;
                    })
                    .await;
                warn!(tool = %name, elapsed_ms, error = %e, "Tool call failed");
                format!("Error: {} failed: {}", name, e)
            }
        }
    }

    /// Calls made to `name` so far in this turn
    pub fn calls(&self, name: &str) -> u32 {
        self.calls.get(name).copied().unwrap_or(0)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|m| m.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {}", detail)
}
