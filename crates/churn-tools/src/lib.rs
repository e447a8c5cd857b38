//! churn-tools: Tool Registry and Dispatch
//!
//! Provides the tool trait, the ordered registry with per-turn call budgets,
//! the built-in dataset tools, and the catalog HTTP router.

pub mod builtin;
pub mod registry;
pub mod router;
pub mod tool;

// Re-export main types
pub use builtin::{register_data_tools, DataContext};
pub use registry::{RegistryStats, ToolDefinition, ToolRegistry, TurnDispatcher};
pub use router::{create_router, ToolsState};
pub use tool::{ArgSpec, BoxedTool, SimpleTool, Tool, ToolArgs};
