//! Core types and utilities for churn-agent
//!
//! # Modules
//!
//! - `config`: Environment loading and runtime settings
//! - `error`: Error types and Result alias

pub mod config;
pub mod error;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
