//! Environment Configuration Loader
//!
//! Loads environment variables from an env file and turns them into
//! [`Settings`] for the service.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before reading settings:
//!
//! ```rust,no_run
//! use churn_core::config::{load_environment, Settings};
//!
//! load_environment();
//! let settings = Settings::from_env();
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default path for the environment file
pub const DEFAULT_ENV_FILE: &str = "/etc/churn-agent/environment";

/// Paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/churn-agent/environment", ".env"];

/// Load environment variables from the first env file found.
///
/// `CHURN_ENV_FILE` wins over the default locations. Existing environment
/// variables are never overridden.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("CHURN_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!(
                            "Loaded: {}={}",
                            key,
                            if key.contains("KEY") || key.contains("TOKEN") {
                                "***"
                            } else {
                                &value
                            }
                        );
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse a single `KEY=VALUE` line, stripping matching quotes around the value.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.splitn(2, '=');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Runtime settings shared by the service front ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// CSV file the data tools read
    pub data_path: PathBuf,
    /// Binary label column for the baseline model
    pub target_column: String,
    /// Ollama API base URL
    pub ollama_url: String,
    /// Bearer key for hosted Ollama endpoints
    pub ollama_api_key: Option<String>,
    /// Model name passed to the reasoning backend
    pub model: String,
    pub temperature: f32,
    /// Reasoning steps allowed per turn before the fallback answer
    pub max_iterations: usize,
    pub dataset_cache: bool,
    pub cache_capacity: usize,
    /// HTTP bind address (host:port)
    pub bind: String,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/fintech.csv"),
            target_column: "Exited".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_api_key: None,
            model: "llama3.1:8b".to_string(),
            temperature: 0.2,
            max_iterations: 6,
            dataset_cache: true,
            cache_capacity: 8,
            bind: "0.0.0.0:8000".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset, empty, or
    /// unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            data_path: get("CHURN_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            target_column: get("CHURN_TARGET_COLUMN").unwrap_or(defaults.target_column),
            ollama_url: get("OLLAMA_API_URL").unwrap_or(defaults.ollama_url),
            ollama_api_key: get("OLLAMA_API_KEY"),
            model: get("CHURN_MODEL").unwrap_or(defaults.model),
            temperature: get("CHURN_TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            max_iterations: get("CHURN_MAX_ITERATIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_iterations),
            dataset_cache: get("CHURN_DATASET_CACHE")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.dataset_cache),
            cache_capacity: get("CHURN_CACHE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.cache_capacity),
            bind: get("CHURN_BIND").unwrap_or(defaults.bind),
            request_timeout: get("CHURN_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
