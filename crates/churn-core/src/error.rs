//! Error types for churn-agent

use thiserror::Error;

/// Main error type for churn-agent operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not parse reasoning output: {0}")]
    Parse(String),

    #[error("Reasoning backend error: {0}")]
    Backend(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Column '{0}' not in dataframe")]
    ColumnNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Error::ToolNotFound(name.into())
    }

    /// Create a tool execution error
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Error::ToolExecution(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    /// Create a dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Error::Dataset(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether the error means the reasoning backend itself is unusable.
    /// Everything else is recoverable inside a turn.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
