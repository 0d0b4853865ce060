//! Error types for agent-core
//!
//! Only [`Error::Config`] and [`Error::Discovery`] abort a batch. Every other
//! variant degrades into a per-item failure marker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for task and batch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bad subject, date, task identifier or collaborator endpoint
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool call failed
    #[error("Tool gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A task crashed, timed out or could not be constructed
    #[error("Task runner error: {0}")]
    Runner(String),

    /// No outputs were found after the execute stage
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Artifact generation failed
    #[error("Render error: {0}")]
    Render(String),

    /// Reading or writing persisted records failed
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether this error aborts a whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Discovery(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Store(format!("invalid record JSON: {err}"))
    }
}

/// Classification of a failed tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// The tool is not in the task's tool set
    NotPermitted,
    /// No tool with that name is registered
    NotFound,
    /// The tool ran and reported a failure
    ExecutionFailed,
    /// The gateway could not be reached
    Transport,
    /// The task ran out of tool calls before this one could run
    BudgetExhausted,
}

/// A failed tool call, surfaced to the producer as a tool-role message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tool}: {message}")]
pub struct GatewayError {
    /// What went wrong
    pub kind: ToolErrorKind,
    /// The tool that was invoked
    pub tool: String,
    /// Human-readable detail
    pub message: String,
}

impl GatewayError {
    /// Create a gateway error
    pub fn new(kind: ToolErrorKind, tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// The tool is outside the task's tool set
    pub fn not_permitted(tool: impl Into<String>, task: &str) -> Self {
        Self::new(
            ToolErrorKind::NotPermitted,
            tool,
            format!("tool is not permitted for task '{task}'"),
        )
    }

    /// No tool with this name exists
    pub fn not_found(tool: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, tool, "tool not found")
    }

    /// The tool reported a failure
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ExecutionFailed, tool, message)
    }
}
