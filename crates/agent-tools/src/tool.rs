//! Tool trait definition

use agent_core::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools served through a registry-backed gateway
///
/// Tools are the data-retrieval and computation capabilities a task may
/// call by name. Failures should be returned as errors; the gateway turns
/// them into tool-role error messages.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given arguments
    ///
    /// # Arguments
    ///
    /// * `args` - Tool input as JSON value
    ///
    /// # Returns
    ///
    /// Tool output as JSON value; strings are passed through verbatim
    async fn execute(&self, args: Value) -> Result<Value>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry
    fn name(&self) -> &str;

    /// Get the tool's description
    fn description(&self) -> &str;
}
