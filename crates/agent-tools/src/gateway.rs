//! Tool gateway contract and its in-process implementations
//!
//! The task graph treats every named tool uniformly: it hands the name and
//! arguments to a [`ToolGateway`] and gets back text or a [`GatewayError`].

use agent_core::{Error, GatewayError, TaskKind, TaskSpec, ToolErrorKind};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::ToolRegistry;

/// Executes named tool calls on behalf of a task
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Invoke `name` with `args`, returning the tool's textual output
    async fn invoke(&self, name: &str, args: Value) -> Result<String, GatewayError>;
}

/// Render a tool's JSON output as text
///
/// String values pass through verbatim; anything else is serialized.
pub fn output_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Gateway backed by a [`ToolRegistry`]
pub struct RegistryGateway {
    registry: Arc<ToolRegistry>,
}

impl RegistryGateway {
    /// Create a gateway over a registry
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// A gateway with no tools; every call fails with `NotFound`
    pub fn empty() -> Self {
        Self::new(Arc::new(ToolRegistry::new()))
    }

    /// The backing registry
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}

#[async_trait]
impl ToolGateway for RegistryGateway {
    async fn invoke(&self, name: &str, args: Value) -> Result<String, GatewayError> {
        let Some(tool) = self.registry.get(name) else {
            let available = self.registry.names();
            if available.is_empty() {
                return Err(GatewayError::not_found(name));
            }
            return Err(GatewayError::new(
                ToolErrorKind::NotFound,
                name,
                format!("tool not found (available: {})", available.join(", ")),
            ));
        };

        match tool.execute(args).await {
            Ok(value) => Ok(output_text(value)),
            Err(Error::Gateway(err)) => Err(err),
            Err(err) => Err(GatewayError::failed(name, err.to_string())),
        }
    }
}

/// Gateway restricted to one task's tool set
///
/// Calls to tools outside the set are rejected with `NotPermitted` without
/// reaching the inner gateway. An empty tool set rejects everything.
pub struct ScopedGateway {
    inner: Arc<dyn ToolGateway>,
    task: TaskKind,
    allowed: Vec<String>,
}

impl ScopedGateway {
    /// Scope `inner` to the tools `spec` permits
    pub fn for_task(inner: Arc<dyn ToolGateway>, spec: &TaskSpec) -> Self {
        Self {
            inner,
            task: spec.task_id,
            allowed: spec.tool_set.clone(),
        }
    }

    /// Tools this scope lets through
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

#[async_trait]
impl ToolGateway for ScopedGateway {
    async fn invoke(&self, name: &str, args: Value) -> Result<String, GatewayError> {
        if !self.allowed.iter().any(|t| t == name) {
            debug!(task = %self.task, tool = name, "Rejecting tool outside task scope");
            return Err(GatewayError::not_permitted(name, self.task.id()));
        }
        self.inner.invoke(name, args).await
    }
}

/// Budget-exhausted error for an invocation that was never executed
pub fn budget_exhausted(name: &str) -> GatewayError {
    GatewayError::new(
        ToolErrorKind::BudgetExhausted,
        name,
        "tool call budget exhausted; call not executed",
    )
}
