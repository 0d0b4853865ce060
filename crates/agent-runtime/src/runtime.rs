//! Runtime holding the shared collaborators for task execution
//!
//! The AgentRuntime owns the reasoning collaborator and the tool gateway and
//! hands out [`TaskRunner`]s configured from its [`RuntimeConfig`].

use agent_core::{Error, Result};
use agent_llm::LLMProvider;
use agent_tools::{RegistryGateway, ToolGateway};
use std::sync::Arc;
use tracing::info;

use crate::config::RuntimeConfig;
use crate::runner::TaskRunner;

/// Shared collaborators plus configuration
///
/// # Example
///
/// ```no_run
/// use agent_llm::{Message, ScriptedProvider};
/// use agent_runtime::AgentRuntime;
/// use std::sync::Arc;
///
/// # fn example() -> agent_core::Result<()> {
/// let runtime = AgentRuntime::builder()
///     .provider(Arc::new(ScriptedProvider::repeating(Message::producer("Hold."))))
///     .build()?;
///
/// let runner = runtime.task_runner();
/// # Ok(())
/// # }
/// ```
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    gateway: Arc<dyn ToolGateway>,
    config: RuntimeConfig,
}

impl AgentRuntime {
    /// Create a new agent runtime
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        gateway: Arc<dyn ToolGateway>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            provider,
            gateway,
            config,
        }
    }

    /// Create a new runtime builder
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new()
    }

    /// Build a runtime whose collaborators are the configured HTTP endpoints
    ///
    /// Without a tool gateway endpoint every tool call fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no producer endpoint is set or an
    /// HTTP client cannot be created
    #[cfg(feature = "http")]
    pub fn from_config(config: RuntimeConfig) -> Result<Self> {
        use agent_llm::HttpProvider;
        use agent_tools::HttpToolGateway;

        config.validate()?;
        let producer_url = config.require_producer()?.clone();
        let provider = HttpProvider::new(producer_url, config.request_timeout)
            .map_err(|e| Error::Config(format!("producer client: {e}")))?;

        let gateway: Arc<dyn ToolGateway> = match &config.tool_gateway_endpoint {
            Some(url) => Arc::new(
                HttpToolGateway::new(url.clone(), config.request_timeout)
                    .map_err(|e| Error::Config(format!("tool gateway client: {e}")))?,
            ),
            None => {
                info!("No tool gateway configured, tasks will run without tools");
                Arc::new(RegistryGateway::empty())
            }
        };

        Ok(Self::new(Arc::new(provider), gateway, config))
    }

    /// Get a reference to the reasoning collaborator
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Get a reference to the tool gateway
    pub fn gateway(&self) -> &Arc<dyn ToolGateway> {
        &self.gateway
    }

    /// Get a reference to the runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create a task runner sharing this runtime's collaborators
    pub fn task_runner(&self) -> TaskRunner {
        TaskRunner::new(
            self.provider.clone(),
            self.gateway.clone(),
            self.config.graph.clone(),
        )
    }
}

/// Builder for AgentRuntime
pub struct AgentRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    gateway: Option<Arc<dyn ToolGateway>>,
    config: RuntimeConfig,
}

impl AgentRuntimeBuilder {
    /// Create a new runtime builder
    pub fn new() -> Self {
        Self {
            provider: None,
            gateway: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the reasoning collaborator
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool gateway
    pub fn gateway(mut self, gateway: Arc<dyn ToolGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the tool-call budget
    pub fn max_tool_calls(mut self, max: u32) -> Self {
        self.config.graph.max_tool_calls = max;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.graph.model = model.into();
        self
    }

    /// Build the runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not set or the configuration is
    /// invalid
    pub fn build(self) -> Result<AgentRuntime> {
        let provider = self
            .provider
            .ok_or_else(|| Error::Config("provider not set".to_string()))?;

        self.config.validate()?;

        let gateway = self
            .gateway
            .unwrap_or_else(|| Arc::new(RegistryGateway::empty()));

        Ok(AgentRuntime::new(provider, gateway, self.config))
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{TaskKind, TaskSpec};
    use agent_llm::{Message, ScriptedProvider};

    #[test]
    fn test_runtime_builder() {
        let builder = AgentRuntimeBuilder::new().max_tool_calls(5).model("test-model");

        assert_eq!(builder.config.graph.max_tool_calls, 5);
        assert_eq!(builder.config.graph.model, "test-model");
    }

    #[test]
    fn test_build_requires_provider() {
        assert!(matches!(
            AgentRuntime::builder().build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = AgentRuntime::builder()
            .provider(Arc::new(ScriptedProvider::repeating(Message::producer("x"))))
            .model("")
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_task_runner_uses_runtime_collaborators() {
        let runtime = AgentRuntime::builder()
            .provider(Arc::new(ScriptedProvider::repeating(Message::producer("Hold."))))
            .max_tool_calls(2)
            .build()
            .unwrap();

        let runner = runtime.task_runner();
        assert_eq!(runner.config().max_tool_calls, 2);

        let date = agent_core::parse_date("2025-12-25").unwrap();
        let record = runner.run(TaskSpec::new(TaskKind::Neutral, "INTC", date)).await;
        assert_eq!(record.report_text(), Some("Hold."));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_from_config_requires_producer() {
        let result = AgentRuntime::from_config(RuntimeConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
