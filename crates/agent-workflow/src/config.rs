//! Orchestrator configuration

use agent_core::{Error, Result};
use agent_utils::EnvSource;
use std::time::Duration;

/// Environment variable names read by [`OrchestratorConfig::from_env`]
pub mod keys {
    /// Per-task timeout, in seconds
    pub const TASK_TIMEOUT_SECS: &str = "AGENT_TASK_TIMEOUT_SECS";
    /// Delay between consecutive tasks, in milliseconds
    pub const COOLDOWN_MS: &str = "AGENT_COOLDOWN_MS";
}

/// Settings for a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Deadline for one task, enforced by the orchestrator
    pub task_timeout: Duration,

    /// Delay applied after each task except the last
    pub cooldown: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(120),
            cooldown: Duration::from_millis(1000),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration builder
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Load the configuration from an environment source
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        OrchestratorConfigBuilder::default().with_env(env)?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.task_timeout.is_zero() {
            return Err(Error::Config(
                "task_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for OrchestratorConfig
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    task_timeout: Option<Duration>,
    cooldown: Option<Duration>,
}

impl OrchestratorConfigBuilder {
    /// Set the per-task timeout
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Set the inter-task cool-down
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Fill unset fields from an environment source
    pub fn with_env(mut self, env: &impl EnvSource) -> Result<Self> {
        if self.task_timeout.is_none() {
            self.task_timeout = env
                .duration_secs(keys::TASK_TIMEOUT_SECS)
                .map_err(Error::Config)?;
        }
        if self.cooldown.is_none() {
            self.cooldown = env
                .duration_millis(keys::COOLDOWN_MS)
                .map_err(Error::Config)?;
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<OrchestratorConfig> {
        let defaults = OrchestratorConfig::default();

        let config = OrchestratorConfig {
            task_timeout: self.task_timeout.unwrap_or(defaults.task_timeout),
            cooldown: self.cooldown.unwrap_or(defaults.cooldown),
        };

        config.validate()?;
        Ok(config)
    }
}
