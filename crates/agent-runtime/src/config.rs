//! Configuration for task execution

use agent_core::{Error, Result};
use agent_utils::EnvSource;
use std::time::Duration;
use url::Url;

/// Environment variable names read by [`RuntimeConfig::from_env`]
pub mod keys {
    /// Tool-call budget per task
    pub const MAX_TOOL_CALLS: &str = "AGENT_MAX_TOOL_CALLS";
    /// Model identifier forwarded to the producer
    pub const MODEL: &str = "AGENT_MODEL";
    /// Reasoning collaborator endpoint
    pub const PRODUCER_URL: &str = "AGENT_PRODUCER_URL";
    /// Tool gateway endpoint
    pub const TOOL_GATEWAY_URL: &str = "AGENT_TOOL_GATEWAY_URL";
    /// Per-request timeout for collaborator calls, in seconds
    pub const REQUEST_TIMEOUT_SECS: &str = "AGENT_REQUEST_TIMEOUT_SECS";
}

/// Configuration for one task graph execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Initial tool-call budget (prevents unbounded loops)
    pub max_tool_calls: u32,

    /// Model to use
    pub model: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 10,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Runtime configuration: graph settings plus collaborator endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Graph settings
    pub graph: GraphConfig,

    /// Reasoning collaborator endpoint
    pub producer_endpoint: Option<Url>,

    /// Tool gateway endpoint; tasks get no tools when unset
    pub tool_gateway_endpoint: Option<Url>,

    /// Per-request timeout for collaborator calls
    pub request_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            producer_endpoint: None,
            tool_gateway_endpoint: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Create a new configuration builder
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Load the configuration from an environment source
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        RuntimeConfigBuilder::default().with_env(env)?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.graph.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The producer endpoint, or a configuration error naming the variable
    pub fn require_producer(&self) -> Result<&Url> {
        self.producer_endpoint.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "producer endpoint not configured (set {})",
                keys::PRODUCER_URL
            ))
        })
    }

    /// Variables that reproduce this configuration in a child process
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (
                keys::MAX_TOOL_CALLS.to_string(),
                self.graph.max_tool_calls.to_string(),
            ),
            (keys::MODEL.to_string(), self.graph.model.clone()),
            (
                keys::REQUEST_TIMEOUT_SECS.to_string(),
                self.request_timeout.as_secs().to_string(),
            ),
        ];
        if let Some(url) = &self.producer_endpoint {
            vars.push((keys::PRODUCER_URL.to_string(), url.to_string()));
        }
        if let Some(url) = &self.tool_gateway_endpoint {
            vars.push((keys::TOOL_GATEWAY_URL.to_string(), url.to_string()));
        }
        vars
    }
}

/// Builder for RuntimeConfig
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    max_tool_calls: Option<u32>,
    model: Option<String>,
    producer_endpoint: Option<Url>,
    tool_gateway_endpoint: Option<Url>,
    request_timeout: Option<Duration>,
}

impl RuntimeConfigBuilder {
    /// Set the tool-call budget
    pub fn max_tool_calls(mut self, max: u32) -> Self {
        self.max_tool_calls = Some(max);
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the producer endpoint
    pub fn producer_endpoint(mut self, url: Url) -> Self {
        self.producer_endpoint = Some(url);
        self
    }

    /// Set the tool gateway endpoint
    pub fn tool_gateway_endpoint(mut self, url: Url) -> Self {
        self.tool_gateway_endpoint = Some(url);
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Fill unset fields from an environment source
    pub fn with_env(mut self, env: &impl EnvSource) -> Result<Self> {
        if self.max_tool_calls.is_none() {
            self.max_tool_calls = env.parse(keys::MAX_TOOL_CALLS).map_err(Error::Config)?;
        }
        if self.model.is_none() {
            self.model = env.non_empty(keys::MODEL);
        }
        if self.producer_endpoint.is_none() {
            self.producer_endpoint = parse_url(env, keys::PRODUCER_URL)?;
        }
        if self.tool_gateway_endpoint.is_none() {
            self.tool_gateway_endpoint = parse_url(env, keys::TOOL_GATEWAY_URL)?;
        }
        if self.request_timeout.is_none() {
            self.request_timeout = env
                .duration_secs(keys::REQUEST_TIMEOUT_SECS)
                .map_err(Error::Config)?;
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<RuntimeConfig> {
        let defaults = RuntimeConfig::default();

        let config = RuntimeConfig {
            graph: GraphConfig {
                max_tool_calls: self.max_tool_calls.unwrap_or(defaults.graph.max_tool_calls),
                model: self.model.unwrap_or(defaults.graph.model),
            },
            producer_endpoint: self.producer_endpoint,
            tool_gateway_endpoint: self.tool_gateway_endpoint,
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_url(env: &impl EnvSource, key: &str) -> Result<Option<Url>> {
    env.non_empty(key)
        .map(|raw| {
            Url::parse(&raw).map_err(|e| Error::Config(format!("{key}={raw:?} is invalid: {e}")))
        })
        .transpose()
}
