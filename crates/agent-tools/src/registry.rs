//! Named tools served by a [`RegistryGateway`](crate::RegistryGateway)

use crate::Tool;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

type ToolMap = BTreeMap<String, Arc<dyn Tool>>;

/// In-process tool catalog, ordered by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<ToolMap>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `tools`
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, ToolMap> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a tool, returning the tool it replaced
    pub fn register(&self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        tools.insert(tool.name().to_string(), tool)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.read().get(name).cloned()
    }

    /// Registered tool names in order
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Tool for Named {
        async fn execute(&self, _args: Value) -> agent_core::Result<Value> {
            Ok(Value::String(self.1.to_string()))
        }

        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(Arc::new(Named("get_news", "v1"))).is_none());

        let replaced = registry.register(Arc::new(Named("get_news", "v2")));
        assert_eq!(replaced.unwrap().description(), "v1");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("get_news").unwrap().description(), "v2");
    }

    #[test]
    fn test_names_are_ordered() {
        let registry = ToolRegistry::from_tools([
            Arc::new(Named("get_news", "News")) as Arc<dyn Tool>,
            Arc::new(Named("get_cashflow", "Cash flow")),
        ]);

        assert_eq!(registry.names(), ["get_cashflow", "get_news"]);
        assert!(registry.get("get_indicators").is_none());
    }
}
