//! Deterministic stand-in provider
//!
//! Replays a fixed script of producer messages. The reply is chosen by the
//! number of producer turns already in the conversation, so the provider is
//! stateless and the same conversation always yields the same message.

use crate::{CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result};
use async_trait::async_trait;
use tracing::debug;

/// Provider that replays a script of producer messages
///
/// Turn `n` returns `script[n]`; once the script is exhausted the last entry
/// repeats.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    script: Vec<Message>,
}

impl ScriptedProvider {
    /// Create a provider from a script
    pub fn new(script: Vec<Message>) -> Self {
        Self { script }
    }

    /// A provider that answers every turn with the same message
    pub fn repeating(message: Message) -> Self {
        Self::new(vec![message])
    }

    /// Number of scripted turns
    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let turn = request.producer_turns();
        let message = self
            .script
            .get(turn)
            .or_else(|| self.script.last())
            .cloned()
            .ok_or_else(|| LLMError::ProviderError("script is empty".to_string()))?;

        debug!(turn, tools = message.tool_invocations().len(), "Replaying scripted turn");
        Ok(CompletionResponse::new(message))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
