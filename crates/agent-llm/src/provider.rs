//! Reasoning collaborator trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for reasoning collaborators
///
/// A provider turns the current conversation into the next producer
/// message. Content generation lives entirely behind this trait; the task
/// graph only inspects the returned text and tool invocations.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate the next producer message
    ///
    /// # Arguments
    ///
    /// * `request` - The conversation so far plus the permitted tools
    ///
    /// # Returns
    ///
    /// The completion response with the producer message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "scripted", "http")
    fn name(&self) -> &str;
}
