//! Reasoning collaborator abstraction layer for agent-rs
//!
//! This crate provides the conversation types exchanged between the task
//! graph and its reasoning collaborator. It includes:
//!
//! - Message types (producer, tool and system roles)
//! - Completion request/response types
//! - Provider trait for reasoning collaborators
//! - A scripted stand-in provider and an HTTP provider (behind `http`)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;

// Re-export main types
pub use completion::{CompletionRequest, CompletionRequestBuilder, CompletionResponse, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role, ToolInvocation, ToolReply, ToolResult};
pub use provider::LLMProvider;
pub use providers::ScriptedProvider;

#[cfg(feature = "http")]
pub use providers::HttpProvider;
