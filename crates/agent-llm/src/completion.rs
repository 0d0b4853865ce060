//! Completion request and response types

use crate::Message;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Request for the next producer message, carrying the full conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (provider-specific)
    pub model: String,

    /// Subject under analysis
    pub subject: String,

    /// Analysis date
    pub as_of: NaiveDate,

    /// Conversation history
    pub messages: Vec<Message>,

    /// Tools the producer may request
    #[serde(default)]
    pub tools: Vec<String>,

    /// Tool calls still available to this task
    pub tool_calls_remaining: u32,
}

/// Response carrying the next producer message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated producer message
    pub message: Message,

    /// Token usage statistics, when the provider reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Wrap a message without usage statistics
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: usize,

    /// Number of output tokens
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

impl CompletionRequest {
    /// Create a builder for completion requests
    pub fn builder(model: impl Into<String>, subject: impl Into<String>, as_of: NaiveDate) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model, subject, as_of)
    }

    /// Number of producer messages already in the conversation
    pub fn producer_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == crate::Role::Producer)
            .count()
    }
}

/// Builder for CompletionRequest
pub struct CompletionRequestBuilder {
    model: String,
    subject: String,
    as_of: NaiveDate,
    messages: Vec<Message>,
    tools: Vec<String>,
    tool_calls_remaining: u32,
}

impl CompletionRequestBuilder {
    /// Create a new builder
    pub fn new(model: impl Into<String>, subject: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            model: model.into(),
            subject: subject.into(),
            as_of,
            messages: Vec::new(),
            tools: Vec::new(),
            tool_calls_remaining: 0,
        }
    }

    /// Set the conversation messages
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a single message
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the available tools
    pub fn tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the remaining tool-call budget
    pub fn tool_calls_remaining(mut self, remaining: u32) -> Self {
        self.tool_calls_remaining = remaining;
        self
    }

    /// Build the completion request
    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            subject: self.subject,
            as_of: self.as_of,
            messages: self.messages,
            tools: self.tools,
            tool_calls_remaining: self.tool_calls_remaining,
        }
    }
}
