//! Message types for task conversations
//!
//! A conversation is an append-only log of producer, tool and system
//! messages. Producer messages may request tool invocations; every
//! invocation is answered by exactly one tool-role message.

use agent_core::{GatewayError, ToolErrorKind};
use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Output of the reasoning collaborator
    Producer,
    /// Result of a tool invocation
    Tool,
    /// Framing injected by the runtime
    System,
}

/// A tool call requested by the producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Identifier correlating the call with its result
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments (JSON object)
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    /// Create a tool invocation
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of one tool call as produced by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Invocation this answers
    pub call_id: String,
    /// Tool that was called
    pub tool_name: String,
    /// Tool output, or the error text when `error` is set
    pub output: String,
    /// Set when the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorKind>,
}

impl ToolResult {
    /// A successful tool result
    pub fn ok(call_id: impl Into<String>, tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: output.into(),
            error: None,
        }
    }

    /// A failed tool result carrying the gateway error text
    pub fn err(call_id: impl Into<String>, error: &GatewayError) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: error.tool.clone(),
            output: error.message.clone(),
            error: Some(error.kind),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Correlation data carried by tool-role messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReply {
    /// Invocation this answers
    pub call_id: String,
    /// Tool that was called
    pub tool_name: String,
    /// Set when the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorKind>,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by a producer message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_invocations: Option<Vec<ToolInvocation>>,

    /// Correlation data for tool-role messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ToolReply>,
}

impl Message {
    /// Create a producer message with text
    pub fn producer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Producer,
            content: text.into(),
            tool_invocations: None,
            reply: None,
        }
    }

    /// Create a system message with text
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            tool_invocations: None,
            reply: None,
        }
    }

    /// Create a tool-role message from a tool result
    ///
    /// Failed results are prefixed with `Error:` so the producer sees the
    /// failure in plain text.
    pub fn tool(result: ToolResult) -> Self {
        let content = if result.is_error() {
            format!("Error: {}", result.output)
        } else {
            result.output
        };
        Self {
            role: Role::Tool,
            content,
            tool_invocations: None,
            reply: Some(ToolReply {
                call_id: result.call_id,
                tool_name: result.tool_name,
                error: result.error,
            }),
        }
    }

    /// Attach tool invocations to a producer message
    pub fn with_tool_invocations(mut self, invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = Some(invocations);
        self
    }

    /// Requested tool invocations (empty for non-producer messages)
    pub fn tool_invocations(&self) -> &[ToolInvocation] {
        self.tool_invocations.as_deref().unwrap_or_default()
    }

    /// Check if this message requests any tool invocation
    pub fn has_tool_invocations(&self) -> bool {
        !self.tool_invocations().is_empty()
    }

    /// Whether this is a tool-role message reporting a failure
    pub fn is_tool_error(&self) -> bool {
        self.reply.as_ref().is_some_and(|r| r.error.is_some())
    }
}
