//! Task runtime for agent-rs
//!
//! This crate provides the bounded tool-call loop that executes one analyst
//! task ([`TaskGraph`]), the [`TaskRunner`] that turns every execution into a
//! terminal record, and the [`AgentRuntime`] that wires the collaborators.

pub mod config;
pub mod graph;
pub mod runner;
pub mod runtime;

// Re-export key types
pub use config::{GraphConfig, RuntimeConfig, RuntimeConfigBuilder, keys};
pub use graph::{ConversationState, GraphOutcome, GraphStep, TaskGraph, next_step};
pub use runner::TaskRunner;
pub use runtime::{AgentRuntime, AgentRuntimeBuilder};
