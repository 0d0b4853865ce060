//! Tool gateway framework for agent-rs
//!
//! This crate defines the [`ToolGateway`] contract the task graph calls
//! tools through, plus a registry of in-process [`Tool`]s, a gateway scoped
//! to a task's tool set and an HTTP gateway (behind the `http` feature).

pub mod gateway;
pub mod registry;
pub mod tool;

#[cfg(feature = "http")]
pub mod http;

pub use gateway::{RegistryGateway, ScopedGateway, ToolGateway, budget_exhausted, output_text};
pub use registry::ToolRegistry;
pub use tool::Tool;

#[cfg(feature = "http")]
pub use http::HttpToolGateway;
