//! Core types shared across agent-rs
//!
//! This crate defines the task descriptors, terminal result records and the
//! error taxonomy used by the task runtime and the batch orchestrator.

pub mod error;
pub mod record;
pub mod task;

pub use error::{Error, GatewayError, Result, ToolErrorKind};
pub use record::{ResultRecord, TaskStatus};
pub use task::{DATE_FORMAT, TaskKind, TaskSpec, parse_date};
