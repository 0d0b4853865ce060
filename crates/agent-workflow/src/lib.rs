//! Batch orchestration for agent-rs
//!
//! This crate runs a set of independent analyst tasks for one subject and
//! date, each behind an isolation boundary, then discovers their records,
//! renders them and summarizes the batch.

pub mod config;
pub mod launcher;
pub mod orchestrator;
pub mod outcome;
pub mod plan;
pub mod render;
pub mod store;

// Re-export for convenience
pub use config::{OrchestratorConfig, OrchestratorConfigBuilder};
pub use launcher::{InProcessLauncher, ProcessLauncher, TaskLauncher, describe_timeout};
pub use orchestrator::{BatchAbort, BatchOrchestrator, BatchOrchestratorBuilder, Stage};
pub use outcome::{
    BatchOutcome, EXIT_ABORTED, EXIT_NO_COMPLETIONS, EXIT_SUCCESS, TaskOutcome, format_elapsed,
};
pub use plan::{BatchPlan, BatchRequest, normalize_subject};
pub use render::{COMBINED_FILE_NAME, MarkdownRenderer, ReportRenderer};
pub use store::{DEFAULT_OUTPUT_ROOT, FsOutputStore, OutputStore};
