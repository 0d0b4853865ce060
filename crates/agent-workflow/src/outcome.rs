//! Batch outcome accumulated during a run

use agent_core::{DATE_FORMAT, ResultRecord, TaskKind, TaskStatus};
use chrono::NaiveDate;
use comfy_table::{Table, presets::UTF8_FULL};
use std::path::PathBuf;
use std::time::Duration;

/// Exit code when at least one task completed
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when the batch aborted in Validate or Discover
pub const EXIT_ABORTED: i32 = 1;
/// Exit code when every task failed
pub const EXIT_NO_COMPLETIONS: i32 = 2;

/// Status of one planned task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub task_id: TaskKind,
    pub status: TaskStatus,
    /// Failure reason for failed tasks
    pub reason: Option<String>,
}

impl From<&ResultRecord> for TaskOutcome {
    fn from(record: &ResultRecord) -> Self {
        Self {
            task_id: record.task_id(),
            status: record.status(),
            reason: record.failure_reason().map(str::to_string),
        }
    }
}

/// Per-task statuses, elapsed time and artifacts of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    subject: String,
    as_of: NaiveDate,
    per_task: Vec<TaskOutcome>,
    elapsed: Duration,
    artifact_paths: Vec<PathBuf>,
    discovered: usize,
}

impl BatchOutcome {
    /// Empty outcome for `(subject, as_of)`
    pub fn new(subject: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            subject: subject.into(),
            as_of,
            per_task: Vec::new(),
            elapsed: Duration::ZERO,
            artifact_paths: Vec::new(),
            discovered: 0,
        }
    }

    /// Record the terminal status of one task
    pub fn record(&mut self, record: &ResultRecord) {
        self.per_task.push(TaskOutcome::from(record));
    }

    /// Replace a reported failure with a completed record found on disk
    ///
    /// Returns the replaced outcome. A task can persist its record and then
    /// miss its deadline; the persisted record wins.
    pub fn reconcile(&mut self, record: &ResultRecord) -> Option<TaskOutcome> {
        if !record.is_completed() {
            return None;
        }
        let entry = self
            .per_task
            .iter_mut()
            .find(|t| t.task_id == record.task_id() && t.status == TaskStatus::Failed)?;
        Some(std::mem::replace(entry, TaskOutcome::from(record)))
    }

    pub fn add_artifact(&mut self, path: PathBuf) {
        self.artifact_paths.push(path);
    }

    pub fn set_discovered(&mut self, count: usize) {
        self.discovered = count;
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn per_task(&self) -> &[TaskOutcome] {
        &self.per_task
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn artifact_paths(&self) -> &[PathBuf] {
        &self.artifact_paths
    }

    /// Number of records found in the Discover stage
    pub fn discovered(&self) -> usize {
        self.discovered
    }

    /// Status of `task_id`, if it ran
    pub fn status_of(&self, task_id: TaskKind) -> Option<TaskStatus> {
        self.per_task
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| t.status)
    }

    pub fn completed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.per_task
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.per_task
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
    }

    /// Partial success is success
    pub fn any_completed(&self) -> bool {
        self.completed().next().is_some()
    }

    /// Process exit code for a batch that reached Summarize
    pub fn exit_code(&self) -> i32 {
        if self.any_completed() {
            EXIT_SUCCESS
        } else {
            EXIT_NO_COMPLETIONS
        }
    }

    /// Summary table of every task's status
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Task", "Status", "Detail"]);

        for task in &self.per_task {
            table.add_row(vec![
                task.task_id.display_name().to_string(),
                task.status.to_string(),
                task.reason.clone().unwrap_or_default(),
            ]);
        }
        table
    }

    /// One-line summary
    pub fn headline(&self) -> String {
        format!(
            "{} {}: {}/{} tasks completed in {}, {} artifacts",
            self.subject,
            self.as_of.format(DATE_FORMAT),
            self.completed().count(),
            self.per_task.len(),
            format_elapsed(self.elapsed),
            self.artifact_paths.len()
        )
    }
}

/// Format a duration as `Xm Ys`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}
