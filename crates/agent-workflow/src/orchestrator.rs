//! Batch orchestration
//!
//! A batch runs through five strictly ordered stages:
//!
//! 1. **Validate**: build the [`BatchPlan`] and preflight the collaborators.
//!    Any failure aborts before a task runs.
//! 2. **Execute**: launch every planned task in order, one at a time. Task
//!    failures are recorded, never fatal.
//! 3. **Discover**: read back the records this batch persisted. Finding
//!    none aborts the batch. A completed record overrides a failure the
//!    launcher reported for the same task.
//! 4. **Transform**: render each record; rendering failures are skipped.
//! 5. **Summarize**: finalize the [`BatchOutcome`].

use agent_core::{Error, Result, TaskStatus};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error as ThisError;
use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::launcher::TaskLauncher;
use crate::outcome::{BatchOutcome, EXIT_ABORTED};
use crate::plan::{BatchPlan, BatchRequest};
use crate::render::ReportRenderer;
use crate::store::OutputStore;

/// Pipeline stages of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Execute,
    Discover,
    Transform,
    Summarize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Execute => "execute",
            Stage::Discover => "discover",
            Stage::Transform => "transform",
            Stage::Summarize => "summarize",
        };
        f.write_str(name)
    }
}

/// A fatal batch failure
///
/// Carries the partial outcome when tasks had already run.
#[derive(Debug, ThisError)]
#[error("batch aborted in {stage} stage: {error}")]
pub struct BatchAbort {
    pub stage: Stage,
    #[source]
    pub error: Error,
    pub outcome: Option<BatchOutcome>,
}

impl BatchAbort {
    fn new(stage: Stage, error: Error) -> Self {
        error!(stage = %stage, error = %error, "Batch aborted");
        Self {
            stage,
            error,
            outcome: None,
        }
    }

    fn with_outcome(mut self, outcome: BatchOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Process exit code for an aborted batch
    pub fn exit_code(&self) -> i32 {
        EXIT_ABORTED
    }
}

/// Runs batches of independent tasks
///
/// # Example
///
/// ```no_run
/// use agent_workflow::{BatchOrchestrator, BatchRequest, FsOutputStore, MarkdownRenderer, ProcessLauncher};
/// use std::sync::Arc;
///
/// # async fn example() -> agent_core::Result<()> {
/// let orchestrator = BatchOrchestrator::builder()
///     .launcher(Arc::new(ProcessLauncher::current_exe()?))
///     .store(Arc::new(FsOutputStore::new("results")))
///     .renderer(Arc::new(MarkdownRenderer::new("results")))
///     .build()?;
///
/// let request = BatchRequest::new("INTC").tasks(["market", "news"]);
/// match orchestrator.run(&request).await {
///     Ok(outcome) => println!("{}", outcome.to_table()),
///     Err(abort) => eprintln!("{abort}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct BatchOrchestrator {
    launcher: Arc<dyn TaskLauncher>,
    store: Arc<dyn OutputStore>,
    renderer: Arc<dyn ReportRenderer>,
    config: OrchestratorConfig,
}

impl BatchOrchestrator {
    /// Create a new orchestrator builder
    pub fn builder() -> BatchOrchestratorBuilder {
        BatchOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one batch through every stage
    ///
    /// # Errors
    ///
    /// Returns [`BatchAbort`] when Validate or Discover fails.
    pub async fn run(&self, request: &BatchRequest) -> std::result::Result<BatchOutcome, BatchAbort> {
        let started = Instant::now();
        let started_at = Utc::now();

        let plan = self
            .validate(request)
            .await
            .map_err(|e| BatchAbort::new(Stage::Validate, e))?;

        let mut outcome = self.execute(&plan).await;

        let records = match self.discover(&plan, started_at).await {
            Ok(records) => records,
            Err(e) => {
                outcome.set_elapsed(started.elapsed());
                return Err(BatchAbort::new(Stage::Discover, e).with_outcome(outcome));
            }
        };
        outcome.set_discovered(records.len());
        for record in &records {
            if let Some(reported) = outcome.reconcile(record) {
                warn!(
                    stage = %Stage::Discover,
                    task = %record.task_id(),
                    reported = reported.reason.as_deref().unwrap_or_default(),
                    "Task reported failure but persisted a completed record"
                );
            }
        }

        self.transform(&plan, &records, &mut outcome).await;

        outcome.set_elapsed(started.elapsed());
        info!(stage = %Stage::Summarize, summary = %outcome.headline(), "Batch finished");
        Ok(outcome)
    }

    async fn validate(&self, request: &BatchRequest) -> Result<BatchPlan> {
        self.config.validate()?;
        let plan = BatchPlan::from_request(request, self.store.root())?;

        self.launcher.preflight().await?;
        self.store.preflight().await?;
        self.renderer.preflight().await?;

        info!(
            stage = %Stage::Validate,
            subject = %plan.subject(),
            as_of = %plan.as_of(),
            tasks = plan.task_ids().len(),
            output_root = %plan.output_root().display(),
            "Batch plan validated"
        );
        Ok(plan)
    }

    async fn execute(&self, plan: &BatchPlan) -> BatchOutcome {
        let mut outcome = BatchOutcome::new(plan.subject(), plan.as_of());
        let total = plan.task_ids().len();

        for (index, spec) in plan.specs().enumerate() {
            let task = spec.task_id;
            info!(stage = %Stage::Execute, task = %task, position = index + 1, total, "Launching task");

            let task_started = Instant::now();
            let record = self
                .launcher
                .launch(spec, plan.output_root(), self.config.task_timeout)
                .await;
            let elapsed_ms = u64::try_from(task_started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match record.status() {
                TaskStatus::Completed => info!(task = %task, elapsed_ms, "Task completed"),
                TaskStatus::Failed => warn!(
                    task = %task,
                    elapsed_ms,
                    reason = record.failure_reason().unwrap_or_default(),
                    "Task failed"
                ),
            }
            outcome.record(&record);

            if index + 1 < total && !self.config.cooldown.is_zero() {
                tokio::time::sleep(self.config.cooldown).await;
            }
        }

        if !outcome.any_completed() {
            warn!(stage = %Stage::Execute, "Every task failed");
        }
        outcome
    }

    async fn discover(
        &self,
        plan: &BatchPlan,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<Vec<agent_core::ResultRecord>> {
        let records: Vec<_> = self
            .store
            .list_records(plan.subject(), plan.as_of())
            .await
            .map_err(|e| Error::Discovery(format!("listing records failed: {e}")))?
            .into_iter()
            .filter(|r| r.produced_at() >= started_at && plan.task_ids().contains(&r.task_id()))
            .collect();

        if records.is_empty() {
            return Err(Error::Discovery(format!(
                "no result records found for {} on {}",
                plan.subject(),
                plan.as_of()
            )));
        }

        info!(stage = %Stage::Discover, records = records.len(), "Records discovered");
        Ok(records)
    }

    async fn transform(
        &self,
        plan: &BatchPlan,
        records: &[agent_core::ResultRecord],
        outcome: &mut BatchOutcome,
    ) {
        for record in records {
            match self.renderer.render(record).await {
                Ok(path) => outcome.add_artifact(path),
                Err(e) => warn!(
                    stage = %Stage::Transform,
                    task = %record.task_id(),
                    error = %e,
                    "Rendering failed, skipping"
                ),
            }
        }

        match self
            .renderer
            .render_combined(plan.subject(), plan.as_of(), records)
            .await
        {
            Ok(Some(path)) => outcome.add_artifact(path),
            Ok(None) => {}
            Err(e) => warn!(stage = %Stage::Transform, error = %e, "Combined rendering failed, skipping"),
        }

        info!(stage = %Stage::Transform, artifacts = outcome.artifact_paths().len(), "Artifacts rendered");
    }
}

/// Builder for BatchOrchestrator
pub struct BatchOrchestratorBuilder {
    launcher: Option<Arc<dyn TaskLauncher>>,
    store: Option<Arc<dyn OutputStore>>,
    renderer: Option<Arc<dyn ReportRenderer>>,
    config: OrchestratorConfig,
}

impl BatchOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            launcher: None,
            store: None,
            renderer: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Set the task launcher
    pub fn launcher(mut self, launcher: Arc<dyn TaskLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Set the output store
    ///
    /// Its root is where launched tasks write and Discover reads.
    pub fn store(mut self, store: Arc<dyn OutputStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the report renderer
    pub fn renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the orchestrator configuration
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator is missing or the configuration is
    /// invalid
    pub fn build(self) -> Result<BatchOrchestrator> {
        let launcher = self
            .launcher
            .ok_or_else(|| Error::Config("launcher not set".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| Error::Config("output store not set".to_string()))?;
        let renderer = self
            .renderer
            .ok_or_else(|| Error::Config("report renderer not set".to_string()))?;

        self.config.validate()?;

        Ok(BatchOrchestrator {
            launcher,
            store,
            renderer,
            config: self.config,
        })
    }
}

impl Default for BatchOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::describe_timeout;
    use crate::render::MarkdownRenderer;
    use crate::store::FsOutputStore;
    use agent_core::{ResultRecord, TaskKind, TaskSpec};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Launcher that writes a canned record per task and remembers the order
    struct CannedLauncher {
        fail: Vec<TaskKind>,
        late: Vec<TaskKind>,
        launched: Mutex<Vec<(TaskKind, PathBuf)>>,
    }

    #[async_trait]
    impl TaskLauncher for CannedLauncher {
        async fn launch(&self, spec: TaskSpec, root: &Path, limit: Duration) -> ResultRecord {
            self.launched
                .lock()
                .unwrap()
                .push((spec.task_id, root.to_path_buf()));
            let record = if self.fail.contains(&spec.task_id) {
                ResultRecord::failed(spec.task_id, spec.subject.clone(), spec.as_of, "boom")
            } else {
                ResultRecord::completed(spec.task_id, spec.subject.clone(), spec.as_of, "fine")
            };
            FsOutputStore::new(root)
                .write(&spec.subject, spec.as_of, spec.task_id, &record)
                .await
                .unwrap();

            if self.late.contains(&spec.task_id) {
                return ResultRecord::failed(
                    spec.task_id,
                    spec.subject.clone(),
                    spec.as_of,
                    format!("timeout after {}", describe_timeout(limit)),
                );
            }
            record
        }
    }

    fn launched_tasks(launcher: &CannedLauncher) -> Vec<TaskKind> {
        launcher.launched.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    struct BrokenRenderer;

    #[async_trait]
    impl ReportRenderer for BrokenRenderer {
        async fn render(&self, _record: &ResultRecord) -> Result<PathBuf> {
            Err(Error::Render("disk full".to_string()))
        }
    }

    fn setup(fail: Vec<TaskKind>, renderer: Arc<dyn ReportRenderer>, tmp: &TempDir) -> (BatchOrchestrator, Arc<CannedLauncher>) {
        setup_late(fail, Vec::new(), renderer, tmp)
    }

    fn setup_late(
        fail: Vec<TaskKind>,
        late: Vec<TaskKind>,
        renderer: Arc<dyn ReportRenderer>,
        tmp: &TempDir,
    ) -> (BatchOrchestrator, Arc<CannedLauncher>) {
        let store = Arc::new(FsOutputStore::new(tmp.path()));
        let launcher = Arc::new(CannedLauncher {
            fail,
            late,
            launched: Mutex::new(Vec::new()),
        });
        let config = OrchestratorConfig::builder()
            .cooldown(Duration::ZERO)
            .build()
            .unwrap();
        let orchestrator = BatchOrchestrator::builder()
            .launcher(launcher.clone())
            .store(store)
            .renderer(renderer)
            .config(config)
            .build()
            .unwrap();
        (orchestrator, launcher)
    }

    #[tokio::test]
    async fn test_runs_tasks_in_plan_order() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MarkdownRenderer::new(tmp.path()));
        let (orchestrator, launcher) = setup(vec![TaskKind::Bear], renderer, &tmp);

        let request = BatchRequest::new("intc")
            .as_of("2025-12-25")
            .tasks(["trader", "bear", "bull"]);
        let outcome = orchestrator.run(&request).await.unwrap();

        assert_eq!(
            launched_tasks(&launcher),
            vec![TaskKind::Trader, TaskKind::Bear, TaskKind::Bull]
        );
        assert_eq!(outcome.subject(), "INTC");
        assert_eq!(outcome.per_task().len(), 3);
        assert_eq!(outcome.status_of(TaskKind::Bear), Some(TaskStatus::Failed));
        assert_eq!(outcome.discovered(), 3);
        // three documents plus the combined one
        assert_eq!(outcome.artifact_paths().len(), 4);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_render_failures_are_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let (orchestrator, _) = setup(vec![], Arc::new(BrokenRenderer), &tmp);

        let request = BatchRequest::new("INTC").as_of("2025-12-25").tasks(["market"]);
        let outcome = orchestrator.run(&request).await.unwrap();

        assert!(outcome.artifact_paths().is_empty());
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_all_failed_still_summarizes() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MarkdownRenderer::new(tmp.path()));
        let (orchestrator, _) = setup(vec![TaskKind::Market], renderer, &tmp);

        let request = BatchRequest::new("INTC").as_of("2025-12-25").tasks(["market"]);
        let outcome = orchestrator.run(&request).await.unwrap();
        assert_eq!(outcome.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_tasks_write_under_the_store_root() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MarkdownRenderer::new(tmp.path()));
        let (orchestrator, launcher) = setup(vec![], renderer, &tmp);

        let request = BatchRequest::new("INTC").as_of("2025-12-25").tasks(["market", "news"]);
        let outcome = orchestrator.run(&request).await.unwrap();

        assert!(
            launcher
                .launched
                .lock()
                .unwrap()
                .iter()
                .all(|(_, root)| root == tmp.path())
        );
        assert_eq!(outcome.discovered(), 2);
    }

    #[tokio::test]
    async fn test_persisted_record_overrides_late_timeout() {
        let tmp = TempDir::new().unwrap();
        let renderer = Arc::new(MarkdownRenderer::new(tmp.path()));
        let (orchestrator, _) = setup_late(vec![], vec![TaskKind::News], renderer, &tmp);

        let request = BatchRequest::new("INTC").as_of("2025-12-25").tasks(["news"]);
        let outcome = orchestrator.run(&request).await.unwrap();

        assert_eq!(outcome.status_of(TaskKind::News), Some(TaskStatus::Completed));
        assert_eq!(outcome.discovered(), 1);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        assert!(matches!(
            BatchOrchestrator::builder().build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Discover.to_string(), "discover");
    }
}
