//! Isolated task execution
//!
//! A [`TaskLauncher`] runs one task behind an isolation boundary and always
//! returns a terminal record. [`ProcessLauncher`] spawns a worker process per
//! task; [`InProcessLauncher`] runs the task on its own tokio task behind a
//! panic boundary.

use agent_core::{DATE_FORMAT, Error, ResultRecord, Result, TaskSpec};
use agent_runtime::{RuntimeConfig, TaskRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::store::{FsOutputStore, OutputStore};

const STDERR_TAIL_CHARS: usize = 500;

/// Runs one task in isolation
#[async_trait]
pub trait TaskLauncher: Send + Sync {
    /// Existence check run before any task executes
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Run `spec`, giving up after `limit`
    ///
    /// Never fails: timeouts, crashes and bad worker output all come back as
    /// failed records. The task persists its own record under `output_root`;
    /// a timed-out task persists nothing.
    async fn launch(&self, spec: TaskSpec, output_root: &Path, limit: Duration) -> ResultRecord;
}

/// Human-readable form of a timeout
pub fn describe_timeout(limit: Duration) -> String {
    if limit.subsec_nanos() == 0 {
        format!("{}s", limit.as_secs())
    } else {
        format!("{}ms", limit.as_millis())
    }
}

fn timed_out(spec: &TaskSpec, limit: Duration) -> ResultRecord {
    ResultRecord::failed(
        spec.task_id,
        spec.subject.clone(),
        spec.as_of,
        format!("timeout after {}", describe_timeout(limit)),
    )
}

/// Spawns one worker process per task
///
/// The worker is invoked as `program [args..] --task T --subject S --date D
/// --output ROOT` and is expected to print the record JSON as the last line
/// of its stdout.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    runtime: Option<RuntimeConfig>,
}

impl ProcessLauncher {
    /// Launch workers with `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            runtime: None,
        }
    }

    /// Re-invoke the running executable's `task run` subcommand
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| Error::Config(format!("cannot locate worker executable: {e}")))?;
        Ok(Self::new(program).args(["task", "run"]))
    }

    /// Arguments placed before the per-task arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Extra environment variable for the worker
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Forward `config` to every worker through its environment
    ///
    /// Preflight then also requires a producer endpoint.
    pub fn runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime = Some(config);
        self
    }

    /// Per-task arguments appended after the base arguments
    pub fn worker_args(spec: &TaskSpec, output_root: &Path) -> Vec<String> {
        vec![
            "--task".to_string(),
            spec.task_id.id().to_string(),
            "--subject".to_string(),
            spec.subject.clone(),
            "--date".to_string(),
            spec.as_of.format(DATE_FORMAT).to_string(),
            "--output".to_string(),
            output_root.display().to_string(),
        ]
    }

    fn command(&self, spec: &TaskSpec, output_root: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(Self::worker_args(spec, output_root))
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(config) = &self.runtime {
            cmd.envs(config.to_env());
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }

    fn interpret(spec: &TaskSpec, status: std::process::ExitStatus, stdout: &str, stderr: &str) -> ResultRecord {
        let parsed = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| serde_json::from_str::<ResultRecord>(line.trim()).ok());

        if let Some(record) = parsed {
            if record.task_id() == spec.task_id && record.subject() == spec.subject {
                return record;
            }
            warn!(
                task = %spec.task_id,
                returned = %record.task_id(),
                "Worker returned a record for a different task"
            );
        }

        let tail = tail(stderr.trim(), STDERR_TAIL_CHARS);
        let reason = match (status.success(), tail.is_empty()) {
            (true, _) => "worker exited without a result record".to_string(),
            (false, true) => format!("worker exited with {status}"),
            (false, false) => format!("worker exited with {status}: {tail}"),
        };
        ResultRecord::failed(spec.task_id, spec.subject.clone(), spec.as_of, reason)
    }
}

#[async_trait]
impl TaskLauncher for ProcessLauncher {
    async fn preflight(&self) -> Result<()> {
        if self.program.components().count() > 1 {
            tokio::fs::metadata(&self.program).await.map_err(|e| {
                Error::Config(format!(
                    "worker executable {} not found: {e}",
                    self.program.display()
                ))
            })?;
        }

        if let Some(config) = &self.runtime {
            config.validate()?;
            config.require_producer()?;
        }
        Ok(())
    }

    async fn launch(&self, spec: TaskSpec, output_root: &Path, limit: Duration) -> ResultRecord {
        let child = match self.command(&spec, output_root).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(task = %spec.task_id, error = %e, "Failed to spawn worker");
                return ResultRecord::failed(
                    spec.task_id,
                    spec.subject.clone(),
                    spec.as_of,
                    format!("failed to spawn worker {}: {e}", self.program.display()),
                );
            }
        };
        debug!(task = %spec.task_id, pid = ?child.id(), "Worker spawned");

        // Dropping the child on timeout kills it.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ResultRecord::failed(
                    spec.task_id,
                    spec.subject.clone(),
                    spec.as_of,
                    format!("failed to collect worker output: {e}"),
                );
            }
            Err(_) => {
                warn!(task = %spec.task_id, timeout = %describe_timeout(limit), "Worker timed out");
                return timed_out(&spec, limit);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let record = Self::interpret(&spec, output.status, &stdout, &stderr);
        info!(task = %spec.task_id, status = %record.status(), exit = %output.status, "Worker finished");
        record
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}

/// Runs tasks on the orchestrator's runtime behind a panic boundary
///
/// The record is written to an [`FsOutputStore`] at the launch's output
/// root from inside the task, so a timed-out task never persists a record.
/// Aborting the task on timeout also aborts the graph it is running.
#[derive(Clone)]
pub struct InProcessLauncher {
    runner: TaskRunner,
}

impl InProcessLauncher {
    pub fn new(runner: TaskRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TaskLauncher for InProcessLauncher {
    async fn launch(&self, spec: TaskSpec, output_root: &Path, limit: Duration) -> ResultRecord {
        let runner = self.runner.clone();
        let store = FsOutputStore::new(output_root);
        let task_spec = spec.clone();

        let handle = tokio::spawn(async move {
            let record = runner.run(task_spec).await;
            if let Err(e) = store
                .write(record.subject(), record.as_of(), record.task_id(), &record)
                .await
            {
                warn!(task = %record.task_id(), error = %e, "Failed to persist record");
            }
            record
        });
        let abort = handle.abort_handle();

        match timeout(limit, handle).await {
            Ok(Ok(record)) => record,
            Ok(Err(join_error)) => ResultRecord::failed(
                spec.task_id,
                spec.subject.clone(),
                spec.as_of,
                format!("task aborted: {join_error}"),
            ),
            Err(_) => {
                abort.abort();
                warn!(task = %spec.task_id, timeout = %describe_timeout(limit), "Task timed out");
                timed_out(&spec, limit)
            }
        }
    }
}
