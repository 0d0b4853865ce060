//! Runs one task end to end and always yields a terminal record

use agent_core::{Error, ResultRecord, TaskSpec};
use agent_llm::LLMProvider;
use agent_tools::ToolGateway;
use std::any::Any;
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::config::GraphConfig;
use crate::graph::TaskGraph;

/// Executes task graphs and converts their outcome into a [`ResultRecord`]
///
/// `run` never fails: graph construction errors, producer failures, a
/// conversation without producer output and panics inside the graph all
/// become failed records. A blank final producer message still completes.
///
/// The graph runs on its own tokio task; dropping the `run` future aborts it.
#[derive(Clone)]
pub struct TaskRunner {
    provider: Arc<dyn LLMProvider>,
    gateway: Arc<dyn ToolGateway>,
    config: GraphConfig,
}

impl TaskRunner {
    /// Create a runner over shared collaborators
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        gateway: Arc<dyn ToolGateway>,
        config: GraphConfig,
    ) -> Self {
        Self {
            provider,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Run `spec` to completion
    pub async fn run(&self, spec: TaskSpec) -> ResultRecord {
        let task = spec.task_id;
        let subject = spec.subject.clone();
        let as_of = spec.as_of;

        info!(task = %task, subject = %subject, as_of = %as_of, "Running task");

        let graph = match TaskGraph::new(
            spec,
            self.provider.clone(),
            self.gateway.clone(),
            self.config.clone(),
        ) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(task = %task, error = %e, "Task rejected");
                return ResultRecord::failed(task, subject, as_of, e.to_string());
            }
        };

        let handle = tokio::spawn(graph.run());
        let _abort = AbortOnDrop(handle.abort_handle());

        let outcome = match handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(task = %task, error = %e, "Task failed");
                return ResultRecord::failed(task, subject, as_of, e.to_string());
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    format!("task panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "task cancelled".to_string()
                };
                error!(task = %task, reason = %reason, "Task aborted");
                return ResultRecord::failed(task, subject, as_of, reason);
            }
        };

        match outcome.report {
            Some(report) => {
                info!(
                    task = %task,
                    produce_steps = outcome.produce_steps,
                    tool_calls = outcome.tool_calls,
                    report_length = report.len(),
                    "Task completed"
                );
                ResultRecord::completed(task, subject, as_of, report)
            }
            None => {
                let e = Error::Runner("producer returned no message".to_string());
                warn!(task = %task, error = %e, "Task failed");
                ResultRecord::failed(task, subject, as_of, e.to_string())
            }
        }
    }
}

/// Aborts the graph task when `run` is dropped before it finishes
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
