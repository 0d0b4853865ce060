//! End-to-end batch scenarios with deterministic collaborators

use agent_core::{Error, ResultRecord, TaskKind, TaskSpec, TaskStatus, parse_date};
use agent_llm::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ScriptedProvider, ToolInvocation,
};
use agent_runtime::{GraphConfig, TaskRunner};
use agent_tools::{RegistryGateway, Tool, ToolRegistry};
use agent_workflow::{
    BatchOrchestrator, BatchRequest, FsOutputStore, InProcessLauncher, MarkdownRenderer,
    OrchestratorConfig, OutputStore, Stage,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Provider that never answers within any reasonable deadline
struct StalledProvider;

#[async_trait]
impl LLMProvider for StalledProvider {
    async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(CompletionResponse::new(Message::producer(format!(
            "late report for {}",
            request.subject
        ))))
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Provider that refuses conversations framed for one analyst
struct RefusingProvider(&'static str);

#[async_trait]
impl LLMProvider for RefusingProvider {
    async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
        let framed_for_refused = request
            .messages
            .first()
            .is_some_and(|m| m.content.contains(self.0));
        if framed_for_refused {
            return Err(agent_llm::LLMError::RequestFailed("503 Service Unavailable".to_string()));
        }
        Ok(CompletionResponse::new(Message::producer("Fine.")))
    }

    fn name(&self) -> &str {
        "refusing"
    }
}

/// Tool whose upstream is always down
struct DownTool(&'static str);

#[async_trait]
impl Tool for DownTool {
    async fn execute(&self, _args: Value) -> agent_core::Result<Value> {
        Err(Error::Runner("upstream unavailable".to_string()))
    }

    fn name(&self) -> &str {
        self.0
    }

    fn description(&self) -> &str {
        "Always fails"
    }
}

struct Harness {
    _tmp: TempDir,
    store: Arc<FsOutputStore>,
    orchestrator: BatchOrchestrator,
}

fn harness(provider: Arc<dyn LLMProvider>, gateway: RegistryGateway, task_timeout: Duration) -> Harness {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(FsOutputStore::new(tmp.path()));
    let runner = TaskRunner::new(provider, Arc::new(gateway), GraphConfig::default());

    let config = OrchestratorConfig::builder()
        .task_timeout(task_timeout)
        .cooldown(Duration::ZERO)
        .build()
        .unwrap();

    let orchestrator = BatchOrchestrator::builder()
        .launcher(Arc::new(InProcessLauncher::new(runner)))
        .store(store.clone())
        .renderer(Arc::new(MarkdownRenderer::new(tmp.path())))
        .config(config)
        .build()
        .unwrap();

    Harness {
        _tmp: tmp,
        store,
        orchestrator,
    }
}

fn request(tasks: &[&str]) -> BatchRequest {
    BatchRequest::new("INTC")
        .as_of("2025-12-25")
        .tasks(tasks.iter().copied())
}

#[tokio::test]
async fn two_successful_tasks_complete_the_batch() {
    let h = harness(
        Arc::new(ScriptedProvider::repeating(Message::producer("Steady outlook."))),
        RegistryGateway::empty(),
        Duration::from_secs(10),
    );

    let outcome = h.orchestrator.run(&request(&["market", "news"])).await.unwrap();

    assert_eq!(outcome.per_task().len(), 2);
    assert!(outcome.per_task().iter().all(|t| t.status == TaskStatus::Completed));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.discovered(), 2);
    assert!(outcome.artifact_paths().iter().all(|p| p.is_file()));
}

#[tokio::test]
async fn single_timed_out_task_aborts_in_discover() {
    let h = harness(
        Arc::new(StalledProvider),
        RegistryGateway::empty(),
        Duration::from_millis(200),
    );

    let abort = h.orchestrator.run(&request(&["market"])).await.unwrap_err();

    assert_eq!(abort.stage, Stage::Discover);
    assert!(matches!(abort.error, Error::Discovery(_)));
    assert_eq!(abort.exit_code(), 1);

    let outcome = abort.outcome.unwrap();
    let market = &outcome.per_task()[0];
    assert_eq!(market.status, TaskStatus::Failed);
    assert!(market.reason.as_deref().unwrap().contains("timeout"));

    let date = parse_date("2025-12-25").unwrap();
    assert!(h.store.list_records("INTC", date).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_task_is_rejected_before_execution() {
    let h = harness(
        Arc::new(ScriptedProvider::repeating(Message::producer("never used"))),
        RegistryGateway::empty(),
        Duration::from_secs(10),
    );

    let abort = h
        .orchestrator
        .run(&request(&["market", "astrology"]))
        .await
        .unwrap_err();

    assert_eq!(abort.stage, Stage::Validate);
    assert!(matches!(abort.error, Error::Config(_)));
    assert_eq!(abort.exit_code(), 1);
    assert!(abort.outcome.is_none());

    let date = parse_date("2025-12-25").unwrap();
    assert!(h.store.list_records("INTC", date).await.unwrap().is_empty());
    assert!(!h.store.record_dir("INTC", date).exists());
}

#[tokio::test]
async fn failing_tools_do_not_fail_the_task() {
    let registry = Arc::new(ToolRegistry::new());
    for name in TaskKind::Market.default_tools() {
        registry.register(Arc::new(DownTool(*name)));
    }

    let provider = ScriptedProvider::new(vec![
        Message::producer("").with_tool_invocations(vec![
            ToolInvocation::new("c1", "get_stock_data", json!({"symbol": "INTC"})),
            ToolInvocation::new("c2", "get_indicators", json!({"indicator": "rsi"})),
        ]),
        Message::producer("Analysis without market data."),
    ]);
    let h = harness(
        Arc::new(provider),
        RegistryGateway::new(registry),
        Duration::from_secs(10),
    );

    let outcome = h.orchestrator.run(&request(&["market"])).await.unwrap();
    assert_eq!(outcome.status_of(TaskKind::Market), Some(TaskStatus::Completed));

    let date = parse_date("2025-12-25").unwrap();
    let records = h.store.list_records("INTC", date).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].report_text(), Some("Analysis without market data."));
}

#[tokio::test]
async fn partial_failure_is_success() {
    let h = harness(
        Arc::new(RefusingProvider("Bear Researcher")),
        RegistryGateway::empty(),
        Duration::from_secs(10),
    );

    let outcome = h.orchestrator.run(&request(&["bull", "bear"])).await.unwrap();
    assert_eq!(outcome.status_of(TaskKind::Bull), Some(TaskStatus::Completed));
    assert_eq!(outcome.status_of(TaskKind::Bear), Some(TaskStatus::Failed));
    assert_eq!(outcome.discovered(), 2);
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn same_spec_yields_identical_reports() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Message::producer("").with_tool_invocations(vec![ToolInvocation::new(
            "c1",
            "get_news",
            json!({}),
        )]),
        Message::producer("Deterministic report."),
    ]));
    let runner = TaskRunner::new(provider, Arc::new(RegistryGateway::empty()), GraphConfig::default());
    let spec = TaskSpec::new(TaskKind::News, "INTC", parse_date("2025-12-25").unwrap());

    let first: ResultRecord = runner.run(spec.clone()).await;
    let second: ResultRecord = runner.run(spec).await;
    assert_eq!(first.report_text(), second.report_text());
    assert_eq!(first.report_text(), Some("Deterministic report."));
}
