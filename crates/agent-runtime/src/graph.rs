//! Bounded tool-call loop for a single task
//!
//! The graph is an explicit state machine:
//!
//! ```text
//! Produce -> Decide -> InvokeTools -> Produce -> ...
//!                  \-> Finalize
//! ```
//!
//! [`next_step`] is the pure transition function. `Decide` continues to
//! `InvokeTools` iff the latest producer message requested at least one tool
//! and the tool-call budget is not spent. Every `InvokeTools` step consumes
//! at least one call, so a task runs `Produce` at most `budget + 1` times.

use agent_core::{Error, Result, TaskSpec};
use agent_llm::{CompletionRequest, LLMProvider, Message, Role, ToolInvocation, ToolResult};
use agent_tools::{ScopedGateway, ToolGateway, budget_exhausted};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GraphConfig;

const PREVIEW_CHARS: usize = 200;

/// Mutable per-execution conversation record
///
/// Owned by exactly one graph execution. The message log is append-only and
/// the tool-call budget only ever decreases.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    subject: String,
    as_of: NaiveDate,
    tool_calls_remaining: u32,
}

impl ConversationState {
    /// Create an empty conversation with the given budget
    pub fn new(subject: impl Into<String>, as_of: NaiveDate, tool_calls_remaining: u32) -> Self {
        Self {
            messages: Vec::new(),
            subject: subject.into(),
            as_of,
            tool_calls_remaining,
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn tool_calls_remaining(&self) -> u32 {
        self.tool_calls_remaining
    }

    /// The most recent producer message
    pub fn last_producer(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Producer)
    }

    /// Spend one tool call; returns false once the budget is exhausted
    pub fn consume_tool_call(&mut self) -> bool {
        if self.tool_calls_remaining == 0 {
            return false;
        }
        self.tool_calls_remaining -= 1;
        true
    }
}

/// States of the task graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStep {
    /// Ask the producer for the next message
    Produce,
    /// Choose between another tool round and finalizing
    Decide,
    /// Execute the tools the latest producer message requested
    InvokeTools,
    /// Terminal: extract the report
    Finalize,
}

/// Pure transition function of the task graph
pub fn next_step(step: GraphStep, state: &ConversationState) -> GraphStep {
    match step {
        GraphStep::Produce => GraphStep::Decide,
        GraphStep::Decide => {
            let wants_tools = state
                .last_producer()
                .is_some_and(Message::has_tool_invocations);
            if wants_tools && state.tool_calls_remaining() > 0 {
                GraphStep::InvokeTools
            } else {
                GraphStep::Finalize
            }
        }
        GraphStep::InvokeTools => GraphStep::Produce,
        GraphStep::Finalize => GraphStep::Finalize,
    }
}

/// Statistics and report of a finished graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOutcome {
    /// Content of the last producer message, if any
    pub report: Option<String>,
    /// Number of `Produce` steps executed
    pub produce_steps: usize,
    /// Budget units spent, including invocations the task scope rejected
    pub tool_calls: usize,
    /// Number of tool results that were errors
    pub tool_errors: usize,
    /// Budget left when the graph finalized
    pub tool_calls_remaining: u32,
}

/// Instruction handed to the producer after the framing message
fn producer_prompt(spec: &TaskSpec) -> String {
    let gather = if spec.tool_set.is_empty() {
        "Work from your own reasoning; no tools are available."
    } else {
        "Request the permitted tools for the data you need."
    };
    format!(
        "Write the {} report for {} as of {}. {gather} When the analysis is done, \
         reply with the complete report and no tool requests.",
        spec.task_id.display_name(),
        spec.subject,
        spec.as_of,
    )
}

/// One task's execution graph
pub struct TaskGraph {
    spec: TaskSpec,
    provider: Arc<dyn LLMProvider>,
    gateway: ScopedGateway,
    config: GraphConfig,
}

impl TaskGraph {
    /// Build a graph for `spec`
    ///
    /// The gateway is scoped to the task's tool set.
    pub fn new(
        spec: TaskSpec,
        provider: Arc<dyn LLMProvider>,
        gateway: Arc<dyn ToolGateway>,
        config: GraphConfig,
    ) -> Result<Self> {
        if spec.subject.trim().is_empty() {
            return Err(Error::Config("task subject must not be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }

        let gateway = ScopedGateway::for_task(gateway, &spec);
        Ok(Self {
            spec,
            provider,
            gateway,
            config,
        })
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    /// Fresh conversation seeded from the task spec
    pub fn initial_state(&self) -> ConversationState {
        let mut state = ConversationState::new(
            self.spec.subject.clone(),
            self.spec.as_of,
            self.config.max_tool_calls,
        );

        let kind = self.spec.task_id;
        let tools = if self.spec.tool_set.is_empty() {
            "none".to_string()
        } else {
            self.spec.tool_set.join(", ")
        };
        state.push(Message::system(format!(
            "You are the {} ({}). Subject: {}. Date: {}. Permitted tools: {}.",
            kind.display_name(),
            kind.description(),
            self.spec.subject,
            self.spec.as_of,
            tools,
        )));
        state.push(Message::system(producer_prompt(&self.spec)));
        state
    }

    /// Produce the next producer message for the current state
    pub async fn produce(&self, state: &ConversationState) -> Result<Message> {
        let request = CompletionRequest::builder(
            &self.config.model,
            state.subject(),
            state.as_of(),
        )
        .messages(state.messages().to_vec())
        .tools(self.spec.tool_set.clone())
        .tool_calls_remaining(state.tool_calls_remaining())
        .build();

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::Runner(format!("producer '{}' failed: {e}", self.provider.name())))?;

        let mut message = response.message;
        if message.role != Role::Producer {
            warn!(role = ?message.role, "Provider returned a non-producer role, treating as producer");
            message.role = Role::Producer;
        }
        Ok(message)
    }

    /// Execute the tool invocations of `message`
    ///
    /// Gateway errors become error results; they never abort the task. Each
    /// call spends one unit of budget, and invocations beyond the budget are
    /// answered with a `BudgetExhausted` error without being executed.
    pub async fn invoke_tools(
        &self,
        state: &mut ConversationState,
        invocations: &[ToolInvocation],
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(invocations.len());

        for invocation in invocations {
            if !state.consume_tool_call() {
                warn!(tool = %invocation.name, "Tool call budget exhausted, skipping");
                results.push(ToolResult::err(
                    invocation.id.clone(),
                    &budget_exhausted(&invocation.name),
                ));
                continue;
            }

            let input_preview: String = invocation
                .arguments
                .to_string()
                .chars()
                .take(PREVIEW_CHARS)
                .collect();
            info!(
                tool_name = %invocation.name,
                tool_id = %invocation.id,
                input_preview = %input_preview,
                remaining = state.tool_calls_remaining(),
                "Executing tool"
            );

            let start_time = Instant::now();
            let result = self
                .gateway
                .invoke(&invocation.name, invocation.arguments.clone())
                .await;
            let duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(output) => {
                    debug!(
                        tool_name = %invocation.name,
                        duration_ms,
                        result_length = output.len(),
                        "Tool execution succeeded"
                    );
                    results.push(ToolResult::ok(
                        invocation.id.clone(),
                        invocation.name.clone(),
                        output,
                    ));
                }
                Err(e) => {
                    warn!(
                        tool_name = %invocation.name,
                        duration_ms,
                        error = %e,
                        "Tool execution failed"
                    );
                    results.push(ToolResult::err(invocation.id.clone(), &e));
                }
            }
        }

        results
    }

    /// Extract the report: the last producer message's text
    pub fn finalize(state: &ConversationState) -> Option<String> {
        state.last_producer().map(|m| m.content.clone())
    }

    /// Drive the graph from `Produce` to `Finalize`
    pub async fn run(self) -> Result<GraphOutcome> {
        let task = self.spec.task_id;
        let mut state = self.initial_state();
        let mut step = GraphStep::Produce;
        let mut produce_steps = 0;
        let mut tool_calls = 0;
        let mut tool_errors = 0;

        info!(
            task = %task,
            subject = %self.spec.subject,
            budget = state.tool_calls_remaining(),
            "Task graph started"
        );

        loop {
            match step {
                GraphStep::Produce => {
                    produce_steps += 1;
                    let message = self.produce(&state).await?;
                    let preview: String = message.content.chars().take(PREVIEW_CHARS).collect();
                    debug!(
                        task = %task,
                        iteration = produce_steps,
                        tool_requests = message.tool_invocations().len(),
                        preview = %preview,
                        "Producer message received"
                    );
                    state.push(message);
                }
                GraphStep::Decide => {}
                GraphStep::InvokeTools => {
                    let invocations = state
                        .last_producer()
                        .map(|m| m.tool_invocations().to_vec())
                        .unwrap_or_default();
                    let before = state.tool_calls_remaining();
                    let results = self.invoke_tools(&mut state, &invocations).await;
                    tool_calls += (before - state.tool_calls_remaining()) as usize;
                    for result in results {
                        if result.is_error() {
                            tool_errors += 1;
                        }
                        state.push(Message::tool(result));
                    }
                }
                GraphStep::Finalize => {
                    let report = Self::finalize(&state);
                    info!(
                        task = %task,
                        produce_steps,
                        tool_calls,
                        tool_errors,
                        "Task graph finalized"
                    );
                    return Ok(GraphOutcome {
                        report,
                        produce_steps,
                        tool_calls,
                        tool_errors,
                        tool_calls_remaining: state.tool_calls_remaining(),
                    });
                }
            }

            step = next_step(step, &state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{TaskKind, ToolErrorKind};
    use agent_llm::ScriptedProvider;
    use agent_tools::{RegistryGateway, Tool, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        async fn execute(&self, args: Value) -> agent_core::Result<Value> {
            Ok(json!({"echo": args}))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its arguments"
        }
    }

    fn date() -> NaiveDate {
        agent_core::parse_date("2025-12-25").unwrap()
    }

    fn echo_gateway() -> Arc<dyn ToolGateway> {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(EchoTool));
        Arc::new(RegistryGateway::new(registry))
    }

    fn calls(n: usize) -> Vec<ToolInvocation> {
        (0..n)
            .map(|i| ToolInvocation::new(format!("call_{i}"), "echo", json!({"i": i})))
            .collect()
    }

    fn config(max_tool_calls: u32) -> GraphConfig {
        GraphConfig {
            max_tool_calls,
            ..GraphConfig::default()
        }
    }

    fn graph(spec: TaskSpec, provider: ScriptedProvider, budget: u32) -> TaskGraph {
        TaskGraph::new(spec, Arc::new(provider), echo_gateway(), config(budget)).unwrap()
    }

    #[test]
    fn test_transitions() {
        let mut state = ConversationState::new("INTC", date(), 1);
        assert_eq!(next_step(GraphStep::Produce, &state), GraphStep::Decide);
        assert_eq!(next_step(GraphStep::InvokeTools, &state), GraphStep::Produce);
        assert_eq!(next_step(GraphStep::Finalize, &state), GraphStep::Finalize);

        // no producer message yet
        assert_eq!(next_step(GraphStep::Decide, &state), GraphStep::Finalize);

        state.push(Message::producer("report"));
        assert_eq!(next_step(GraphStep::Decide, &state), GraphStep::Finalize);

        state.push(Message::producer("").with_tool_invocations(calls(1)));
        assert_eq!(next_step(GraphStep::Decide, &state), GraphStep::InvokeTools);

        assert!(state.consume_tool_call());
        assert_eq!(next_step(GraphStep::Decide, &state), GraphStep::Finalize);
    }

    #[test]
    fn test_budget_never_negative() {
        let mut state = ConversationState::new("INTC", date(), 2);
        assert!(state.consume_tool_call());
        assert!(state.consume_tool_call());
        assert!(!state.consume_tool_call());
        assert_eq!(state.tool_calls_remaining(), 0);
    }

    #[test]
    fn test_rejects_empty_subject() {
        let spec = TaskSpec::new(TaskKind::Market, "  ", date());
        let result = TaskGraph::new(
            spec,
            Arc::new(ScriptedProvider::repeating(Message::producer("x"))),
            echo_gateway(),
            GraphConfig::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_tool_round_then_report() {
        let spec = TaskSpec::new(TaskKind::Market, "INTC", date()).with_tool_set(["echo"]);
        let provider = ScriptedProvider::new(vec![
            Message::producer("fetching").with_tool_invocations(calls(2)),
            Message::producer("final report"),
        ]);

        let outcome = graph(spec, provider, 5).run().await.unwrap();
        assert_eq!(outcome.report.as_deref(), Some("final report"));
        assert_eq!(outcome.produce_steps, 2);
        assert_eq!(outcome.tool_calls, 2);
        assert_eq!(outcome.tool_errors, 0);
        assert_eq!(outcome.tool_calls_remaining, 3);
    }

    #[tokio::test]
    async fn test_zero_budget_produces_once() {
        let spec = TaskSpec::new(TaskKind::Market, "INTC", date()).with_tool_set(["echo"]);
        let provider =
            ScriptedProvider::repeating(Message::producer("need data").with_tool_invocations(calls(1)));

        let outcome = graph(spec, provider, 0).run().await.unwrap();
        assert_eq!(outcome.produce_steps, 1);
        assert_eq!(outcome.tool_calls, 0);
        assert_eq!(outcome.report.as_deref(), Some("need data"));
    }

    #[tokio::test]
    async fn test_terminates_within_budget_plus_one() {
        for budget in 0..6 {
            let spec = TaskSpec::new(TaskKind::Market, "INTC", date()).with_tool_set(["echo"]);
            let provider = ScriptedProvider::repeating(
                Message::producer("again").with_tool_invocations(calls(1)),
            );

            let outcome = graph(spec, provider, budget).run().await.unwrap();
            assert!(outcome.produce_steps <= budget as usize + 1);
            assert_eq!(outcome.tool_calls_remaining, 0);
        }
    }

    #[tokio::test]
    async fn test_excess_invocations_answered_with_budget_error() {
        let spec = TaskSpec::new(TaskKind::Market, "INTC", date()).with_tool_set(["echo"]);
        let g = graph(
            spec,
            ScriptedProvider::repeating(Message::producer("x")),
            1,
        );
        let mut state = g.initial_state();

        let results = g.invoke_tools(&mut state, &calls(3)).await;
        assert_eq!(results.len(), 3);
        assert!(!results[0].is_error());
        assert_eq!(results[1].error, Some(ToolErrorKind::BudgetExhausted));
        assert_eq!(results[2].error, Some(ToolErrorKind::BudgetExhausted));
        assert_eq!(state.tool_calls_remaining(), 0);
    }

    #[tokio::test]
    async fn test_empty_tool_set_yields_gateway_error() {
        let spec = TaskSpec::new(TaskKind::Trader, "INTC", date());
        assert!(spec.tool_set.is_empty());
        let provider = ScriptedProvider::new(vec![
            Message::producer("try a tool").with_tool_invocations(calls(1)),
            Message::producer("done without tools"),
        ]);

        let outcome = graph(spec, provider, 5).run().await.unwrap();
        assert_eq!(outcome.tool_errors, 1);
        assert_eq!(outcome.produce_steps, 2);
        assert_eq!(outcome.report.as_deref(), Some("done without tools"));
    }

    #[tokio::test]
    async fn test_seed_message_names_task() {
        let spec = TaskSpec::new(TaskKind::News, "INTC", date());
        let g = graph(spec, ScriptedProvider::repeating(Message::producer("x")), 1);
        let state = g.initial_state();

        assert_eq!(state.messages().len(), 2);
        let seed = &state.messages()[0];
        assert_eq!(seed.role, Role::System);
        assert!(seed.content.contains("News Analyst"));
        assert!(seed.content.contains("get_global_news"));

        let prompt = &state.messages()[1];
        assert_eq!(prompt.role, Role::System);
        assert!(prompt.content.contains("News Analyst report for INTC"));
        assert!(prompt.content.contains("no tool requests"));
        assert!(state.last_producer().is_none());
    }

    #[tokio::test]
    async fn test_rejected_invocation_spends_budget() {
        let spec = TaskSpec::new(TaskKind::Trader, "INTC", date());
        let provider = ScriptedProvider::new(vec![
            Message::producer("try a tool").with_tool_invocations(calls(2)),
            Message::producer("done"),
        ]);

        let outcome = graph(spec, provider, 5).run().await.unwrap();
        assert_eq!(outcome.tool_calls, 2);
        assert_eq!(outcome.tool_errors, 2);
        assert_eq!(outcome.tool_calls_remaining, 3);
    }

    #[tokio::test]
    async fn test_producer_failure_is_runner_error() {
        let spec = TaskSpec::new(TaskKind::News, "INTC", date());
        let result = graph(spec, ScriptedProvider::new(vec![]), 1).run().await;
        assert!(matches!(result, Err(Error::Runner(_))));
    }
}
