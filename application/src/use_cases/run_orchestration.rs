//! Run Orchestration use case
//!
//! Drives one orchestration run as a state machine:
//!
//! ```text
//! AwaitingModel ──► ModelResponded ──► Done (final answer)
//!       ▲                 │
//!       │                 ▼
//!       └──────── ExecutingTools
//!
//! plus two terminal aborts: LoopLimitExceeded, Cancelled
//! ```
//!
//! Each iteration sends the conversation plus the advertised tool schemas
//! to the reasoning backend. A final answer ends the run; tool-call
//! requests are dispatched — concurrently — and their results appended in
//! the order the calls were issued, so the transcript is deterministic
//! regardless of completion order. Every request resolves to exactly one
//! result before the next reasoning step.
//!
//! The iteration bound and the cancellation token are checked at the top of
//! every state; an aborted run still reports the best partial answer and
//! the last known conversation, never a silent empty result.

use crate::ports::reasoning::{ReasoningError, ReasoningPort};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::ports::tool_executor::ToolExecutorPort;
use callsheet_domain::conversation::entities::{Conversation, Directive};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default iteration bound when the caller does not configure one.
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Errors that terminate a run before it can produce an outcome
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The reasoning backend produced a final answer.
    Completed,
    /// The iteration bound was reached before a final answer.
    LoopLimitExceeded,
    /// The run was cancelled from outside.
    Cancelled,
}

impl Termination {
    pub fn as_str(&self) -> &str {
        match self {
            Termination::Completed => "completed",
            Termination::LoopLimitExceeded => "loop_limit_exceeded",
            Termination::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one orchestration run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The final answer, or the best partial answer an aborted run had.
    pub answer: Option<String>,
    /// How the run ended.
    pub termination: Termination,
    /// The full transcript.
    pub conversation: Conversation,
    /// Number of reasoning steps consumed.
    pub iterations: usize,
}

impl RunOutcome {
    pub fn is_aborted(&self) -> bool {
        !matches!(self.termination, Termination::Completed)
    }
}

/// Use case driving the agent loop against a reasoning backend and a tool
/// executor.
pub struct RunOrchestration<R: ReasoningPort, T: ToolExecutorPort> {
    reasoning: Arc<R>,
    tools: Arc<T>,
    max_iterations: usize,
    cancellation: Option<CancellationToken>,
    logger: Arc<dyn RunLogger>,
}

impl<R: ReasoningPort + 'static, T: ToolExecutorPort + 'static> RunOrchestration<R, T> {
    pub fn new(reasoning: Arc<R>, tools: Arc<T>) -> Self {
        Self {
            reasoning,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            cancellation: None,
            logger: Arc::new(NoRunLogger),
        }
    }

    /// Set the maximum number of reasoning steps before the run aborts.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set a structured run logger
    pub fn with_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Execute one orchestration run for `request`.
    pub async fn execute(&self, request: &str) -> Result<RunOutcome, OrchestrationError> {
        let advertised = self.tools.tools();
        info!(tools = advertised.len(), "starting orchestration run");
        self.logger.log(RunEvent::new(
            "run_started",
            serde_json::json!({
                "request": request,
                "tools": advertised.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            }),
        ));

        let mut conversation = Conversation::new();
        conversation.push_user(request);
        let mut iterations = 0usize;

        loop {
            // AwaitingModel
            if self.is_cancelled() {
                return Ok(self.abort(Termination::Cancelled, conversation, iterations));
            }
            if iterations >= self.max_iterations {
                warn!(
                    max = self.max_iterations,
                    "iteration limit reached, aborting run"
                );
                return Ok(self.abort(Termination::LoopLimitExceeded, conversation, iterations));
            }
            iterations += 1;
            debug!(iteration = iterations, "consulting reasoning backend");

            let advanced = self
                .cancellable(self.reasoning.advance(&conversation, &advertised))
                .await;
            let directive = match advanced {
                Some(result) => result?,
                None => return Ok(self.abort(Termination::Cancelled, conversation, iterations)),
            };

            // ModelResponded
            match directive {
                Directive::FinalAnswer(answer) => {
                    conversation.push_answer(&answer);
                    info!(iterations, "run completed");
                    self.logger.log(RunEvent::new(
                        "run_completed",
                        serde_json::json!({ "iterations": iterations }),
                    ));
                    return Ok(RunOutcome {
                        answer: Some(answer),
                        termination: Termination::Completed,
                        conversation,
                        iterations,
                    });
                }
                Directive::ToolCalls { content, calls } if calls.is_empty() => {
                    // A tool-call directive with no calls is a final answer.
                    let answer = content.unwrap_or_default();
                    conversation.push_answer(&answer);
                    info!(iterations, "run completed (empty tool-call turn)");
                    return Ok(RunOutcome {
                        answer: Some(answer),
                        termination: Termination::Completed,
                        conversation,
                        iterations,
                    });
                }
                Directive::ToolCalls { content, calls } => {
                    info!(count = calls.len(), "model requested tool calls");
                    conversation.push_tool_calls(content, calls.clone());

                    // ExecutingTools — dispatch concurrently; join_all yields
                    // results in issue order regardless of completion order,
                    // which keeps the transcript deterministic.
                    let dispatches = join_all(calls.iter().map(|call| self.tools.dispatch(call)));
                    let results = match self.cancellable(dispatches).await {
                        Some(results) => results,
                        None => {
                            return Ok(self.abort(
                                Termination::Cancelled,
                                conversation,
                                iterations,
                            ));
                        }
                    };
                    conversation.push_tool_results(results);
                }
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    /// Run a future to completion unless the cancellation token fires first.
    async fn cancellable<F, O>(&self, fut: F) -> Option<O>
    where
        F: std::future::Future<Output = O>,
    {
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    out = fut => Some(out),
                }
            }
            None => Some(fut.await),
        }
    }

    /// Build an aborted outcome carrying the best partial answer available.
    fn abort(
        &self,
        termination: Termination,
        conversation: Conversation,
        iterations: usize,
    ) -> RunOutcome {
        let answer = conversation.last_assistant_text().map(str::to_string);
        self.logger.log(RunEvent::new(
            "run_aborted",
            serde_json::json!({
                "termination": termination.as_str(),
                "iterations": iterations,
            }),
        ));
        RunOutcome {
            answer,
            termination,
            conversation,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use callsheet_domain::conversation::entities::Turn;
    use callsheet_domain::tool::entities::{ToolCall, ToolDefinition, ToolParameter};
    use callsheet_domain::tool::value_objects::{ToolError, ToolResult};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Reasoning stub that replays a fixed script of directives.
    struct ScriptedReasoning {
        steps: Mutex<VecDeque<Directive>>,
    }

    impl ScriptedReasoning {
        fn new(steps: Vec<Directive>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
            }
        }
    }

    #[async_trait]
    impl ReasoningPort for ScriptedReasoning {
        async fn advance(
            &self,
            _conversation: &Conversation,
            _tools: &[ToolDefinition],
        ) -> Result<Directive, ReasoningError> {
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ReasoningError::RequestFailed("script exhausted".into()))
        }
    }

    /// Reasoning stub that requests another tool call on every turn.
    struct AlwaysToolCalls;

    #[async_trait]
    impl ReasoningPort for AlwaysToolCalls {
        async fn advance(
            &self,
            _conversation: &Conversation,
            _tools: &[ToolDefinition],
        ) -> Result<Directive, ReasoningError> {
            Ok(Directive::ToolCalls {
                content: None,
                calls: vec![ToolCall::new("ping")],
            })
        }
    }

    /// Reasoning stub that searches first, then answers from the result.
    struct SearchThenAnswer;

    #[async_trait]
    impl ReasoningPort for SearchThenAnswer {
        async fn advance(
            &self,
            conversation: &Conversation,
            _tools: &[ToolDefinition],
        ) -> Result<Directive, ReasoningError> {
            match conversation.turns().last() {
                Some(Turn::ToolResults { results }) => Ok(Directive::FinalAnswer(format!(
                    "According to the knowledge base: {}",
                    results[0].render()
                ))),
                _ => Ok(Directive::ToolCalls {
                    content: None,
                    calls: vec![
                        ToolCall::new("search_passages").with_arg("query", "Curtis Clark director"),
                    ],
                }),
            }
        }
    }

    /// Executor stub with fixed tools and per-tool latencies.
    struct StubExecutor;

    #[async_trait]
    impl ToolExecutorPort for StubExecutor {
        fn tools(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new("search_passages", "Search the knowledge base")
                    .with_parameter(ToolParameter::new("query", "The search query", true)),
                ToolDefinition::new("ping", "Liveness probe"),
                ToolDefinition::new("slow", "Slow tool"),
                ToolDefinition::new("fast", "Fast tool"),
            ]
        }

        async fn dispatch(&self, call: &ToolCall) -> ToolResult {
            match call.tool_name.as_str() {
                "ping" => ToolResult::success("ping", serde_json::json!("pong")),
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    ToolResult::success("slow", serde_json::json!("slow done"))
                }
                "fast" => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    ToolResult::success("fast", serde_json::json!("fast done"))
                }
                "search_passages" => ToolResult::success(
                    "search_passages",
                    serde_json::json!(
                        "1. (score 0.92) Meridian is a 1990 film directed by Curtis Clark."
                    ),
                ),
                other => ToolResult::failure(other, ToolError::unknown_tool(other)),
            }
        }
    }

    #[tokio::test]
    async fn test_final_answer_on_first_turn() {
        let reasoning = Arc::new(ScriptedReasoning::new(vec![Directive::FinalAnswer(
            "hello".into(),
        )]));
        let run = RunOrchestration::new(reasoning, Arc::new(StubExecutor));

        let outcome = run.execute("hi").await.unwrap();
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.answer.as_deref(), Some("hello"));
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.is_aborted());
    }

    #[tokio::test]
    async fn test_loop_limit_aborts_after_exactly_three_iterations() {
        let run = RunOrchestration::new(Arc::new(AlwaysToolCalls), Arc::new(StubExecutor))
            .with_max_iterations(3);

        let outcome = run.execute("keep going").await.unwrap();
        assert_eq!(outcome.termination, Termination::LoopLimitExceeded);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.is_aborted());
        // Each iteration appended an assistant turn and a results turn.
        let tool_turns = outcome
            .conversation
            .turns()
            .iter()
            .filter(|t| matches!(t, Turn::ToolResults { .. }))
            .count();
        assert_eq!(tool_turns, 3);
    }

    #[tokio::test]
    async fn test_results_append_in_issue_order() {
        // X (slow) is issued before Y (fast); Y finishes first, but the
        // transcript must read [result(X), result(Y)].
        let reasoning = Arc::new(ScriptedReasoning::new(vec![
            Directive::ToolCalls {
                content: None,
                calls: vec![ToolCall::new("slow"), ToolCall::new("fast")],
            },
            Directive::FinalAnswer("done".into()),
        ]));
        let run = RunOrchestration::new(reasoning, Arc::new(StubExecutor));

        let outcome = run.execute("race").await.unwrap();
        let Turn::ToolResults { results } = &outcome.conversation.turns()[2] else {
            panic!("expected tool results turn");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool_name, "slow");
        assert_eq!(results[1].tool_name, "fast");
    }

    #[tokio::test]
    async fn test_retrieval_answer_names_the_film() {
        let run = RunOrchestration::new(Arc::new(SearchThenAnswer), Arc::new(StubExecutor));

        let outcome = run
            .execute("which film is directed by Curtis Clark")
            .await
            .unwrap();
        assert_eq!(outcome.termination, Termination::Completed);
        assert!(outcome.answer.unwrap().contains("Meridian"));
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn test_cancellation_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let run = RunOrchestration::new(Arc::new(AlwaysToolCalls), Arc::new(StubExecutor))
            .with_cancellation(token);

        let outcome = run.execute("hi").await.unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.answer, None);
    }

    #[tokio::test]
    async fn test_reasoning_failure_surfaces_as_error() {
        let reasoning = Arc::new(ScriptedReasoning::new(vec![]));
        let run = RunOrchestration::new(reasoning, Arc::new(StubExecutor));

        let err = run.execute("hi").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Reasoning(_)));
    }

    #[tokio::test]
    async fn test_empty_tool_call_turn_is_a_final_answer() {
        let reasoning = Arc::new(ScriptedReasoning::new(vec![Directive::ToolCalls {
            content: Some("All done".into()),
            calls: vec![],
        }]));
        let run = RunOrchestration::new(reasoning, Arc::new(StubExecutor));

        let outcome = run.execute("hi").await.unwrap();
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.answer.as_deref(), Some("All done"));
    }
}
