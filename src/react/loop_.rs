//! ReAct 主循环
//!
//! Think -> Act (Tool) -> Observe -> 下一轮 Think；显式 Finish 或步数预算耗尽时结束。
//! 以 LoopPhase 状态机驱动，每次运行独立持有 RunState；解析失败交给 RecoveryEngine。
//! 可选 event_tx：向前端推送 Thinking / ToolCall / Observation / Finished。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::agent::{check_cancelled, Agent};
use crate::core::{
    AgentError, LoopPhase, ParseFailure, RecoveryAction, RecoveryEngine, RunOutcome, RunReport,
    RunState,
};
use crate::llm::ModelBackend;
use crate::memory::{EntryKind, TranscriptStyle};
use crate::prompt::{defaults, PromptSet};
use crate::react::events::{preview, send_event, RunEvent, OBSERVATION_PREVIEW_CHARS};
use crate::react::{parse_turn, ParsedTurn};
use crate::tools::ToolExecutor;

/// 默认步数预算
pub const DEFAULT_MAX_STEPS: usize = 5;

/// 历史为空时写入 Prompt 的占位
const EMPTY_HISTORY: &str = "(none)";

/// Think / Act / Observe 循环的 Agent
pub struct ReActAgent {
    backend: ModelBackend,
    executor: ToolExecutor,
    prompts: Arc<PromptSet>,
    recovery: RecoveryEngine,
    max_steps: usize,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl ReActAgent {
    pub fn new(backend: ModelBackend, executor: ToolExecutor) -> Self {
        Self {
            backend,
            executor,
            prompts: Arc::new(PromptSet::default()),
            recovery: RecoveryEngine::default(),
            max_steps: DEFAULT_MAX_STEPS,
            event_tx: None,
        }
    }

    pub fn with_prompts(mut self, prompts: Arc<PromptSet>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryEngine) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn emit(&self, ev: RunEvent) {
        send_event(self.event_tx.as_ref(), ev);
    }

    async fn drive(
        &self,
        question: &str,
        mut state: RunState,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError> {
        let mut phase = LoopPhase::Start;
        loop {
            tracing::debug!(phase = phase.name(), step = state.step, "react phase");
            phase = match phase {
                LoopPhase::Start => {
                    tracing::info!(max_steps = state.max_steps, "react run started");
                    self.emit(RunEvent::RunStarted {
                        run_id: state.run_id.clone(),
                        agent: self.name().to_string(),
                    });
                    LoopPhase::Think
                }
                LoopPhase::Think => {
                    check_cancelled(&cancel)?;
                    if state.budget_exhausted() {
                        LoopPhase::Done(RunOutcome::Exhausted)
                    } else {
                        self.think(question, &mut state).await?
                    }
                }
                LoopPhase::Act => match state.pending.clone() {
                    Some(call) => {
                        self.emit(RunEvent::ToolCall {
                            tool: call.name.clone(),
                            input: call.input.as_text(),
                        });
                        state
                            .transcript
                            .append(EntryKind::Action, call.to_string(), state.step);
                        let observation = self.executor.invoke(&call).await;
                        LoopPhase::Observe(observation)
                    }
                    None => LoopPhase::Think,
                },
                LoopPhase::Observe(observation) => {
                    let tool = state
                        .pending
                        .take()
                        .map(|c| c.name)
                        .unwrap_or_else(|| "recovery".to_string());
                    self.emit(RunEvent::Observation {
                        tool,
                        preview: preview(&observation, OBSERVATION_PREVIEW_CHARS),
                    });
                    state
                        .transcript
                        .append(EntryKind::Observation, observation, state.step);
                    state.step += 1;
                    LoopPhase::Think
                }
                LoopPhase::Finish(answer) => {
                    state
                        .transcript
                        .append(EntryKind::Action, format!("Finish[{answer}]"), state.step);
                    state.step += 1;
                    LoopPhase::Done(RunOutcome::Finished(answer))
                }
                LoopPhase::Abort(reason) => LoopPhase::Done(RunOutcome::Aborted(reason)),
                LoopPhase::Done(outcome) => {
                    match &outcome {
                        RunOutcome::Finished(_) => {
                            tracing::info!(steps = state.step, "react run finished")
                        }
                        RunOutcome::Exhausted => tracing::info!(
                            max_steps = state.max_steps,
                            "react run exhausted its step budget"
                        ),
                        RunOutcome::Aborted(reason) => {
                            tracing::warn!(reason = %reason, "react run aborted")
                        }
                    }
                    self.emit(RunEvent::Finished {
                        outcome: outcome.clone(),
                    });
                    return Ok(state.into_report(outcome));
                }
            };
        }
    }

    /// 一次 Think：构建 Prompt、调用模型、解析，返回下一阶段
    async fn think(&self, question: &str, state: &mut RunState) -> Result<LoopPhase, AgentError> {
        self.emit(RunEvent::StepUpdate {
            step: state.step + 1,
            max_steps: state.max_steps,
        });
        self.emit(RunEvent::Thinking);

        let tools = self.executor.registry().describe_all();
        let history = state.transcript.render();
        let history = if history.is_empty() {
            EMPTY_HISTORY
        } else {
            history.as_str()
        };
        let messages = self.prompts.system_and_user(
            defaults::REACT_SYSTEM,
            defaults::REACT_USER,
            &[("tools", tools.as_str()), ("question", question), ("history", history)],
        )?;

        let raw = self.backend.think(&messages).await?;
        let turn = parse_turn(&raw);
        if let Some(thought) = &turn.thought {
            tracing::debug!(thought = %thought, "model thought");
            self.emit(RunEvent::ThinkingContent {
                text: thought.clone(),
            });
        }

        let failure = match turn.parsed {
            ParsedTurn::Finish(answer) => return Ok(LoopPhase::Finish(answer)),
            ParsedTurn::ToolCall(call) => {
                state.pending = Some(call);
                return Ok(LoopPhase::Act);
            }
            _ if raw.trim().is_empty() => ParseFailure::EmptyResponse,
            ParsedTurn::Thought(_) => ParseFailure::MissingAction,
            ParsedTurn::Unparseable(_) => match turn.action {
                Some(action) => ParseFailure::Unrecognized(action),
                None => ParseFailure::MissingAction,
            },
        };

        tracing::warn!(failure = %failure, step = state.step, "could not parse model output");
        match self.recovery.handle(&failure) {
            RecoveryAction::RetryWithPrompt(hint) => {
                self.emit(RunEvent::Recovery {
                    action: "retry_with_prompt".to_string(),
                    detail: failure.to_string(),
                });
                let attempted = match &failure {
                    ParseFailure::Unrecognized(a) => a.clone(),
                    _ => "(missing)".to_string(),
                };
                state
                    .transcript
                    .append(EntryKind::Action, attempted, state.step);
                state.pending = None;
                Ok(LoopPhase::Observe(hint))
            }
            RecoveryAction::Abort(reason) => {
                self.emit(RunEvent::Recovery {
                    action: "abort".to_string(),
                    detail: failure.to_string(),
                });
                Ok(LoopPhase::Abort(reason))
            }
        }
    }
}

#[async_trait]
impl Agent for ReActAgent {
    fn name(&self) -> &str {
        "react"
    }

    async fn run_with_cancel(
        &self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError> {
        let state = RunState::new(self.max_steps, TranscriptStyle::React);
        let span = tracing::info_span!("agent_run", run_id = %state.run_id, agent = "react");
        self.drive(question, state, cancel).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParseFailurePolicy;
    use crate::llm::{LlmError, MockLlmClient, MockReply};
    use crate::tools::ToolRegistry;

    fn agent_with(mock: Arc<MockLlmClient>, registry: ToolRegistry) -> ReActAgent {
        let backend = ModelBackend::new(mock);
        let executor = ToolExecutor::new(Arc::new(registry), 5);
        ReActAgent::new(backend, executor)
    }

    fn echo_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(crate::tools::EchoTool);
        registry
    }

    #[tokio::test]
    async fn test_finish_on_first_turn() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::text(
            "Thought: trivial\nAction: Finish[42]",
        )]));
        let report = agent_with(mock.clone(), echo_registry())
            .run("what is 6*7?")
            .await
            .unwrap();
        assert_eq!(report.answer(), Some("42"));
        assert_eq!(report.steps, 1);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(report.transcript.last(EntryKind::Action), Some("Finish[42]"));
    }

    #[tokio::test]
    async fn test_tool_then_finish_feeds_history() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("Thought: echo it\nAction: echo[ping]"),
            MockReply::text("Thought: got it\nAction: Finish[pong]"),
        ]));
        let report = agent_with(mock.clone(), echo_registry())
            .run("q")
            .await
            .unwrap();
        assert_eq!(report.answer(), Some("pong"));
        assert_eq!(report.transcript.last(EntryKind::Observation), Some("ping"));

        let calls = mock.calls();
        assert!(calls[0][1].content.contains("(none)"));
        assert!(calls[1][1]
            .content
            .contains("Action: echo[ping]\nObservation: ping"));
        assert!(calls[0][0].content.contains("- echo:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("Thought: t\nAction: Search[rust]"),
            MockReply::text("Thought: t\nAction: Finish[done]"),
        ]));
        let report = agent_with(mock, echo_registry()).run("q").await.unwrap();
        assert_eq!(report.answer(), Some("done"));
        assert_eq!(
            report.transcript.last(EntryKind::Observation),
            Some("error: tool 'Search' not found")
        );
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let mock = Arc::new(MockLlmClient::repeating("Thought: loop\nAction: echo[again]"));
        let report = agent_with(mock.clone(), echo_registry())
            .with_max_steps(3)
            .run("q")
            .await
            .unwrap();
        assert!(report.is_exhausted());
        assert_eq!(report.answer(), None);
        assert_eq!(report.transcript.count(EntryKind::Observation), 3);
        assert_eq!(mock.call_count(), 3);
        assert!(report.transcript.entries().iter().all(|e| e.step_index < 3));
    }

    #[tokio::test]
    async fn test_parse_failure_retry_consumes_step() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("I think the answer is 4"),
            MockReply::text("Thought: fixed\nAction: Finish[4]"),
        ]));
        let report = agent_with(mock.clone(), echo_registry())
            .run("2+2")
            .await
            .unwrap();
        assert_eq!(report.answer(), Some("4"));
        assert_eq!(report.steps, 2);
        let hint = report.transcript.entries()[1].content.clone();
        assert!(hint.starts_with("format error"));
        assert!(mock.calls()[1][1].content.contains("format error"));
    }

    #[tokio::test]
    async fn test_parse_failure_abort_policy() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::text(
            "Thought: hmm\nAction: dance wildly",
        )]));
        let report = agent_with(mock.clone(), echo_registry())
            .with_recovery(RecoveryEngine::new(ParseFailurePolicy::Abort))
            .run("q")
            .await
            .unwrap();
        assert_eq!(
            report.outcome,
            RunOutcome::Aborted("no valid Action".to_string())
        );
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_is_parse_failure() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::text("   ")]));
        let report = agent_with(mock, echo_registry())
            .with_max_steps(1)
            .run("q")
            .await
            .unwrap();
        assert!(report.is_exhausted());
        assert!(report
            .transcript
            .last(EntryKind::Observation)
            .unwrap()
            .contains("empty model response"));
    }

    #[tokio::test]
    async fn test_backend_error_is_fatal() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::fail(LlmError::Auth(
            "bad key".into(),
        ))]));
        let err = agent_with(mock, echo_registry())
            .run("q")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Backend(LlmError::Auth(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_step() {
        let mock = Arc::new(MockLlmClient::repeating("Thought: t\nAction: Finish[x]"));
        let agent = agent_with(mock.clone(), echo_registry());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = agent.run_with_cancel("q", cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("Thought: t\nAction: echo[hi]"),
            MockReply::text("Thought: t\nAction: Finish[hi]"),
        ]));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        agent_with(mock, echo_registry())
            .with_event_tx(tx)
            .run("q")
            .await
            .unwrap();
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(events.contains(&RunEvent::ToolCall {
            tool: "echo".into(),
            input: "hi".into()
        }));
        assert_eq!(
            events.last(),
            Some(&RunEvent::Finished {
                outcome: RunOutcome::Finished("hi".into())
            })
        );
    }
}
