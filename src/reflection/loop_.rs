//! Reflection 主循环：初稿 -> (评审 -> 改进) × N
//!
//! 运行记忆中 Execution 条目为各版产出，Reflection 条目为评审意见；
//! step_index 为迭代序号（初稿为 0）。答案始终是最后一个 Execution 条目。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::agent::{check_cancelled, Agent};
use crate::core::{AgentError, RunOutcome, RunReport, RunState};
use crate::llm::ModelBackend;
use crate::memory::{EntryKind, TranscriptStyle};
use crate::prompt::{defaults, PromptSet};
use crate::react::events::{preview, send_event, RunEvent, OBSERVATION_PREVIEW_CHARS};
use crate::reflection::{Critic, Verdict};

/// 默认最大迭代次数
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

pub struct ReflectionAgent {
    backend: ModelBackend,
    critic: Critic,
    prompts: Arc<PromptSet>,
    max_iterations: usize,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl ReflectionAgent {
    pub fn new(backend: ModelBackend, critic: Critic, prompts: Arc<PromptSet>) -> Self {
        Self {
            backend,
            critic,
            prompts,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            event_tx: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, ev: RunEvent) {
        send_event(self.event_tx.as_ref(), ev);
    }

    async fn drive(
        &self,
        task: &str,
        mut state: RunState,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError> {
        self.emit(RunEvent::RunStarted {
            run_id: state.run_id.clone(),
            agent: self.name().to_string(),
        });
        check_cancelled(&cancel)?;

        let messages = self
            .prompts
            .user_message(defaults::INITIAL, &[("task", task)])?;
        let initial = self.backend.think(&messages).await?.trim().to_string();
        if initial.is_empty() {
            tracing::warn!("initial attempt is empty");
        }
        state.transcript.append(EntryKind::Execution, initial, 0);

        for iteration in 1..=self.max_iterations {
            check_cancelled(&cancel)?;
            self.emit(RunEvent::StepUpdate {
                step: iteration,
                max_steps: self.max_iterations,
            });
            let last = state
                .transcript
                .last(EntryKind::Execution)
                .unwrap_or_default()
                .to_string();

            let review = self.critic.review(task, &last).await?;
            self.emit(RunEvent::Feedback {
                iteration,
                preview: preview(&review.feedback, OBSERVATION_PREVIEW_CHARS),
            });
            state
                .transcript
                .append(EntryKind::Reflection, review.feedback.clone(), iteration);
            state.step = iteration;
            if review.verdict == Verdict::Satisfied {
                tracing::info!(iteration, "reviewer is satisfied, stopping early");
                break;
            }

            let messages = self.prompts.user_message(
                defaults::REFINE,
                &[
                    ("task", task),
                    ("last_attempt", last.as_str()),
                    ("feedback", review.feedback.as_str()),
                ],
            )?;
            let refined = self.backend.think(&messages).await?.trim().to_string();
            if refined.is_empty() {
                tracing::warn!(iteration, "refinement is empty, keeping previous attempt");
                break;
            }
            state
                .transcript
                .append(EntryKind::Execution, refined, iteration);
        }

        let answer = state
            .transcript
            .last(EntryKind::Execution)
            .unwrap_or_default()
            .to_string();
        tracing::info!(iterations = state.step, "reflection run finished");
        let outcome = RunOutcome::Finished(answer);
        self.emit(RunEvent::Finished {
            outcome: outcome.clone(),
        });
        Ok(state.into_report(outcome))
    }
}

#[async_trait]
impl Agent for ReflectionAgent {
    fn name(&self) -> &str {
        "reflect"
    }

    async fn run_with_cancel(
        &self,
        task: &str,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError> {
        let state = RunState::new(self.max_iterations + 1, TranscriptStyle::Reflection);
        let span = tracing::info_span!("agent_run", run_id = %state.run_id, agent = "reflect");
        self.drive(task, state, cancel).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockReply};

    fn agent(mock: Arc<MockLlmClient>) -> ReflectionAgent {
        let backend = ModelBackend::new(mock);
        let prompts = Arc::new(PromptSet::default());
        let critic = Critic::new(backend.clone(), prompts.clone());
        ReflectionAgent::new(backend, critic, prompts)
    }

    #[tokio::test]
    async fn test_stops_on_first_satisfied_review() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("fn add(a, b) = a + b"),
            MockReply::text("No improvement needed."),
        ]));
        let report = agent(mock.clone()).run("write add").await.unwrap();
        assert_eq!(report.answer(), Some("fn add(a, b) = a + b"));
        assert_eq!(report.steps, 1);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_refines_until_max_iterations() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("v0"),
            MockReply::text("too short"),
            MockReply::text("v1"),
            MockReply::text("still short"),
            MockReply::text("v2"),
        ]));
        let report = agent(mock.clone())
            .with_max_iterations(2)
            .run("essay")
            .await
            .unwrap();
        assert_eq!(report.answer(), Some("v2"));
        assert_eq!(report.transcript.count(EntryKind::Execution), 3);
        assert_eq!(report.transcript.count(EntryKind::Reflection), 2);
        let refine_prompt = &mock.calls()[2][0].content;
        assert!(refine_prompt.contains("v0"));
        assert!(refine_prompt.contains("too short"));
    }

    #[tokio::test]
    async fn test_empty_refinement_keeps_previous() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("draft"),
            MockReply::text("needs work"),
            MockReply::text("   "),
        ]));
        let report = agent(mock.clone()).run("t").await.unwrap();
        assert_eq!(report.answer(), Some("draft"));
        assert_eq!(mock.call_count(), 3);
    }
}
