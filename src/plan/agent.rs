//! Plan-and-Solve：先规划，再逐步执行
//!
//! 计划为空（模型未按格式输出）时直接中止为 Aborted("no valid plan")，不调用执行器；
//! 计划长于步数预算时截断。最后一步的输出即最终答案。

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::agent::{check_cancelled, Agent};
use crate::core::{AgentError, RunOutcome, RunReport, RunState};
use crate::memory::{EntryKind, TranscriptStyle};
use crate::plan::{render_plan, PlanExecutor, Planner};
use crate::react::events::{preview, send_event, RunEvent, OBSERVATION_PREVIEW_CHARS};
use crate::react::DEFAULT_MAX_STEPS;

pub struct PlanAndSolveAgent {
    planner: Planner,
    executor: PlanExecutor,
    max_steps: usize,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl PlanAndSolveAgent {
    pub fn new(planner: Planner, executor: PlanExecutor) -> Self {
        Self {
            planner,
            executor,
            max_steps: DEFAULT_MAX_STEPS,
            event_tx: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, ev: RunEvent) {
        send_event(self.event_tx.as_ref(), ev);
    }

    fn finish(&self, state: RunState, outcome: RunOutcome) -> RunReport {
        tracing::info!(steps = state.step, outcome = ?outcome, "plan run finished");
        self.emit(RunEvent::Finished {
            outcome: outcome.clone(),
        });
        state.into_report(outcome)
    }

    async fn drive(
        &self,
        question: &str,
        mut state: RunState,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError> {
        self.emit(RunEvent::RunStarted {
            run_id: state.run_id.clone(),
            agent: self.name().to_string(),
        });
        check_cancelled(&cancel)?;
        self.emit(RunEvent::Thinking);

        let mut plan = self.planner.plan(question).await?;
        if plan.is_empty() {
            return Ok(self.finish(state, RunOutcome::Aborted("no valid plan".to_string())));
        }
        if plan.len() > state.max_steps {
            tracing::warn!(
                plan_len = plan.len(),
                max_steps = state.max_steps,
                "plan longer than step budget, truncating"
            );
            plan.truncate(state.max_steps);
        }
        self.emit(RunEvent::PlanReady {
            steps: plan.clone(),
        });

        let plan_text = render_plan(&plan);
        for step in &plan {
            check_cancelled(&cancel)?;
            self.emit(RunEvent::StepUpdate {
                step: state.step + 1,
                max_steps: plan.len(),
            });
            let history = state.transcript.render();
            let result = self
                .executor
                .execute_step(question, &plan_text, &history, step)
                .await?;
            tracing::debug!(step = state.step, "plan step done");
            self.emit(RunEvent::StepResult {
                step: state.step + 1,
                preview: preview(&result, OBSERVATION_PREVIEW_CHARS),
            });
            state
                .transcript
                .append(EntryKind::Action, step.clone(), state.step);
            state
                .transcript
                .append(EntryKind::Execution, result, state.step);
            state.step += 1;
        }

        let answer = state
            .transcript
            .last(EntryKind::Execution)
            .unwrap_or_default()
            .to_string();
        Ok(self.finish(state, RunOutcome::Finished(answer)))
    }
}

#[async_trait]
impl Agent for PlanAndSolveAgent {
    fn name(&self) -> &str {
        "plan"
    }

    async fn run_with_cancel(
        &self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError> {
        let state = RunState::new(self.max_steps, TranscriptStyle::PlanSteps);
        let span = tracing::info_span!("agent_run", run_id = %state.run_id, agent = "plan");
        self.drive(question, state, cancel).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::{MockLlmClient, MockReply, ModelBackend};
    use crate::prompt::PromptSet;

    fn agent(mock: Arc<MockLlmClient>) -> PlanAndSolveAgent {
        let backend = ModelBackend::new(mock);
        let prompts = Arc::new(PromptSet::default());
        PlanAndSolveAgent::new(
            Planner::new(backend.clone(), prompts.clone()),
            PlanExecutor::new(backend, prompts),
        )
    }

    #[tokio::test]
    async fn test_plan_then_execute_each_step() {
        let mock = Arc::new(MockLlmClient::new(vec![
            MockReply::text("```python\n[\"count apples\", \"double it\"]\n```"),
            MockReply::text("5"),
            MockReply::text("10"),
        ]));
        let report = agent(mock.clone()).run("apples?").await.unwrap();
        assert_eq!(report.answer(), Some("10"));
        assert_eq!(report.steps, 2);
        assert_eq!(mock.call_count(), 3);
        let second = &mock.calls()[2][0].content;
        assert!(second.contains("Step 1: count apples\nResult: 5"));
        assert!(second.contains("double it"));
    }

    #[tokio::test]
    async fn test_invalid_plan_aborts_without_executor() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::text(
            "I would first count the apples, then double.",
        )]));
        let report = agent(mock.clone()).run("apples?").await.unwrap();
        assert_eq!(
            report.outcome,
            RunOutcome::Aborted("no valid plan".to_string())
        );
        assert_eq!(report.answer(), None);
        assert_eq!(mock.call_count(), 1);
        assert!(report.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_long_plan_is_truncated() {
        let mock = Arc::new(
            MockLlmClient::new(vec![MockReply::text(r#"```["a","b","c","d"]```"#)])
                .with_fallback("ok"),
        );
        let report = agent(mock.clone())
            .with_max_steps(2)
            .run("q")
            .await
            .unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(mock.call_count(), 3);
        assert!(report.transcript.entries().iter().all(|e| e.step_index < 2));
    }
}
