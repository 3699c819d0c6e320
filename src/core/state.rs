//! 运行状态：单次 run 的步数计数、运行记忆与待执行动作，以及循环状态机的阶段
//!
//! RunState 在 run 开始时创建、结束时丢弃，不跨运行共享；多个运行可并发，各自持有自己的 RunState。

use serde::Serialize;

use crate::memory::{Transcript, TranscriptStyle};
use crate::tools::ToolCall;

/// 循环状态机阶段：Start → Think → (Act | Finish | Abort) → Observe → Think … → Done
#[derive(Clone, Debug, PartialEq)]
pub enum LoopPhase {
    Start,
    Think,
    /// 执行 RunState::pending 中的工具调用
    Act,
    /// 携带待写入的 Observation 文本
    Observe(String),
    Finish(String),
    Abort(String),
    Done(RunOutcome),
}

impl LoopPhase {
    pub fn name(&self) -> &'static str {
        match self {
            LoopPhase::Start => "start",
            LoopPhase::Think => "think",
            LoopPhase::Act => "act",
            LoopPhase::Observe(_) => "observe",
            LoopPhase::Finish(_) => "finish",
            LoopPhase::Abort(_) => "abort",
            LoopPhase::Done(_) => "done",
        }
    }
}

/// 一次运行的终态
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 显式 Finish（或变体的最终产出物）
    Finished(String),
    /// 步数预算耗尽，没有答案
    Exhausted,
    /// 无法继续（无有效计划 / 无有效 Action），没有答案
    Aborted(String),
}

/// 单次运行的临时状态
#[derive(Debug)]
pub struct RunState {
    pub run_id: String,
    pub step: usize,
    pub max_steps: usize,
    pub transcript: Transcript,
    pub pending: Option<ToolCall>,
}

impl RunState {
    pub fn new(max_steps: usize, style: TranscriptStyle) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            step: 0,
            max_steps,
            transcript: Transcript::new(style),
            pending: None,
        }
    }

    pub fn budget_exhausted(&self) -> bool {
        self.step >= self.max_steps
    }

    pub fn into_report(self, outcome: RunOutcome) -> RunReport {
        RunReport {
            run_id: self.run_id,
            outcome,
            steps: self.step,
            transcript: self.transcript,
        }
    }
}

/// run 的返回值：终态、完整运行记忆与实际消耗的步数
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub transcript: Transcript,
    pub steps: usize,
}

impl RunReport {
    /// 最终答案；预算耗尽或中止时为 None
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Finished(a) => Some(a.as_str()),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Exhausted)
    }
}
