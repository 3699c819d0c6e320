//! PlanExecutor：按计划逐步求解，每一步一次模型调用

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::ModelBackend;
use crate::prompt::{defaults, PromptSet};

/// 还没有已完成步骤时写入 Prompt 的占位
const NO_HISTORY: &str = "(none)";

pub struct PlanExecutor {
    backend: ModelBackend,
    prompts: Arc<PromptSet>,
}

impl PlanExecutor {
    pub fn new(backend: ModelBackend, prompts: Arc<PromptSet>) -> Self {
        Self { backend, prompts }
    }

    /// 执行当前步骤，返回该步结果（已 trim）
    pub async fn execute_step(
        &self,
        question: &str,
        plan: &str,
        history: &str,
        current_step: &str,
    ) -> Result<String, AgentError> {
        let history = if history.trim().is_empty() {
            NO_HISTORY
        } else {
            history
        };
        let messages = self.prompts.user_message(
            defaults::EXECUTOR,
            &[
                ("question", question),
                ("plan", plan),
                ("history", history),
                ("current_step", current_step),
            ],
        )?;
        let out = self.backend.think(&messages).await?;
        Ok(out.trim().to_string())
    }
}

/// 计划在 Prompt 中的呈现：编号列表
pub fn render_plan(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}
