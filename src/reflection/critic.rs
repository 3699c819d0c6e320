//! Critic：对上一版产出做一次评审
//!
//! 评审意见中出现停止短语（不区分大小写）或意见为空时视为「无需改进」，循环提前结束。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::ModelBackend;
use crate::prompt::{defaults, PromptSet};

/// 默认停止短语
pub const DEFAULT_STOP_PHRASES: [&str; 2] = ["no improvement needed", "无需改进"];

/// 一次评审的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 已满意，停止迭代
    Satisfied,
    /// 需要按意见改进
    Revise,
}

/// 评审结果：原始意见与结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub feedback: String,
    pub verdict: Verdict,
}

pub struct Critic {
    backend: ModelBackend,
    prompts: Arc<PromptSet>,
    stop_phrases: Vec<String>,
}

impl Critic {
    pub fn new(backend: ModelBackend, prompts: Arc<PromptSet>) -> Self {
        Self {
            backend,
            prompts,
            stop_phrases: DEFAULT_STOP_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 替换停止短语；传入空列表时保留默认值
    pub fn with_stop_phrases(mut self, phrases: Vec<String>) -> Self {
        if !phrases.is_empty() {
            self.stop_phrases = phrases;
        }
        self
    }

    pub fn stop_phrases(&self) -> &[String] {
        &self.stop_phrases
    }

    pub async fn review(&self, task: &str, content: &str) -> Result<Review, AgentError> {
        let messages = self
            .prompts
            .user_message(defaults::REFLECT, &[("task", task), ("content", content)])?;
        let feedback = self.backend.think(&messages).await?.trim().to_string();
        let verdict = if is_stop_signal(&feedback, &self.stop_phrases) {
            Verdict::Satisfied
        } else {
            Verdict::Revise
        };
        Ok(Review { feedback, verdict })
    }
}

/// 意见为空或包含任一停止短语
pub fn is_stop_signal(feedback: &str, phrases: &[String]) -> bool {
    let lower = feedback.trim().to_lowercase();
    if lower.is_empty() {
        return true;
    }
    phrases
        .iter()
        .any(|p| !p.trim().is_empty() && lower.contains(&p.trim().to_lowercase()))
}
