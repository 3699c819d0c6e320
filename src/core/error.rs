//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：解析失败不是错误，由 RecoveryEngine 决定 RetryWithPrompt / Abort；
//! 这里只列出会终止一次运行的错误。

use thiserror::Error;

use crate::llm::LlmError;

/// 运行过程中会向调用方传播的错误（后端失败、模板缺槽、配置、取消）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Backend(#[from] LlmError),

    /// 模板需要的占位符未提供值（调用方的编程错误）
    #[error("template '{template}' needs slot '{{{slot}}}' but no value was supplied")]
    MissingSlot { template: String, slot: String },

    #[error("unknown prompt template: {0}")]
    UnknownTemplate(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Cancelled by user")]
    Cancelled,
}

/// 恢复引擎针对解析失败给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将纠正提示写入下一轮，让模型重试
    RetryWithPrompt(String),
    /// 终止当前运行（不产出答案）
    Abort(String),
}
