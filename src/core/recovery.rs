//! 解析失败恢复策略
//!
//! 模型输出缺少 Action、格式无法识别或为空时，根据 ParseFailurePolicy 返回 RecoveryAction，
//! 供循环决定是带提示重试还是终止本次运行。

use serde::Deserialize;

use crate::core::RecoveryAction;

/// 解析失败时的处理策略（config [agent].on_parse_failure）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseFailurePolicy {
    /// 写入纠正提示后重新思考（消耗一步预算）
    #[default]
    Retry,
    /// 直接终止，结果为 "no valid Action"
    Abort,
}

/// 一次模型输出为何不可用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// 后端返回了空文本
    EmptyResponse,
    /// 有 Thought 但没有 Action
    MissingAction,
    /// Action 文本既不是 Finish 也不是工具调用
    Unrecognized(String),
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFailure::EmptyResponse => write!(f, "empty model response"),
            ParseFailure::MissingAction => write!(f, "no Action found"),
            ParseFailure::Unrecognized(a) => write!(f, "unrecognized Action: {a}"),
        }
    }
}

/// 语义化恢复：将解析失败映射为可执行动作
#[derive(Debug, Default, Clone)]
pub struct RecoveryEngine {
    policy: ParseFailurePolicy,
}

impl RecoveryEngine {
    pub fn new(policy: ParseFailurePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ParseFailurePolicy {
        self.policy
    }

    pub fn handle(&self, failure: &ParseFailure) -> RecoveryAction {
        match self.policy {
            ParseFailurePolicy::Abort => RecoveryAction::Abort("no valid Action".to_string()),
            ParseFailurePolicy::Retry => RecoveryAction::RetryWithPrompt(format!(
                "format error ({failure}). Reply with exactly one `Thought: ...` line followed by one \
                 `Action: ...` line. The Action must be `tool_name[input]`, \
                 `tool_name(arg=\"value\")` or `Finish[final answer]`."
            )),
        }
    }
}
