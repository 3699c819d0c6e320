//! 运行过程事件：用于 CLI / 前端逐步展示思考、工具调用、观察与最终结果

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::RunOutcome;

/// Observation 预览最大字符数
pub const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        agent: String,
    },
    /// 当前第几步
    StepUpdate { step: usize, max_steps: usize },
    /// 正在调用模型
    Thinking,
    /// 模型的 Thought 内容
    ThinkingContent { text: String },
    ToolCall { tool: String, input: String },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 解析失败后的恢复动作
    Recovery { action: String, detail: String },
    /// Plan-and-Solve 生成的计划
    PlanReady { steps: Vec<String> },
    /// 计划中某一步的执行结果
    StepResult { step: usize, preview: String },
    /// Reflection 的评审意见
    Feedback { iteration: usize, preview: String },
    Finished { outcome: RunOutcome },
}

/// 有接收端时推送事件；接收端已关闭则忽略
pub fn send_event(tx: Option<&UnboundedSender<RunEvent>>, ev: RunEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

/// 按字符截断（不切断 UTF-8）
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(RunEvent::ToolCall {
            tool: "echo".into(),
            input: "hi".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool"], "echo");

        let json = serde_json::to_value(RunEvent::Finished {
            outcome: RunOutcome::Exhausted,
        })
        .unwrap();
        assert_eq!(json["type"], "finished");
        assert_eq!(json["outcome"]["status"], "exhausted");
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("天气晴朗", 2), "天气...");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn test_send_without_receiver_is_noop() {
        send_event(None, RunEvent::Thinking);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        send_event(Some(&tx), RunEvent::Thinking);
    }
}
