//! 工具执行器
//!
//! 持有共享只读的 ToolRegistry 与全局超时。invoke 永远返回 Observation 文本：
//! 工具不存在、返回 Err、超时或 panic 都转为错误描述，由循环继续下一步；每次调用输出结构化审计日志（JSON）。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::time::timeout;

use crate::tools::{ToolCall, ToolInput, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并把一切失败折叠为 Observation
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// 执行一次工具调用，返回写入运行记忆的 Observation
    pub async fn invoke(&self, call: &ToolCall) -> String {
        self.execute(&call.name, call.input.clone()).await
    }

    pub async fn execute(&self, tool_name: &str, input: ToolInput) -> String {
        let Some(tool) = self.registry.get(tool_name) else {
            tracing::warn!(tool = %tool_name, "tool not found");
            return format!("error: tool '{tool_name}' not found");
        };

        let start = Instant::now();
        let input_preview = input_preview(&input);
        let result = timeout(
            self.timeout,
            AssertUnwindSafe(tool.execute(input)).catch_unwind(),
        )
        .await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(Ok(_))) => (true, "ok"),
            Ok(Ok(Err(_))) => (false, "error"),
            Ok(Err(_)) => (false, "panic"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "input_preview": input_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(Ok(content))) => content,
            Ok(Ok(Err(e))) => format!("tool execution failed: {e}"),
            Ok(Err(payload)) => {
                format!("tool execution failed: panicked: {}", panic_message(payload.as_ref()))
            }
            Err(_) => format!(
                "tool execution failed: timed out after {}s",
                self.timeout.as_secs()
            ),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn input_preview(input: &ToolInput) -> String {
    let s = input.as_text();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
