//! Agent 运行入口
//!
//! 三种循环（ReAct / Plan-and-Solve / Reflection）实现同一个 Agent trait：
//! run 对单个问题跑完整个循环并返回 RunReport。所有运行状态都在 run 的栈上，
//! 同一个 Agent 可被多个 tokio 任务并发调用。

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentError, RunReport};

#[async_trait]
pub trait Agent: Send + Sync {
    /// 日志与事件中使用的名称
    fn name(&self) -> &str;

    /// 跑完一次运行；预算耗尽或中止不是错误，体现在 RunReport::outcome 中
    async fn run(&self, question: &str) -> Result<RunReport, AgentError> {
        self.run_with_cancel(question, CancellationToken::new()).await
    }

    /// 每一步之间检查取消令牌，已取消时返回 AgentError::Cancelled
    async fn run_with_cancel(
        &self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<RunReport, AgentError>;
}

/// 步间取消检查
pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), AgentError> {
    if cancel.is_cancelled() {
        tracing::info!("run cancelled");
        return Err(AgentError::Cancelled);
    }
    Ok(())
}
