//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / 本地 HTTP / Mock）实现 LlmClient：complete（非流式）、complete_stream（流式文本片段）。
//! 传输、鉴权、超时等失败统一表示为 LlmError。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{stream, Stream};
use thiserror::Error;

use crate::memory::Message;

/// 流式完成返回的文本片段流
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// 模型后端调用失败（对单次运行而言是致命错误）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("stream interrupted: {0}")]
    Stream(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("backend misconfigured: {0}")]
    Config(String),
}

/// 单次调用的采样参数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        if temperature.is_some() {
            self.temperature = temperature;
        }
        self
    }
}

/// LLM 客户端 trait：非流式完成与流式完成（返回文本片段流）
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    /// 非流式完成
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// 流式完成；默认实现把 complete 的结果作为唯一片段
    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError> {
        let content = self.complete(messages, options).await?;
        Ok(Box::pin(stream::iter(vec![Ok(content)])))
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
