//! ModelBackend：循环唯一的模型调用入口
//!
//! think 把流式片段完整排空为一个字符串后才返回（空片段跳过），保证解析器只看到完整的一轮；
//! 每次调用受 deadline 约束，超时转为 LlmError::Timeout。
//! 可选的 stream_fallback：流式调用失败时以非流式重试一次。

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::timeout;

use crate::llm::{CompletionOptions, LlmClient, LlmError, TextStream};
use crate::memory::Message;

/// 包装 LlmClient：采样参数、流式开关、流式回退与超时
#[derive(Clone)]
pub struct ModelBackend {
    client: Arc<dyn LlmClient>,
    options: CompletionOptions,
    streaming: bool,
    stream_fallback: bool,
    timeout: Duration,
}

impl ModelBackend {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            options: CompletionOptions::default(),
            streaming: true,
            stream_fallback: false,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_stream_fallback(mut self, enabled: bool) -> Self {
        self.stream_fallback = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.client.token_usage()
    }

    /// 使用配置的温度调用模型，返回完整文本
    pub async fn think(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.think_with_temperature(messages, None).await
    }

    /// 单次调用覆盖温度
    pub async fn think_with_temperature(
        &self,
        messages: &[Message],
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let options = self.options.with_temperature(temperature);
        tracing::debug!(
            backend = %self.client.name(),
            messages = messages.len(),
            streaming = self.streaming,
            "calling model"
        );
        if !self.streaming {
            return self.complete(messages, &options).await;
        }
        match self.stream(messages, &options).await {
            Ok(text) => Ok(text),
            Err(e) if self.stream_fallback => {
                tracing::warn!(
                    backend = %self.client.name(),
                    error = %e,
                    "streaming call failed, retrying once without streaming"
                );
                self.complete(messages, &options).await
            }
            Err(e) => Err(e),
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        timeout(self.timeout, self.client.complete(messages, options))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
    }

    async fn stream(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let work = async {
            let stream = self.client.complete_stream(messages, options).await?;
            drain(stream).await
        };
        timeout(self.timeout, work)
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
    }
}

/// 顺序消费整个片段流并拼接；空片段跳过，任一片段出错则整体失败
pub async fn drain(mut stream: TextStream) -> Result<String, LlmError> {
    let mut out = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment.is_empty() {
            continue;
        }
        out.push_str(&fragment);
    }
    Ok(out)
}
