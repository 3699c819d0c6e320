//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序回放预设回复；可模拟分片流、后端错误、流式失败与延迟，并记录每次收到的消息供断言。
//! 预设回复用完后：若设置了 fallback 则重复返回它，否则回显最后一条 User 消息为 Finish。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;

use crate::llm::{CompletionOptions, LlmClient, LlmError, TextStream};
use crate::memory::{Message, Role};

/// 一条预设回复
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// 流式时逐片返回，非流式时拼接返回
    Chunks(Vec<String>),
    Fail(LlmError),
}

impl MockReply {
    pub fn text(s: impl Into<String>) -> Self {
        MockReply::Text(s.into())
    }

    pub fn chunks<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Chunks(parts.into_iter().map(Into::into).collect())
    }

    pub fn fail(err: LlmError) -> Self {
        MockReply::Fail(err)
    }
}

/// Mock 客户端：回放预设回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Option<String>,
    stream_failures: AtomicUsize,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<Message>>>,
    options: Mutex<Vec<CompletionOptions>>,
}

impl MockLlmClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// 每次都返回同一段文本
    pub fn repeating(text: impl Into<String>) -> Self {
        Self::default().with_fallback(text)
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// 前 n 次流式调用直接失败（不消耗预设回复）
    pub fn with_stream_failures(self, n: usize) -> Self {
        self.stream_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 已回复的调用次数
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// 每次调用收到的消息
    pub fn calls(&self) -> Vec<Vec<Message>> {
        lock(&self.calls).clone()
    }

    pub fn last_options(&self) -> Option<CompletionOptions> {
        lock(&self.options).last().copied()
    }

    async fn next_reply(&self, messages: &[Message], options: &CompletionOptions) -> MockReply {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        lock(&self.calls).push(messages.to_vec());
        lock(&self.options).push(*options);
        if let Some(reply) = lock(&self.replies).pop_front() {
            return reply;
        }
        match &self.fallback {
            Some(text) => MockReply::Text(text.clone()),
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                MockReply::Text(format!(
                    "Thought: no scripted reply left\nAction: Finish[Echo from Mock: {last_user}]"
                ))
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        match self.next_reply(messages, options).await {
            MockReply::Text(t) => Ok(t),
            MockReply::Chunks(parts) => Ok(parts.concat()),
            MockReply::Fail(e) => Err(e),
        }
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<TextStream, LlmError> {
        let pending = self.stream_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.stream_failures.store(pending - 1, Ordering::SeqCst);
            return Err(LlmError::Stream("simulated stream failure".to_string()));
        }
        match self.next_reply(messages, options).await {
            MockReply::Text(t) => Ok(Box::pin(stream::iter(vec![Ok(t)]))),
            MockReply::Chunks(parts) => {
                Ok(Box::pin(stream::iter(parts.into_iter().map(Ok).collect::<Vec<_>>())))
            }
            MockReply::Fail(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_echoes() {
        let mock = MockLlmClient::new(vec![MockReply::text("one"), MockReply::text("two")]);
        let opts = CompletionOptions::default();
        let msgs = [Message::user("hello")];
        assert_eq!(mock.complete(&msgs, &opts).await.unwrap(), "one");
        assert_eq!(mock.complete(&msgs, &opts).await.unwrap(), "two");
        let echoed = mock.complete(&msgs, &opts).await.unwrap();
        assert!(echoed.contains("Finish[Echo from Mock: hello]"));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_repeating() {
        let mock = MockLlmClient::repeating("same");
        let opts = CompletionOptions::default();
        for _ in 0..3 {
            assert_eq!(mock.complete(&[], &opts).await.unwrap(), "same");
        }
    }

    #[tokio::test]
    async fn test_fail_reply() {
        let mock = MockLlmClient::new(vec![MockReply::fail(LlmError::Auth("bad key".into()))]);
        assert_eq!(
            mock.complete(&[], &CompletionOptions::default()).await,
            Err(LlmError::Auth("bad key".into()))
        );
    }
}
