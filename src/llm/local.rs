//! 本地 HTTP 模型后端（Ollama / vLLM 等 OpenAI 风格 `/chat/completions` 端点）
//!
//! 非流式 POST `{base_url}/chat/completions`，取 `choices[0].message.content`。
//! 部分本地服务只监听 IPv4：当 `localhost` 地址返回 404 时，改用 `127.0.0.1` 重试一次。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::llm::{CompletionOptions, LlmClient, LlmError};
use crate::memory::Message;

pub const DEFAULT_LOCAL_BASE_URL: &str = "http://127.0.0.1:11434/v1";
pub const DEFAULT_LOCAL_API_KEY: &str = "ollama";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// 本地 HTTP 客户端
pub struct LocalHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LocalHttpClient {
    pub fn new(base_url: Option<&str>, model: Option<&str>, api_key: Option<&str>) -> Self {
        let client = Client::builder()
            .user_agent("hello-agents/0.1")
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_LOCAL_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.unwrap_or(DEFAULT_LOCAL_API_KEY).to_string(),
            model: model.unwrap_or(DEFAULT_LOCAL_MODEL).to_string(),
        }
    }

    /// 底层连接超时（ModelBackend 另有整体 deadline）
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = Client::builder()
            .user_agent("hello-agents/0.1")
            .timeout(timeout)
            .build()
        {
            self.client = client;
        }
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, base: &str, body: &ChatRequest<'_>) -> Result<(StatusCode, String), LlmError> {
        let url = format!("{base}/chat/completions");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("{url}: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| LlmError::Request(format!("reading body from {url}: {e}")))?;
        Ok((status, text))
    }
}

/// `localhost` 地址对应的 `127.0.0.1` 地址；其它地址返回 None
fn loopback_fallback(base_url: &str) -> Option<String> {
    base_url
        .contains("://localhost")
        .then(|| base_url.replacen("://localhost", "://127.0.0.1", 1))
}

/// 从响应体中取出 `choices[0].message.content`
fn extract_content(body: &str) -> Result<String, LlmError> {
    let data: Value = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("not JSON: {e}")))?;
    data.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
}

fn check_status(status: StatusCode, body: &str) -> Result<(), LlmError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(LlmError::Auth(format!("HTTP {status}")));
    }
    if !status.is_success() {
        let preview: String = body.chars().take(200).collect();
        return Err(LlmError::Request(format!("HTTP {status}: {preview}")));
    }
    Ok(())
}

#[async_trait]
impl LlmClient for LocalHttpClient {
    fn name(&self) -> &str {
        "local"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };

        let (mut status, mut text) = self.post(&self.base_url, &body).await?;
        if status == StatusCode::NOT_FOUND {
            if let Some(alt) = loopback_fallback(&self.base_url) {
                tracing::warn!(from = %self.base_url, to = %alt, "local backend returned 404, retrying via 127.0.0.1");
                (status, text) = self.post(&alt, &body).await?;
            }
        }
        check_status(status, &text)?;
        extract_content(&text)
    }
}
