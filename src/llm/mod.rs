//! LLM 层：客户端抽象、调用包装与实现（OpenAI 兼容 / 本地 HTTP / Mock）

pub mod backend;
pub mod local;
pub mod mock;
pub mod openai;
pub mod traits;

pub use backend::{drain, ModelBackend};
pub use local::LocalHttpClient;
pub use mock::{MockLlmClient, MockReply};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{CompletionOptions, LlmClient, LlmError, TextStream};
