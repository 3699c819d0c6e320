//! 记忆层：发往模型的消息，与单次运行内只追加的运行记忆

pub mod message;
pub mod transcript;

pub use message::{Message, Role};
pub use transcript::{EntryKind, Transcript, TranscriptEntry, TranscriptStyle};
