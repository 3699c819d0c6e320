//! Reflection：评审（Critic）与「初稿 -> 评审 -> 改进」循环

pub mod critic;
pub mod loop_;

pub use critic::{is_stop_signal, Critic, Review, Verdict, DEFAULT_STOP_PHRASES};
pub use loop_::{ReflectionAgent, DEFAULT_MAX_ITERATIONS};
