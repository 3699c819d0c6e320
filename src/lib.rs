//! Hello Agents - Rust 智能体编排循环
//!
//! 模块划分：
//! - **agent**: Agent trait（run / run_with_cancel）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、运行状态机、Agent 构建器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / 本地 HTTP / Mock）与 ModelBackend
//! - **memory**: 发往模型的消息与单次运行的运行记忆
//! - **prompt**: 具名模板与默认模板集合
//! - **react**: Turn 解析与 Think/Act/Observe 循环
//! - **plan**: Plan-and-Solve（规划 + 逐步执行）
//! - **reflection**: 初稿 -> 评审 -> 改进 循环
//! - **tools**: 工具注册表、执行器与内置工具（echo、get_weather）

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod plan;
pub mod prompt;
pub mod react;
pub mod reflection;
pub mod tools;

pub use agent::Agent;
pub use core::{AgentBuilder, AgentError, RunOutcome, RunReport};
