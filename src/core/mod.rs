//! 核心层：错误与恢复、运行状态机、Agent 构建

pub mod builder;
pub mod error;
pub mod recovery;
pub mod state;

pub use builder::{create_llm_from_config, AgentBuilder};
pub use error::{AgentError, RecoveryAction};
pub use recovery::{ParseFailure, ParseFailurePolicy, RecoveryEngine};
pub use state::{LoopPhase, RunOutcome, RunReport, RunState};
