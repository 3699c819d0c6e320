//! ReAct：Turn 解析、Think/Act/Observe 主循环与运行事件

pub mod events;
pub mod loop_;
pub mod parser;

pub use events::{send_event, RunEvent};
pub use loop_::{ReActAgent, DEFAULT_MAX_STEPS};
pub use parser::{parse_action, parse_turn, ParsedAction, ParsedTurn, Turn};
