//! Plan-and-Solve：计划解析、Planner、逐步执行器与 Agent

pub mod agent;
pub mod executor;
pub mod planner;

pub use agent::PlanAndSolveAgent;
pub use executor::{render_plan, PlanExecutor};
pub use planner::{parse_plan, Planner};
