//! 工具箱：Tool trait、注册表、执行器与内置工具（echo、get_weather）

pub mod echo;
pub mod executor;
pub mod registry;
pub mod weather;

pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use registry::{FnTool, Tool, ToolCall, ToolInput, ToolRegistry};
pub use weather::{WeatherTool, DEFAULT_WEATHER_BASE_URL};
