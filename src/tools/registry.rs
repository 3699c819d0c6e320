//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry 按名注册与查找；
//! 枚举顺序即注册顺序，describe_all 的结果原样拼入 system prompt。
//! 同名重复注册会原位覆盖旧条目并输出警告（不报错）。

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

/// 工具输入：方括号写法为自由文本，括号写法为关键字参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolInput {
    Text(String),
    Args(BTreeMap<String, String>),
}

impl ToolInput {
    /// 文本视图：Text 原样返回；只有一个参数的 Args 返回该参数值；否则拼成 `k="v"` 列表
    pub fn as_text(&self) -> String {
        match self {
            ToolInput::Text(s) => s.clone(),
            ToolInput::Args(map) if map.len() == 1 => {
                map.values().next().cloned().unwrap_or_default()
            }
            ToolInput::Args(_) => self.kwargs(),
        }
    }

    /// `k="v", ...`（按键排序）
    fn kwargs(&self) -> String {
        match self {
            ToolInput::Args(map) => map
                .iter()
                .map(|(k, v)| format!("{k}=\"{v}\""))
                .collect::<Vec<_>>()
                .join(", "),
            ToolInput::Text(s) => s.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            ToolInput::Args(map) => map.get(key).map(String::as_str),
            ToolInput::Text(_) => None,
        }
    }
}

impl fmt::Display for ToolInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolInput::Text(s) => write!(f, "[{s}]"),
            ToolInput::Args(_) => write!(f, "({})", self.kwargs()),
        }
    }
}

/// 解析出的工具调用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub input: ToolInput,
}

impl fmt::Display for ToolCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.input)
    }
}

/// 工具 trait：名称、描述（供 LLM 理解）、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（Action 中的工具名）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 执行工具；内部失败应返回 Err(可读信息)，由执行器转为 Observation
    async fn execute(&self, input: ToolInput) -> Result<String, String>;
}

type InvokeFn = dyn Fn(ToolInput) -> Result<String, String> + Send + Sync;

/// 由闭包构成的工具（register_fn 使用）
pub struct FnTool {
    name: String,
    description: String,
    invoke: Box<InvokeFn>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(ToolInput) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            invoke: Box::new(invoke),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, input: ToolInput) -> Result<String, String> {
        (self.invoke)(input)
    }
}

/// 工具注册表：保持注册顺序，按名称查找
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名时原位替换并返回被覆盖的旧工具
    pub fn register(&mut self, tool: impl Tool + 'static) -> Option<Arc<dyn Tool>> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => {
                tracing::warn!(tool = %name, "tool already registered, overwriting");
                Some(std::mem::replace(&mut self.tools[pos], tool))
            }
            None => {
                tracing::debug!(tool = %name, "tool registered");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
                None
            }
        }
    }

    /// 以 (name, description, invoke) 注册一个同步函数工具
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        invoke: F,
    ) -> Option<Arc<dyn Tool>>
    where
        F: Fn(ToolInput) -> Result<String, String> + Send + Sync + 'static,
    {
        self.register(FnTool::new(name, description, invoke))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 工具名列表（注册顺序）
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `- name: description` 逐行拼接（注册顺序），用于 system prompt 的可用工具段落
    pub fn describe_all(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reregister_keeps_single_entry_and_second_fn() {
        let mut reg = ToolRegistry::new();
        assert!(reg
            .register_fn("calc", "first", |_| Ok("one".to_string()))
            .is_none());
        let replaced = reg.register_fn("calc", "second", |_| Ok("two".to_string()));
        assert!(replaced.is_some());
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.tool_names(), vec!["calc".to_string()]);

        let tool = reg.get("calc").unwrap();
        assert_eq!(tool.description(), "second");
        let out = tool.execute(ToolInput::Text("1+1".into())).await.unwrap();
        assert_eq!(out, "two");
    }

    #[test]
    fn test_describe_all_in_registration_order() {
        let mut reg = ToolRegistry::new();
        reg.register_fn("zeta", "last letter", |_| Ok(String::new()));
        reg.register_fn("alpha", "first letter", |_| Ok(String::new()));
        reg.register_fn("zeta", "overwritten", |_| Ok(String::new()));
        assert_eq!(
            reg.describe_all(),
            "- zeta: overwritten\n- alpha: first letter"
        );
    }

    #[test]
    fn test_lookup_absent() {
        let reg = ToolRegistry::new();
        assert!(reg.get("nope").is_none());
        assert!(!reg.contains("nope"));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_tool_input_views() {
        let mut map = BTreeMap::new();
        map.insert("city".to_string(), "Shenzhen".to_string());
        let single = ToolInput::Args(map.clone());
        assert_eq!(single.as_text(), "Shenzhen");
        assert_eq!(single.get("city"), Some("Shenzhen"));

        map.insert("weather".to_string(), "sunny".to_string());
        let multi = ToolInput::Args(map);
        assert_eq!(multi.as_text(), "city=\"Shenzhen\", weather=\"sunny\"");

        let call = ToolCall {
            name: "get_weather".into(),
            input: single,
        };
        assert_eq!(call.to_string(), r#"get_weather(city="Shenzhen")"#);

        let text = ToolInput::Text("rust".into());
        assert_eq!(text.get("city"), None);
        assert_eq!(
            ToolCall { name: "Search".into(), input: text }.to_string(),
            "Search[rust]"
        );
    }
}
