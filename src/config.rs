//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENTS__*` 覆盖（双下划线表示嵌套，如 `AGENTS__LLM__PROVIDER=local`）。
//! 凭据类环境变量（LLM_API_KEY / LLM_BASE_URL / LLM_MODEL_ID / LLM_TIMEOUT / LLM_PROVIDER）
//! 只在入口处由 apply_llm_env 读取一次。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::ParseFailurePolicy;
use crate::tools::DEFAULT_WEATHER_BASE_URL;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub prompts: PromptsSection,
}

/// [llm] 段：后端选择、采样参数、流式与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / local / mock
    pub provider: String,
    /// 未设置时使用各后端默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub streaming: bool,
    /// 流式调用失败时以非流式重试一次
    pub stream_fallback: bool,
    /// 单次模型调用的 deadline（秒）
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: None,
            max_tokens: None,
            streaming: true,
            stream_fallback: false,
            timeout_secs: 60,
        }
    }
}

/// [agent] 段：步数预算、迭代次数、解析失败策略、停止短语
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
    pub max_iterations: usize,
    pub on_parse_failure: ParseFailurePolicy,
    /// 为空时使用内置默认短语
    pub stop_phrases: Vec<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: 5,
            max_iterations: 3,
            on_parse_failure: ParseFailurePolicy::Retry,
            stop_phrases: Vec::new(),
        }
    }
}

/// [tools] 段：工具超时与 weather 服务地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub timeout_secs: u64,
    pub weather_base_url: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
        }
    }
}

/// [prompts] 段：模板目录与按键覆盖
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PromptsSection {
    /// 目录下的 `<key>.md` 覆盖同名内置模板
    pub dir: Option<PathBuf>,
    pub overrides: HashMap<String, String>,
}

impl AppConfig {
    /// 校验取值范围
    pub fn validate(&self) -> Result<(), String> {
        if self.agent.max_steps == 0 {
            return Err("agent.max_steps must be at least 1".to_string());
        }
        if self.agent.max_iterations == 0 {
            return Err("agent.max_iterations must be at least 1".to_string());
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("llm.temperature must be within 0..=2, got {t}"));
            }
        }
        if self.llm.timeout_secs == 0 {
            return Err("llm.timeout_secs must be at least 1".to_string());
        }
        if self.tools.timeout_secs == 0 {
            return Err("tools.timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }

    /// 叠加 LLM_* 环境变量（只应在入口处调用一次）
    pub fn apply_llm_env(&mut self) {
        self.apply_llm_vars(|key| std::env::var(key).ok());
    }

    fn apply_llm_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("LLM_MODEL_ID") {
            self.llm.model = Some(v);
        }
        if let Some(v) = get("LLM_TIMEOUT") {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.llm.timeout_secs = secs,
                Err(_) => tracing::warn!(value = %v, "LLM_TIMEOUT is not a number, ignored"),
            }
        }
    }
}

/// 从 config 目录加载配置，环境变量 AGENTS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 AGENTS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENTS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
