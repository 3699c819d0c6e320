//! Agent 构建器：统一的 Agent 初始化逻辑
//!
//! 从 AppConfig 构建模型后端、工具注册表与模板集合，再组装三种 Agent；
//! CLI 与测试共用同一套组装方式，测试可注入 Mock 客户端与自定义工具。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::core::{AgentError, RecoveryEngine};
use crate::llm::{CompletionOptions, LlmClient, LocalHttpClient, MockLlmClient, ModelBackend, OpenAiClient};
use crate::plan::{PlanAndSolveAgent, PlanExecutor, Planner};
use crate::prompt::PromptSet;
use crate::react::{ReActAgent, RunEvent};
use crate::reflection::{Critic, ReflectionAgent};
use crate::tools::{EchoTool, ToolExecutor, ToolRegistry, WeatherTool};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// 按 llm.provider 创建客户端：openai / local / mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let llm = &cfg.llm;
    match llm.provider.to_lowercase().as_str() {
        "openai" => {
            let api_key = llm.api_key.as_deref().ok_or_else(|| {
                AgentError::Config(
                    "provider 'openai' needs llm.api_key (or LLM_API_KEY)".to_string(),
                )
            })?;
            let model = llm.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
            tracing::info!(model = %model, base_url = ?llm.base_url, "Using OpenAI-compatible LLM");
            Ok(Arc::new(OpenAiClient::new(
                llm.base_url.as_deref(),
                model,
                api_key,
            )))
        }
        "local" | "ollama" => {
            let client = LocalHttpClient::new(
                llm.base_url.as_deref(),
                llm.model.as_deref(),
                llm.api_key.as_deref(),
            )
            .with_timeout(Duration::from_secs(llm.timeout_secs));
            tracing::info!(model = %client.model(), base_url = %client.base_url(), "Using local LLM");
            Ok(Arc::new(client))
        }
        "mock" => {
            tracing::warn!("Using Mock LLM");
            Ok(Arc::new(MockLlmClient::default()))
        }
        other => Err(AgentError::Config(format!(
            "unknown llm.provider '{other}' (expected openai, local or mock)"
        ))),
    }
}

/// Agent 构建器：统一配置和初始化 Agent 的各个组件
pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    tools: Option<Arc<ToolRegistry>>,
    prompts: Option<Arc<PromptSet>>,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            tools: None,
            prompts: None,
            event_tx: None,
        }
    }

    /// 注入客户端（不再按 provider 创建）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 使用自定义工具注册表替代内置工具
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(Arc::new(tools));
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Some(Arc::new(prompts));
        self
    }

    pub fn with_event_tx(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 内置工具：echo、get_weather
    pub fn build_tool_registry(&self) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        tools.register(WeatherTool::new(
            self.config.tools.weather_base_url.clone(),
            self.config.tools.timeout_secs,
        ));
        tools
    }

    pub fn tools(&self) -> Arc<ToolRegistry> {
        self.tools
            .clone()
            .unwrap_or_else(|| Arc::new(self.build_tool_registry()))
    }

    /// 内置模板 <- prompts.dir 下的文件 <- prompts.overrides
    pub fn build_prompts(&self) -> Arc<PromptSet> {
        if let Some(p) = &self.prompts {
            return p.clone();
        }
        let mut set = PromptSet::default();
        if let Some(dir) = &self.config.prompts.dir {
            set = set.load_dir(dir);
        }
        Arc::new(set.with_overrides(self.config.prompts.overrides.clone()))
    }

    pub fn build_llm(&self) -> Result<Arc<dyn LlmClient>, AgentError> {
        match &self.llm {
            Some(llm) => Ok(llm.clone()),
            None => create_llm_from_config(&self.config),
        }
    }

    pub fn build_backend(&self) -> Result<ModelBackend, AgentError> {
        let llm = &self.config.llm;
        Ok(ModelBackend::new(self.build_llm()?)
            .with_options(CompletionOptions {
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
            })
            .with_streaming(llm.streaming)
            .with_stream_fallback(llm.stream_fallback)
            .with_timeout(Duration::from_secs(llm.timeout_secs)))
    }

    pub fn build_react(&self) -> Result<ReActAgent, AgentError> {
        let executor = ToolExecutor::new(self.tools(), self.config.tools.timeout_secs);
        let mut agent = ReActAgent::new(self.build_backend()?, executor)
            .with_prompts(self.build_prompts())
            .with_recovery(RecoveryEngine::new(self.config.agent.on_parse_failure))
            .with_max_steps(self.config.agent.max_steps);
        if let Some(tx) = &self.event_tx {
            agent = agent.with_event_tx(tx.clone());
        }
        Ok(agent)
    }

    pub fn build_plan(&self) -> Result<PlanAndSolveAgent, AgentError> {
        let backend = self.build_backend()?;
        let prompts = self.build_prompts();
        let mut agent = PlanAndSolveAgent::new(
            Planner::new(backend.clone(), prompts.clone()),
            PlanExecutor::new(backend, prompts),
        )
        .with_max_steps(self.config.agent.max_steps);
        if let Some(tx) = &self.event_tx {
            agent = agent.with_event_tx(tx.clone());
        }
        Ok(agent)
    }

    pub fn build_reflection(&self) -> Result<ReflectionAgent, AgentError> {
        let backend = self.build_backend()?;
        let prompts = self.build_prompts();
        let critic = Critic::new(backend.clone(), prompts.clone())
            .with_stop_phrases(self.config.agent.stop_phrases.clone());
        let mut agent = ReflectionAgent::new(backend, critic, prompts)
            .with_max_iterations(self.config.agent.max_iterations);
        if let Some(tx) = &self.event_tx {
            agent = agent.with_event_tx(tx.clone());
        }
        Ok(agent)
    }
}
