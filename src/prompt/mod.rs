//! Prompt 构建：具名模板集合 + 变量 → 发往模型的消息列表
//!
//! PromptSet 以内置模板为底，调用方模板按键覆盖（配置 [prompts.overrides] 或 prompts 目录下的 `<key>.md`）。
//! 渲染是纯函数：相同模板与变量得到相同消息。

pub mod defaults;
pub mod template;

use std::collections::HashMap;
use std::path::Path;

pub use template::PromptTemplate;

use crate::core::AgentError;
use crate::memory::Message;

/// 一组具名模板
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<String, PromptTemplate>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let templates = defaults::builtin()
            .into_iter()
            .map(|(k, v)| (k.to_string(), PromptTemplate::new(k, v)))
            .collect();
        Self { templates }
    }
}

impl PromptSet {
    /// 按键覆盖默认模板；非内置键保留但输出警告
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, text) in overrides {
            let key = key.into();
            if !defaults::ALL_KEYS.contains(&key.as_str()) {
                tracing::warn!(template = %key, "prompt override has no built-in counterpart");
            }
            self.templates
                .insert(key.clone(), PromptTemplate::new(key, text));
        }
        self
    }

    /// 读取目录下与模板键同名的 `<key>.md` 作为覆盖；目录不存在时原样返回
    pub fn load_dir(self, dir: &Path) -> Self {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "prompt dir not found, using defaults");
            return self;
        }
        let found: Vec<(String, String)> = defaults::ALL_KEYS
            .iter()
            .filter_map(|key| {
                let path = dir.join(format!("{key}.md"));
                std::fs::read_to_string(&path)
                    .ok()
                    .map(|text| (key.to_string(), text))
            })
            .collect();
        if !found.is_empty() {
            tracing::info!(dir = %dir.display(), count = found.len(), "loaded prompt overrides");
        }
        self.with_overrides(found)
    }

    pub fn get(&self, key: &str) -> Result<&PromptTemplate, AgentError> {
        self.templates
            .get(key)
            .ok_or_else(|| AgentError::UnknownTemplate(key.to_string()))
    }

    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String, AgentError> {
        self.get(key)?.render(vars)
    }

    /// 单条 user 消息
    pub fn user_message(&self, key: &str, vars: &[(&str, &str)]) -> Result<Vec<Message>, AgentError> {
        Ok(vec![Message::user(self.render(key, vars)?)])
    }

    /// system + user 两条消息
    pub fn system_and_user(
        &self,
        system_key: &str,
        user_key: &str,
        vars: &[(&str, &str)],
    ) -> Result<Vec<Message>, AgentError> {
        Ok(vec![
            Message::system(self.render(system_key, vars)?),
            Message::user(self.render(user_key, vars)?),
        ])
    }
}
