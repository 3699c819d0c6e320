//! Planner：一次模型调用生成计划，并从回复中解析出步骤列表
//!
//! 计划必须放在代码块中（```python / ```json / 裸 ```），内容为字符串列表；
//! 先按 JSON 解析，失败再按 Python 字面量（允许单引号、末尾逗号）解析。
//! 任何解析失败都得到空计划，由调用方决定中止。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::ModelBackend;
use crate::prompt::{defaults, PromptSet};

/// 代码块可接受的语言标记
const FENCE_LANGS: [&str; 3] = ["python", "json", "py"];

/// Planner：持有模型后端与模板集合
pub struct Planner {
    backend: ModelBackend,
    prompts: Arc<PromptSet>,
}

impl Planner {
    pub fn new(backend: ModelBackend, prompts: Arc<PromptSet>) -> Self {
        Self { backend, prompts }
    }

    /// 生成计划；回复无法解析时返回空列表
    pub async fn plan(&self, question: &str) -> Result<Vec<String>, AgentError> {
        let messages = self
            .prompts
            .user_message(defaults::PLANNER, &[("question", question)])?;
        let raw = self.backend.think(&messages).await?;
        let steps = parse_plan(&raw);
        if steps.is_empty() {
            tracing::warn!(response_len = raw.len(), "planner response contained no usable plan");
        } else {
            tracing::info!(steps = steps.len(), "plan generated");
        }
        Ok(steps)
    }
}

/// 从模型回复中解析计划
pub fn parse_plan(text: &str) -> Vec<String> {
    let Some(body) = fenced_block(text) else {
        return Vec::new();
    };
    if let Ok(steps) = serde_json::from_str::<Vec<String>>(body) {
        return steps;
    }
    parse_py_list(body).unwrap_or_default()
}

/// 第一个代码块的内容（去掉语言标记）
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let end = rest.find("```")?;
    let mut body = rest[..end].trim_start_matches([' ', '\t']);
    for lang in FENCE_LANGS {
        if let Some(stripped) = body.strip_prefix(lang) {
            if stripped.starts_with(char::is_whitespace) || stripped.starts_with('[') {
                body = stripped;
                break;
            }
        }
    }
    Some(body.trim())
}

/// 解析 Python 风格的字符串列表：`['a', "b",]`
fn parse_py_list(s: &str) -> Option<Vec<String>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut chars = inner.chars().peekable();
    let mut items = Vec::new();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return None;
        }
        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => match chars.next()? {
                    'n' => item.push('\n'),
                    't' => item.push('\t'),
                    other => item.push(other),
                },
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(_) => return None,
        }
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockReply};

    #[test]
    fn test_parse_python_fence() {
        let text = "Here is the plan:\n```python\n[\"a\", \"b\", \"c\"]\n```\nGood luck";
        assert_eq!(parse_plan(text), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_inline_bare_fence() {
        assert_eq!(parse_plan(r#"```["a","b","c"]```"#), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_json_fence() {
        assert_eq!(parse_plan("```json\n[\"x\"]\n```"), vec!["x"]);
    }

    #[test]
    fn test_parse_single_quotes_and_trailing_comma() {
        let text = "```python\n['find the price', 'it\\'s doubled',\n]\n```";
        assert_eq!(parse_plan(text), vec!["find the price", "it's doubled"]);
    }

    #[test]
    fn test_missing_fence_is_empty() {
        assert!(parse_plan(r#"["a", "b"]"#).is_empty());
    }

    #[test]
    fn test_non_string_items_are_empty() {
        assert!(parse_plan("```python\n[1, 2]\n```").is_empty());
        assert!(parse_plan("```python\nnot a list\n```").is_empty());
        assert!(parse_plan("```python\n['unterminated]\n```").is_empty());
    }

    #[tokio::test]
    async fn test_planner_uses_template() {
        let mock = Arc::new(MockLlmClient::new(vec![MockReply::text(
            "```python\n['step one']\n```",
        )]));
        let planner = Planner::new(ModelBackend::new(mock.clone()), Arc::new(PromptSet::default()));
        assert_eq!(planner.plan("how?").await.unwrap(), vec!["step one"]);
        assert!(mock.calls()[0][0].content.contains("Question: how?"));
    }
}
