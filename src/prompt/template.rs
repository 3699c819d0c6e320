//! Prompt 模板：`{slot}` 占位符替换
//!
//! `{{` / `}}` 输出字面花括号；`{` 后不是合法标识符加 `}` 时按字面输出（模板里可以放 JSON 示例）。
//! 模板需要但调用方未提供的占位符是编程错误，返回 AgentError::MissingSlot。

use crate::core::AgentError;

/// 具名模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    text: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 模板中出现的占位符（按出现顺序，去重）
    pub fn slots(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for piece in scan(&self.text) {
            if let Piece::Slot(s) = piece {
                if !out.iter().any(|o| o == s) {
                    out.push(s.to_string());
                }
            }
        }
        out
    }

    /// 用 vars 填充全部占位符；多余的变量被忽略
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, AgentError> {
        let mut out = String::with_capacity(self.text.len());
        for piece in scan(&self.text) {
            match piece {
                Piece::Literal(s) => out.push_str(s),
                Piece::Slot(slot) => {
                    let value = vars
                        .iter()
                        .find(|(k, _)| *k == slot)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| AgentError::MissingSlot {
                            template: self.name.clone(),
                            slot: slot.to_string(),
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

enum Piece<'a> {
    Literal(&'a str),
    Slot(&'a str),
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn scan(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let bytes = text.as_bytes();
    let mut lit_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                pieces.push(Piece::Literal(&text[lit_start..i + 1]));
                i += 2;
                lit_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                pieces.push(Piece::Literal(&text[lit_start..i + 1]));
                i += 2;
                lit_start = i;
            }
            b'{' => {
                let close = text[i + 1..].find('}').map(|p| i + 1 + p);
                match close {
                    Some(end) if is_ident(&text[i + 1..end]) => {
                        pieces.push(Piece::Literal(&text[lit_start..i]));
                        pieces.push(Piece::Slot(&text[i + 1..end]));
                        i = end + 1;
                        lit_start = i;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    pieces.push(Piece::Literal(&text[lit_start..]));
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_slots() {
        let t = PromptTemplate::new("greet", "Task: {task}\nAgain: {task}");
        assert_eq!(t.render(&[("task", "sum")]).unwrap(), "Task: sum\nAgain: sum");
    }

    #[test]
    fn test_missing_slot_is_error() {
        let t = PromptTemplate::new("reflect", "Review:\n{code}");
        match t.render(&[("task", "x"), ("content", "y")]) {
            Err(AgentError::MissingSlot { template, slot }) => {
                assert_eq!(template, "reflect");
                assert_eq!(slot, "code");
            }
            other => panic!("Expected MissingSlot, got {other:?}"),
        }
    }

    #[test]
    fn test_escaped_and_literal_braces() {
        let t = PromptTemplate::new("x", "`{{tool_name}}[{{tool_input}}]` {\"a\": 1} {q}");
        assert_eq!(
            t.render(&[("q", "?")]).unwrap(),
            "`{tool_name}[{tool_input}]` {\"a\": 1} ?"
        );
        assert_eq!(t.slots(), vec!["q".to_string()]);
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let t = PromptTemplate::new("x", "{a}");
        assert_eq!(t.render(&[("a", "{b}")]).unwrap(), "{b}");
    }

    #[test]
    fn test_non_ascii_text_preserved() {
        let t = PromptTemplate::new("x", "问题: {question}。");
        assert_eq!(t.render(&[("question", "几点")]).unwrap(), "问题: 几点。");
    }
}
