//! Turn 解析：从一次模型输出中提取 Thought / Action 并分类
//!
//! 先按 `Thought:` / `Action:` / `Observation:` 标记切分成段（tokenize）取出 Thought；
//! Action 则从第一个 `Action:` 之后一直取到文本末尾再分类，在闭合括号处截断，
//! 因此答案内部出现的标记文字不会截断 Action：
//! - `Finish[答案]`
//! - `tool_name[自由文本]`
//! - `tool_name(key="value", ...)`
//! - 其它一律为 Unparseable。
//!
//! 解析永不失败：缺少标记时对应字段为 None，由循环决定重试还是终止。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::tools::{ToolCall, ToolInput};

/// 文本中的段标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// 第一个标记之前的内容
    Preamble,
    Thought,
    Action,
    Observation,
}

impl Marker {
    const ALL: [(Marker, &'static str); 3] = [
        (Marker::Thought, "Thought:"),
        (Marker::Action, "Action:"),
        (Marker::Observation, "Observation:"),
    ];
}

/// 切分后的一段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub marker: Marker,
    pub body: &'a str,
}

/// 按标记切分原文；段体不含标记本身，未 trim
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut hits: Vec<(usize, Marker, usize)> = Vec::new();
    for (marker, tag) in Marker::ALL {
        for (pos, _) in text.match_indices(tag) {
            hits.push((pos, marker, tag.len()));
        }
    }
    hits.sort_by_key(|h| h.0);

    let mut segments = Vec::with_capacity(hits.len() + 1);
    let first = hits.first().map(|h| h.0).unwrap_or(text.len());
    if first > 0 {
        segments.push(Segment {
            marker: Marker::Preamble,
            body: &text[..first],
        });
    }
    for (i, &(pos, marker, len)) in hits.iter().enumerate() {
        let end = hits.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        segments.push(Segment {
            marker,
            body: &text[pos + len..end],
        });
    }
    segments
}

/// Action 文本的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAction {
    Finish(String),
    ToolCall(ToolCall),
    Unparseable(String),
}

/// 一次 Turn 的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTurn {
    /// 只有 Thought，没有 Action
    Thought(String),
    ToolCall(ToolCall),
    Finish(String),
    /// 没有可识别内容，或 Action 无法识别（携带原文）
    Unparseable(String),
}

/// 一次 Turn：提取出的字段与分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub parsed: ParsedTurn,
}

/// 解析一次完整的模型输出
pub fn parse_turn(text: &str) -> Turn {
    let segments = tokenize(text);
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    let thought = segments
        .iter()
        .find(|s| s.marker == Marker::Thought)
        .and_then(|s| non_empty(s.body));
    let segment = segments
        .iter()
        .find(|s| s.marker == Marker::Action)
        .and_then(|s| non_empty(s.body));

    let (action, parsed) = match (segment, &thought) {
        (Some(seg), _) => {
            let tail = action_tail(text).unwrap_or(text);
            match classify(tail) {
                (ParsedAction::Finish(answer), span) => {
                    (Some(span.to_string()), ParsedTurn::Finish(answer))
                }
                (ParsedAction::ToolCall(call), span) => {
                    (Some(span.to_string()), ParsedTurn::ToolCall(call))
                }
                (ParsedAction::Unparseable(_), _) => {
                    (Some(seg.clone()), ParsedTurn::Unparseable(seg))
                }
            }
        }
        (None, Some(t)) => (None, ParsedTurn::Thought(t.clone())),
        (None, None) => (None, ParsedTurn::Unparseable(text.trim().to_string())),
    };

    Turn {
        thought,
        action,
        parsed,
    }
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_\-.]*)\s*([\[(])").expect("valid regex"))
}

fn kwarg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#).expect("valid regex"))
}

/// 第一个 `Action:` 之后直到文本末尾的内容
fn action_tail(text: &str) -> Option<&str> {
    text.find("Action:").map(|pos| &text[pos + "Action:".len()..])
}

/// 对单独的 Action 文本分类（与 parse_turn 中的分类一致）
pub fn parse_action(text: &str) -> ParsedAction {
    classify(text).0
}

/// 分类并返回被识别的片段（到闭合括号为止）；无法识别时片段为 trim 后的原文
fn classify(text: &str) -> (ParsedAction, &str) {
    let trimmed = text.trim().trim_matches('`').trim();
    let unparseable = || (ParsedAction::Unparseable(trimmed.to_string()), trimmed);
    let Some(caps) = identifier_re().captures(trimmed) else {
        return unparseable();
    };
    let name = caps[1].to_string();
    let open_at = caps.get(2).map(|m| m.start()).unwrap_or(0);
    let rest = &trimmed[open_at..];

    if rest.starts_with('[') {
        let Some(inner) = bracket_body(rest) else {
            return unparseable();
        };
        // inner 从 rest[1..] 开始，闭合的 `]` 紧随其后
        let span = &trimmed[..open_at + inner.len() + 2];
        if name == "Finish" {
            return (ParsedAction::Finish(inner.trim().to_string()), span);
        }
        let call = ToolCall {
            name,
            input: ToolInput::Text(inner.trim().to_string()),
        };
        return (ParsedAction::ToolCall(call), span);
    }

    if name == "Finish" {
        return unparseable();
    }
    let Some(args) = paren_body(rest) else {
        return unparseable();
    };
    let span = &trimmed[..open_at + args.len() + 2];
    let kwargs: BTreeMap<String, String> = kwarg_re()
        .captures_iter(args)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();
    let input = if kwargs.is_empty() {
        let bare = args.trim().trim_matches(|c| c == '"' || c == '\'');
        ToolInput::Text(bare.to_string())
    } else {
        ToolInput::Args(kwargs)
    };
    (ParsedAction::ToolCall(ToolCall { name, input }), span)
}

/// `[...]` 的内容：在与开头方括号配对的 `]` 处结束（内部成对的方括号保留）；
/// 方括号不成对时退回到第一个 `]`
fn bracket_body(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut first_close = None;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                first_close.get_or_insert(i);
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[1..i]);
                }
            }
            _ => {}
        }
    }
    first_close.map(|i| &s[1..i])
}

/// `(...)` 的内容：忽略双引号内的括号
fn paren_body(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_call(name: &str, input: &str) -> ParsedTurn {
        ParsedTurn::ToolCall(ToolCall {
            name: name.into(),
            input: ToolInput::Text(input.into()),
        })
    }

    #[test]
    fn test_thought_and_action_extracted_exactly() {
        let turn = parse_turn("Thought: I should look it up.\nAction: Search[weather]");
        assert_eq!(turn.thought.as_deref(), Some("I should look it up."));
        assert_eq!(turn.action.as_deref(), Some("Search[weather]"));
        assert_eq!(turn.parsed, text_call("Search", "weather"));
    }

    #[test]
    fn test_multiline_thought() {
        let turn = parse_turn("Thought: first line\nsecond line\nAction: Finish[done]");
        assert_eq!(turn.thought.as_deref(), Some("first line\nsecond line"));
        assert_eq!(turn.parsed, ParsedTurn::Finish("done".into()));
    }

    #[test]
    fn test_finish_42() {
        assert_eq!(parse_action("Finish[42]"), ParsedAction::Finish("42".into()));
    }

    #[test]
    fn test_search_weather() {
        assert_eq!(
            parse_action("Search[weather]"),
            ParsedAction::ToolCall(ToolCall {
                name: "Search".into(),
                input: ToolInput::Text("weather".into()),
            })
        );
    }

    #[test]
    fn test_action_reparse_is_idempotent() {
        let raw = "Thought: need data\nAction: get_weather(city=\"Shenzhen\")";
        let turn = parse_turn(raw);
        let action = turn.action.clone().unwrap();
        let again = parse_turn(&format!("Action: {action}"));
        assert_eq!(again.parsed, turn.parsed);
        assert_eq!(again.action.as_deref(), Some(action.as_str()));
    }

    #[test]
    fn test_rendered_keyword_call_reparses_to_same_call() {
        let original = parse_action(r#"get_weather(city="Shenzhen")"#);
        let ParsedAction::ToolCall(call) = &original else {
            panic!("Expected ToolCall, got {original:?}");
        };
        let rendered = call.to_string();
        assert_eq!(rendered, r#"get_weather(city="Shenzhen")"#);
        assert_eq!(parse_action(&rendered), original);
    }

    #[test]
    fn test_keyword_args() {
        match parse_action(r#"get_attraction(city="Beijing", weather="sunny")"#) {
            ParsedAction::ToolCall(call) => {
                assert_eq!(call.name, "get_attraction");
                assert_eq!(call.input.get("city"), Some("Beijing"));
                assert_eq!(call.input.get("weather"), Some("sunny"));
            }
            other => panic!("Expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn test_positional_paren_arg_becomes_text() {
        assert_eq!(
            parse_action(r#"get_weather("Shenzhen")"#),
            ParsedAction::ToolCall(ToolCall {
                name: "get_weather".into(),
                input: ToolInput::Text("Shenzhen".into()),
            })
        );
    }

    #[test]
    fn test_multiline_finish_with_nested_brackets() {
        let turn = parse_turn("Thought: ok\nAction: Finish[list: [1, 2]\nand more] trailing");
        assert_eq!(
            turn.parsed,
            ParsedTurn::Finish("list: [1, 2]\nand more".into())
        );
    }

    #[test]
    fn test_first_action_governs() {
        let turn = parse_turn(
            "Thought: a\nAction: Search[one]\nObservation: fake\nThought: b\nAction: Finish[two]",
        );
        assert_eq!(turn.action.as_deref(), Some("Search[one]"));
        assert_eq!(turn.parsed, text_call("Search", "one"));
    }

    #[test]
    fn test_trailing_content_after_finish_ignored() {
        let turn = parse_turn("Action: Finish[yes] because reasons");
        assert_eq!(turn.parsed, ParsedTurn::Finish("yes".into()));
    }

    #[test]
    fn test_backticks_tolerated() {
        assert_eq!(parse_action("`Finish[ok]`"), ParsedAction::Finish("ok".into()));
    }

    #[test]
    fn test_thought_without_action() {
        let turn = parse_turn("Thought: still thinking about it");
        assert_eq!(turn.action, None);
        assert_eq!(
            turn.parsed,
            ParsedTurn::Thought("still thinking about it".into())
        );
    }

    #[test]
    fn test_unrecognized_action() {
        let turn = parse_turn("Thought: hmm\nAction: I will now search the web");
        assert_eq!(
            turn.parsed,
            ParsedTurn::Unparseable("I will now search the web".into())
        );
    }

    #[test]
    fn test_no_markers_at_all() {
        let turn = parse_turn("Just some prose.");
        assert_eq!(turn.thought, None);
        assert_eq!(turn.action, None);
        assert_eq!(turn.parsed, ParsedTurn::Unparseable("Just some prose.".into()));
    }

    #[test]
    fn test_unclosed_bracket_is_unparseable() {
        assert!(matches!(
            parse_action("Finish[never closed"),
            ParsedAction::Unparseable(_)
        ));
    }

    #[test]
    fn test_marker_text_inside_finish_answer() {
        let turn = parse_turn("Thought: ok\nAction: Finish[The Observation: it rains]");
        assert_eq!(
            turn.parsed,
            ParsedTurn::Finish("The Observation: it rains".into())
        );
        assert_eq!(
            turn.action.as_deref(),
            Some("Finish[The Observation: it rains]")
        );
    }

    #[test]
    fn test_marker_text_inside_tool_args() {
        let turn = parse_turn("Action: Search[Thought: experiments]\nObservation: fake");
        assert_eq!(turn.parsed, text_call("Search", "Thought: experiments"));
        assert_eq!(turn.action.as_deref(), Some("Search[Thought: experiments]"));
    }

    #[test]
    fn test_unbalanced_open_bracket_stops_at_first_close() {
        assert_eq!(
            parse_action("Finish[press the [ key]"),
            ParsedAction::Finish("press the [ key".into())
        );
    }

    #[test]
    fn test_unrecognized_action_keeps_segment_text() {
        let turn = parse_turn("Action: just chatting\nObservation: made up");
        assert_eq!(turn.action.as_deref(), Some("just chatting"));
        assert_eq!(turn.parsed, ParsedTurn::Unparseable("just chatting".into()));
    }

    #[test]
    fn test_tokenize_segments_in_order() {
        let segs = tokenize("intro Thought: t Action: a");
        let markers: Vec<Marker> = segs.iter().map(|s| s.marker).collect();
        assert_eq!(
            markers,
            vec![Marker::Preamble, Marker::Thought, Marker::Action]
        );
        assert_eq!(segs[2].body, " a");
    }
}
