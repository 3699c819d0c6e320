//! 运行记忆：单次运行内的有序记录
//!
//! 只追加、不修改；render 把全部记录按插入顺序拼成可直接插入下一轮 Prompt 的文本，
//! 这是先前轮次影响后续模型调用的唯一途径。

use serde::Serialize;

/// 记录类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// 产出物（初稿 / 改进稿 / 计划步骤结果）
    Execution,
    /// 评审反馈
    Reflection,
    /// 模型给出的 Action 原文（工具调用或 Finish）
    Action,
    /// 工具返回或格式纠正提示
    Observation,
}

/// 单条记录
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub content: String,
    pub step_index: usize,
}

/// 渲染风格：不同循环变体的 history 版式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TranscriptStyle {
    /// `Action: ...` / `Observation: ...` 逐行
    #[default]
    React,
    /// `--- previous attempt ---` / `--- reviewer feedback ---` 段落
    Reflection,
    /// `Step n: ...` / `Result: ...`，步骤之间空一行
    PlanSteps,
}

/// 运行记忆
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    style: TranscriptStyle,
}

impl Transcript {
    pub fn new(style: TranscriptStyle) -> Self {
        Self {
            entries: Vec::new(),
            style,
        }
    }

    pub fn append(&mut self, kind: EntryKind, content: impl Into<String>, step_index: usize) {
        self.entries.push(TranscriptEntry {
            kind,
            content: content.into(),
            step_index,
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn style(&self) -> TranscriptStyle {
        self.style
    }

    /// 最近一条指定类型记录的内容（从尾部向前查找）
    pub fn last(&self, kind: EntryKind) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .map(|e| e.content.as_str())
    }

    pub fn count(&self, kind: EntryKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// 按插入顺序渲染为 Prompt 片段
    pub fn render(&self) -> String {
        match self.style {
            TranscriptStyle::React => self
                .entries
                .iter()
                .map(|e| match e.kind {
                    EntryKind::Action => format!("Action: {}", e.content),
                    EntryKind::Observation => format!("Observation: {}", e.content),
                    EntryKind::Execution => format!("Answer: {}", e.content),
                    EntryKind::Reflection => format!("Feedback: {}", e.content),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            TranscriptStyle::Reflection => self
                .entries
                .iter()
                .map(|e| match e.kind {
                    EntryKind::Execution => format!("--- previous attempt ---\n{}", e.content),
                    EntryKind::Reflection => format!("--- reviewer feedback ---\n{}", e.content),
                    EntryKind::Action => format!("--- action ---\n{}", e.content),
                    EntryKind::Observation => format!("--- observation ---\n{}", e.content),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            TranscriptStyle::PlanSteps => {
                let mut out = String::new();
                for e in &self.entries {
                    match e.kind {
                        EntryKind::Action => {
                            if !out.is_empty() {
                                out.push_str("\n\n");
                            }
                            out.push_str(&format!("Step {}: {}", e.step_index + 1, e.content));
                        }
                        EntryKind::Execution => {
                            out.push_str(&format!("\nResult: {}", e.content));
                        }
                        EntryKind::Reflection | EntryKind::Observation => {
                            out.push_str(&format!("\nNote: {}", e.content));
                        }
                    }
                }
                out
            }
        }
    }
}
