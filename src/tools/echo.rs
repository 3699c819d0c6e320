//! Echo 工具（测试 / 离线演示用）

use async_trait::async_trait;

use crate::tools::{Tool, ToolInput};

/// Echo 工具：回显输入文本
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the input back (for testing). Usage: echo[text]"
    }

    async fn execute(&self, input: ToolInput) -> Result<String, String> {
        let text = input.as_text();
        if text.trim().is_empty() {
            Ok("(empty)".to_string())
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_text_and_empty() {
        assert_eq!(
            EchoTool.execute(ToolInput::Text("hi".into())).await.unwrap(),
            "hi"
        );
        assert_eq!(
            EchoTool.execute(ToolInput::Text("  ".into())).await.unwrap(),
            "(empty)"
        );
    }
}
