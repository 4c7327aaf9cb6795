use std::future::ready;

use schemars::schema_for;
use serde_json::Value;
use tiny_react_core::tool::{Tool, ToolResult};

/// A tool that measures text in characters.
pub struct TextLengthTool {
    parameter_schema: Value,
}

impl TextLengthTool {
    /// Creates a new text length tool.
    #[inline]
    pub fn new() -> Self {
        TextLengthTool {
            parameter_schema: schema_for!(String).to_value(),
        }
    }
}

impl Default for TextLengthTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Strips what models tend to wrap the argument in: surrounding newlines,
/// then double quotes.
fn unwrap_argument(text: &str) -> &str {
    text.trim_matches('\n').trim_matches('"')
}

impl Tool for TextLengthTool {
    type Input = String;

    fn name(&self) -> &str {
        "get_text_length"
    }

    fn description(&self) -> &str {
        "Returns the length of a text by characters"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        debug!("get_text_length called with: {input:?}");
        let len = unwrap_argument(&input).chars().count();
        ready(Ok(len.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tiny_react_core::tool::Registry;

    use super::*;

    #[tokio::test]
    async fn test_length() {
        let tool = TextLengthTool::new();
        assert_eq!(tool.execute("DOG".to_owned()).await.unwrap(), "3");
        assert_eq!(tool.execute("\"DOG\"\n".to_owned()).await.unwrap(), "3");
        assert_eq!(tool.execute("\n\"añ o\"".to_owned()).await.unwrap(), "4");
        assert_eq!(tool.execute(String::new()).await.unwrap(), "0");
    }

    #[tokio::test]
    async fn test_json_argument_is_measured_as_text() {
        let mut registry = Registry::default();
        registry.register(TextLengthTool::new()).unwrap();

        let result = registry
            .invoke("get_text_length", r#"{"text": "DOG"}"#)
            .await
            .unwrap();
        assert_eq!(result, "15");
    }

    #[test]
    fn test_schema() {
        let tool = TextLengthTool::new();
        assert_eq!(tool.parameter_schema()["type"], "string");
    }
}
