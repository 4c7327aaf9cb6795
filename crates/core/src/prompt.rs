//! Prompt assembly.

use std::borrow::Cow;

use serde_json::Value;

use crate::tool::{Registry, ToolDefinition};

/// The built-in prompt template.
///
/// Templates may use the `{{tools}}`, `{{tool_names}}`, `{{question}}` and
/// `{{scratchpad}}` placeholders.
pub const DEFAULT_TEMPLATE: &str = include_str!("./prompt.md");

/// Builds the exact text sent to the model on each turn.
///
/// The tool list is rendered once, when the assembler is created. Assembling
/// is a pure function of the question and the rendered history, so the same
/// inputs always yield the same prompt.
#[derive(Clone, Debug)]
pub struct PromptAssembler {
    template: Cow<'static, str>,
    tools: String,
    tool_names: String,
}

impl PromptAssembler {
    /// Creates an assembler with the built-in template.
    #[inline]
    pub fn new(registry: &Registry) -> Self {
        Self::with_template(DEFAULT_TEMPLATE, registry)
    }

    /// Creates an assembler with a custom template.
    pub fn with_template<S: Into<Cow<'static, str>>>(
        template: S,
        registry: &Registry,
    ) -> Self {
        let definitions = registry.definitions();
        let tools = definitions
            .iter()
            .map(describe_tool)
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = definitions
            .iter()
            .map(|def| def.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            template: template.into(),
            tools,
            tool_names,
        }
    }

    /// Assembles the prompt for one turn.
    pub fn assemble(&self, question: &str, scratchpad: &str) -> String {
        substitute(&self.template, |key| match key {
            "tools" => Some(self.tools.as_str()),
            "tool_names" => Some(self.tool_names.as_str()),
            "question" => Some(question),
            "scratchpad" => Some(scratchpad),
            _ => None,
        })
    }
}

fn describe_tool(def: &ToolDefinition) -> String {
    let mut line = format!("{}: {}", def.name, def.description);
    // Only structured inputs need their shape spelled out.
    if let Some(properties) = def.parameters.get("properties") {
        let schema = Value::Object(
            [("properties".to_owned(), properties.clone())]
                .into_iter()
                .collect(),
        );
        line.push_str(&format!(" Input must be a JSON object: {schema}"));
    }
    line
}

/// Replaces `{{key}}` placeholders in a single pass. Unknown placeholders
/// are kept as they are, and substituted text is never scanned again.
fn substitute<'a>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match lookup(&after_open[..end]) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}
