use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::Error;
use crate::tool::Tool;
use crate::tool::object::{ToolObject, ToolObjectImpl};

/// Describes a registered tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDefinition {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool, typically a JSON schema.
    pub parameters: Value,
}

/// A fixed set of tools, addressed by name.
///
/// Tools keep their registration order, which is also the order they are
/// presented to the model.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Arc<dyn ToolObject>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    /// Registers a tool. Fails if a tool with the same name exists.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), Error> {
        let name = tool.name().to_owned();
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateCapability { name });
        }
        trace!("registering tool: {name}");
        self.by_name.insert(name, self.tools.len());
        self.tools.push(Arc::new(ToolObjectImpl(tool)));
        Ok(())
    }

    /// Looks up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<ToolDefinition, Error> {
        self.get(name).map(|tool| definition(tool.as_ref()))
    }

    /// Returns the definitions of all tools, in registration order.
    #[inline]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| definition(tool.as_ref())).collect()
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes a tool with the raw argument text.
    ///
    /// A failure of the tool itself is surfaced as
    /// [`Error::CapabilityExecutionFailure`], carrying the original cause.
    /// It is never retried here.
    pub async fn invoke(
        &self,
        name: &str,
        argument: &str,
    ) -> Result<String, Error> {
        let tool = Arc::clone(self.get(name)?);
        trace!("invoking tool ({name}) with argument: {argument:?}");
        tool.execute(argument).await.map_err(|cause| {
            warn!("tool ({name}) failed: {cause}");
            Error::CapabilityExecutionFailure {
                name: name.to_owned(),
                cause,
            }
        })
    }

    fn get(&self, name: &str) -> Result<&Arc<dyn ToolObject>, Error> {
        self.by_name
            .get(name)
            .map(|&idx| &self.tools[idx])
            .ok_or_else(|| Error::UnknownCapability {
                name: name.to_owned(),
            })
    }
}

fn definition(tool: &dyn ToolObject) -> ToolDefinition {
    ToolDefinition {
        name: tool.name().to_owned(),
        description: tool.description().trim().to_owned(),
        parameters: tool.parameter_schema().clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;
    use crate::tool::{Error as ToolError, ErrorKind as ToolErrorKind};
    use crate::tool::ToolResult;

    static STRING_SCHEMA: &Value = &Value::Null;

    struct Upper;

    impl Tool for Upper {
        type Input = String;

        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "\n  Uppercases the text.  "
        }

        fn parameter_schema(&self) -> &Value {
            STRING_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.to_uppercase()))
        }
    }

    #[derive(Deserialize)]
    struct DivideInput {
        a: i64,
        b: i64,
    }

    struct Divide;

    impl Tool for Divide {
        type Input = DivideInput;

        fn name(&self) -> &str {
            "divide"
        }

        fn description(&self) -> &str {
            "Divides a by b."
        }

        fn parameter_schema(&self) -> &Value {
            STRING_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(match input.a.checked_div(input.b) {
                Some(q) => Ok(q.to_string()),
                None => Err(ToolError::execution_error()
                    .with_reason("division by zero")),
            })
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry.register(Upper).unwrap();
        registry.register(Divide).unwrap();
        registry
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = registry();
        assert_eq!(registry.len(), 2);

        let err = registry.register(Upper).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateCapability);
        assert_eq!(registry.len(), 2);

        let def = registry.lookup("upper").unwrap();
        assert_eq!(def.description, "Uppercases the text.");
        let names: Vec<_> =
            registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["upper", "divide"]);

        let err = registry.lookup("lower").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownCapability { ref name } if name == "lower"
        ));
    }

    #[tokio::test]
    async fn test_invoke() {
        let registry = registry();
        assert_eq!(registry.invoke("upper", "dog").await.unwrap(), "DOG");
        assert_eq!(
            registry.invoke("upper", r#"{"text": "dog"}"#).await.unwrap(),
            r#"{"TEXT": "DOG"}"#
        );
        assert_eq!(
            registry
                .invoke("divide", &json!({ "a": 7, "b": 2 }).to_string())
                .await
                .unwrap(),
            "3"
        );
    }

    #[tokio::test]
    async fn test_invoke_failures() {
        let registry = registry();

        let err = registry.invoke("lower", "dog").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCapability);

        let err = registry
            .invoke("divide", r#"{"a": 1, "b": 0}"#)
            .await
            .unwrap_err();
        let Error::CapabilityExecutionFailure { name, cause } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(name, "divide");
        assert_eq!(cause.kind(), ToolErrorKind::ExecutionError);
        assert_eq!(cause.reason(), "division by zero");

        // Not an object, so the input can't be deserialized.
        let err = registry.invoke("divide", "1 / 0").await.unwrap_err();
        let Error::CapabilityExecutionFailure { cause, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(cause.kind(), ToolErrorKind::InvalidInput);
    }
}
