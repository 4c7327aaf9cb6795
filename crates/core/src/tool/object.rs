use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolResult};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(
        self: Arc<Self>,
        argument: &str,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(
        self: Arc<Self>,
        argument: &str,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let input: T::Input = match decode_input(argument) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };

        let name = self.0.name().to_owned();
        Box::pin(
            self.0
                .execute(input)
                .instrument(debug_span!("tool execute", tool = %name)),
        )
    }
}

/// Decodes the raw `Action Input` text into the input of a tool.
///
/// Text holding a JSON object is decoded as that object if the input type
/// accepts it. Everything else, including objects the input type rejects,
/// is decoded from the text itself as a JSON string.
pub(crate) fn decode_input<I: DeserializeOwned>(
    argument: &str,
) -> Result<I, serde_json::Error> {
    let text = Value::String(argument.to_owned());
    match serde_json::from_str::<Value>(argument) {
        Ok(object @ Value::Object(_)) => serde_json::from_value(object)
            // Report the object error if both fail.
            .or_else(|err| serde_json::from_value(text).map_err(|_| err)),
        _ => serde_json::from_value(text),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct PathInput {
        path: String,
    }

    #[test]
    fn test_decode_string() {
        let decode = |arg| decode_input::<String>(arg).unwrap();
        assert_eq!(decode("DOG"), "DOG");
        assert_eq!(decode("\"DOG\""), "\"DOG\"");
        assert_eq!(decode("42"), "42");
        assert_eq!(decode(""), "");
        assert_eq!(decode(r#"{"text": "DOG"}"#), r#"{"text": "DOG"}"#);
        assert_eq!(decode("{\"a\":\r\n1}"), "{\"a\":\r\n1}");
    }

    #[test]
    fn test_decode_object() {
        assert_eq!(
            decode_input::<PathInput>(r#"{"path": "/tmp"}"#).unwrap(),
            PathInput {
                path: "/tmp".to_owned()
            }
        );

        let err = decode_input::<PathInput>(r#"{"file": "/tmp"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `path`"), "{err}");
        assert!(decode_input::<PathInput>("/tmp").is_err());
    }
}
