use serde::{Deserialize, Serialize};
use tiny_react_model::{ModelFinishReason, ModelMessage, ModelRequest};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

/// How a choice ended, as far as the agent is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Finished(ModelFinishReason),
    ContentFiltered,
}

impl Choice {
    pub fn finish_reason(&self) -> FinishReason {
        match self.finish_reason.as_deref() {
            Some("length") => FinishReason::Finished(ModelFinishReason::Length),
            Some("content_filter") => FinishReason::ContentFiltered,
            // The API reports a matched stop sequence as a plain "stop".
            _ => FinishReason::Finished(ModelFinishReason::Stop),
        }
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        stop: req.stop.clone(),
        temperature: req.temperature,
        max_tokens: config.max_tokens,
        stream: false,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    let content = msg.content().to_owned();
    match msg {
        ModelMessage::System(_) => Message::System { content },
        ModelMessage::User(_) => Message::User { content },
        ModelMessage::Assistant(_) => Message::Assistant { content },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![ModelMessage::User("Question: hi".to_owned())],
            stop: vec!["\nObservation".to_owned(), "Observation".to_owned()],
            temperature: Some(0.0),
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();

        let serialized =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            serialized,
            json!({
                "model": "custom",
                "messages": [
                    { "role": "user", "content": "Question: hi" }
                ],
                "stop": ["\nObservation", "Observation"],
                "temperature": 0.0,
                "stream": false
            })
        );
    }

    #[test]
    fn test_optional_fields_omitted() {
        let request = ModelRequest::with_prompt("hi");
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_max_tokens(64)
            .build();
        let serialized =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert!(serialized.get("stop").is_none());
        assert!(serialized.get("temperature").is_none());
        assert_eq!(serialized["max_tokens"], json!(64));
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "I should count.\nAction: get_text_length\nAction Input: DOG\n"
                },
                "finish_reason": "stop"
            }],
            "usage": { "total_tokens": 10 }
        }"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        assert_eq!(completion.id, "chatcmpl-1");
        let choice = &completion.choices[0];
        assert_eq!(
            choice.finish_reason(),
            FinishReason::Finished(ModelFinishReason::Stop)
        );
        assert!(
            choice
                .message
                .content
                .as_deref()
                .unwrap()
                .ends_with("Action Input: DOG\n")
        );
    }

    #[test]
    fn test_finish_reasons() {
        let choice = |reason: &str| Choice {
            message: ResponseMessage { content: None },
            finish_reason: Some(reason.to_owned()),
        };
        assert_eq!(
            choice("length").finish_reason(),
            FinishReason::Finished(ModelFinishReason::Length)
        );
        assert_eq!(
            choice("content_filter").finish_reason(),
            FinishReason::ContentFiltered
        );
    }
}
