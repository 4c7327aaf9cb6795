use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use tiny_react_model::{
    ModelFinishReason, ModelResponse, ModelResponseEvent,
};

/// A fully received chat completion, replayed as response events.
#[derive(Debug)]
pub struct OpenAIResponse {
    id: String,
    events: VecDeque<ModelResponseEvent>,
}

impl OpenAIResponse {
    pub(crate) fn new(
        id: String,
        content: Option<String>,
        finish_reason: ModelFinishReason,
    ) -> Self {
        let mut events = VecDeque::with_capacity(2);
        if let Some(content) = content.filter(|c| !c.is_empty()) {
            events.push_back(ModelResponseEvent::MessageDelta(content));
        }
        events.push_back(ModelResponseEvent::Completed(finish_reason));
        Self { id, events }
    }

    /// Returns the completion id assigned by the server.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;

    use super::*;

    #[tokio::test]
    async fn test_replay_events() {
        let mut resp = OpenAIResponse::new(
            "chatcmpl-1".to_owned(),
            Some("Final Answer: 3".to_owned()),
            ModelFinishReason::Stop,
        );
        assert_eq!(resp.id(), "chatcmpl-1");

        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
                .await
                .unwrap()
        {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Final Answer: 3".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_content() {
        let mut resp = OpenAIResponse::new(
            "chatcmpl-2".to_owned(),
            None,
            ModelFinishReason::Length,
        );
        let event = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap();
        assert_eq!(
            event,
            Some(ModelResponseEvent::Completed(ModelFinishReason::Length))
        );
    }
}
