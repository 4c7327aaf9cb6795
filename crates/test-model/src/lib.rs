//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tiny_react_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    deltas: VecDeque<String>,
    finish_reason: Option<ModelFinishReason>,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if let Some(delta) = this.deltas.pop_front() {
                return Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                    delta,
                ))));
            }
            // `None` after the completion event has been taken, in case this
            // method is called after completion.
            return Poll::Ready(Ok(this
                .finish_reason
                .take()
                .map(ModelResponseEvent::Completed)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    completions: Vec<PresetCompletion>,
    cursor: usize,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is what the
/// model should answer to each request, in order. Each successful request
/// consumes one completion. If the script runs out, an error is returned.
///
/// Like a real service, the provider honors the truncation markers of the
/// request: a scripted completion is cut right before the first marker it
/// contains. This makes it possible to script a model that tries to make up
/// its own observations.
///
/// Clones share the same script and cursor.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Creates a provider that serves the given completions in order.
    pub fn with_script<I: IntoIterator<Item = PresetCompletion>>(
        completions: I,
    ) -> Self {
        let provider = Self::default();
        provider.lock().completions.extend(completions);
        provider
    }

    #[inline]
    pub fn add_completion(&mut self, preset: PresetCompletion) {
        self.lock().completions.push(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, including failed ones.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of completions that have been served.
    pub fn served(&self) -> usize {
        self.lock().cursor
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let Some(preset) = script.completions.get(script.cursor).cloned()
        else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };

        if let Some(failures) = preset.failures {
            script.failed_attempts += 1;
            if failures == 0 || script.failed_attempts <= failures {
                return Err(Error {
                    message: "scripted failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
        }
        script.failed_attempts = 0;
        script.cursor += 1;

        let (text, finish_reason) = truncate(&preset.text, &req.stop);
        let deltas = preset.split(text).into_iter().map(str::to_owned);
        Ok(TestModelResponse {
            deltas: deltas.collect(),
            finish_reason: Some(finish_reason),
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        })
    }
}

/// Cuts `text` right before the earliest truncation marker.
fn truncate<'a>(
    text: &'a str,
    stop: &[String],
) -> (&'a str, ModelFinishReason) {
    let cut = stop
        .iter()
        .filter(|marker| !marker.is_empty())
        .filter_map(|marker| text.find(marker.as_str()))
        .min();
    match cut {
        Some(idx) => (&text[..idx], ModelFinishReason::StopSequence),
        None => (text, ModelFinishReason::Stop),
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.next_response(req))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, ModelFinishReason) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await
                .unwrap()
                .unwrap();
            match event {
                ModelResponseEvent::Completed(reason) => return (msg, reason),
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
            }
        }
    }

    fn react_request(prompt: &str) -> ModelRequest {
        let mut req = ModelRequest::with_prompt(prompt);
        req.stop = vec!["\nObservation".to_owned(), "Observation".to_owned()];
        req
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_completion(
            PresetCompletion::with_text("Hello, world!").with_chunk_size(4),
        );
        provider.add_completion(PresetCompletion::with_text(
            "Final Answer: done",
        ));

        let resp = provider.send_request(&react_request("Hi")).await.unwrap();
        let (msg, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert_eq!(reason, ModelFinishReason::Stop);

        let resp = provider.send_request(&react_request("Hi")).await.unwrap();
        let (msg, _) = collect_response(resp).await;
        assert_eq!(msg, "Final Answer: done");

        assert!(provider.send_request(&react_request("Hi")).await.is_err());
        assert_eq!(provider.served(), 2);
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_truncates_fabricated_observation() {
        let provider = TestModelProvider::with_script([
            PresetCompletion::with_text(
                "I need the length.\nAction: get_text_length\nAction Input: DOG\nObservation: 42\nFinal Answer: 42",
            ),
        ]);

        let resp = provider.send_request(&react_request("Q")).await.unwrap();
        let (msg, reason) = collect_response(resp).await;
        assert_eq!(
            msg,
            "I need the length.\nAction: get_text_length\nAction Input: DOG"
        );
        assert_eq!(reason, ModelFinishReason::StopSequence);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let provider = TestModelProvider::with_script([
            PresetCompletion::with_text("Final Answer: ok").with_failures(2),
        ]);

        for _ in 0..2 {
            let err = provider
                .send_request(&react_request("Q"))
                .await
                .err()
                .unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&react_request("Q")).await.unwrap();
        let (msg, _) = collect_response(resp).await;
        assert_eq!(msg, "Final Answer: ok");
    }

    #[test]
    fn test_shared_between_clones() {
        let provider = TestModelProvider::with_script([
            PresetCompletion::with_text("a"),
            PresetCompletion::with_text("b"),
        ]);
        let clone = provider.clone();
        assert!(provider.next_response(&ModelRequest::default()).is_ok());
        assert_eq!(clone.served(), 1);
        assert_eq!(clone.requests().len(), 1);
    }
}
