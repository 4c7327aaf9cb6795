use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tiny_react_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type SendRequestResult = Result<Completion, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// How transient provider errors (rate limiting) are retried.
///
/// Intervals grow exponentially from `initial_interval` up to
/// `max_interval`. Retrying gives up once `max_elapsed_time` has passed
/// since the first attempt, or never if it is `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of a single delay.
    pub max_interval: Duration,
    /// Total time budget for retrying.
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(60)),
        }
    }
}

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry: Option<RetryConfig>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry: None,
        }
    }

    #[inline]
    pub fn with_retry(mut self, retry: Option<RetryConfig>) -> Self {
        self.retry = retry;
        self
    }

    /// Sends a request and collects the whole completion.
    ///
    /// Rate-limited requests are retried with exponential backoff if a
    /// [`RetryConfig`] is set. Other errors are returned right away.
    pub async fn send_request(&self, req: &ModelRequest) -> SendRequestResult {
        let Some(retry) = &self.retry else {
            return (self.handler_fn)(req.clone()).await;
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(retry.initial_interval)
            .with_max_interval(retry.max_interval)
            .with_max_elapsed_time(retry.max_elapsed_time)
            .build();
        backoff::future::retry(policy, || {
            let fut = (self.handler_fn)(req.clone());
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() {
                        warn!("model request failed, will retry: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The generated text.
    pub text: String,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut text = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                text.push_str(&delta);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(Completion {
        text,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use tiny_react_model::ErrorKind;
    use tiny_react_test_model::{PresetCompletion, TestModelProvider};

    use super::*;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            max_elapsed_time: Some(Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::with_script([
            PresetCompletion::with_text("How are you?").with_chunk_size(2),
        ]);
        let model_client = ModelClient::new(provider.clone());

        let mut req = ModelRequest::with_prompt("Hi");
        req.stop = vec!["you".to_owned()];
        let resp = model_client.send_request(&req).await.unwrap();
        assert_eq!(resp.text, "How are ");
        assert_eq!(resp.finish_reason, Some(ModelFinishReason::StopSequence));
        assert_eq!(provider.requests(), vec![req]);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(&ModelRequest::with_prompt("Hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_retry_rate_limited() {
        let provider = TestModelProvider::with_script([
            PresetCompletion::with_text("Final Answer: ok").with_failures(2),
        ]);
        let model_client =
            ModelClient::new(provider.clone()).with_retry(Some(fast_retry()));

        let resp = model_client
            .send_request(&ModelRequest::with_prompt("Hi"))
            .await
            .unwrap();
        assert_eq!(resp.text, "Final Answer: ok");
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_no_retry_without_config() {
        let provider = TestModelProvider::with_script([
            PresetCompletion::with_text("Final Answer: ok").with_failures(1),
        ]);
        let model_client = ModelClient::new(provider.clone());

        let err = model_client
            .send_request(&ModelRequest::with_prompt("Hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        // Script exhausted, which is not a transient error.
        let provider = TestModelProvider::default();
        let model_client =
            ModelClient::new(provider.clone()).with_retry(Some(fast_retry()));

        let err = model_client
            .send_request(&ModelRequest::with_prompt("Hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.requests().len(), 1);
    }
}
