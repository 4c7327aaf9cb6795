mod builder;
mod config;
mod session;

use tiny_react_model::ModelRequest;
use tokio::sync::watch;
use tracing::Instrument;

use crate::Error;
use crate::decision::{self, Decision, FinalAnswer, InvocationRequest};
use crate::model_client::ModelClient;
use crate::prompt::PromptAssembler;
use crate::scratchpad::{self, HistoryEntry};
use crate::tool::Registry;
pub use builder::AgentBuilder;
pub use config::{
    AgentConfig, MAX_STOP_MARKERS, OBSERVATION_STOP_MARKERS, ToolFailurePolicy,
};
pub use session::{Session, SessionState, Solution};

type TranscriptFn = Box<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// Where a transcript passed to the `on_transcript` callback comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// The prompt about to be sent to the model.
    Prompt,
    /// The raw text the model generated.
    Completion,
    /// The result of a tool invocation.
    Observation,
}

/// An agent that answers questions by alternating between asking the model
/// for the next step and running the tool it picks.
///
/// Each turn renders the history, assembles the prompt, asks the model to
/// continue it (halting before any `Observation` it might make up), and
/// interprets the text. A final answer ends the session. A tool request is
/// dispatched, and its real result is appended to the history for the next
/// turn. Turns never overlap.
pub struct Agent {
    model_client: ModelClient,
    registry: Registry,
    prompt: PromptAssembler,
    config: AgentConfig,
    stop_markers: Vec<String>,
    on_transcript: Option<TranscriptFn>,
}

impl Agent {
    /// Returns the configuration of this agent.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the tools available to the model.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Starts a new session for `question`.
    #[inline]
    pub fn start<S: Into<String>>(&self, question: S) -> Session {
        Session::new(question)
    }

    /// Answers `question` from scratch.
    ///
    /// The history is only returned with a solution. To inspect it after a
    /// failure, use [`Agent::start`] and [`Agent::run`] instead, which leave
    /// it in the session.
    pub async fn solve<S: Into<String>>(
        &self,
        question: S,
    ) -> Result<Solution, Error> {
        let mut session = self.start(question);
        let answer = self.run(&mut session).await?;
        Ok(Solution {
            answer,
            history: session.into_history(),
        })
    }

    /// Like [`Agent::solve`], but gives up with [`Error::Cancelled`] once
    /// `cancel` holds `true`.
    ///
    /// The flag is only checked between turns. A model request or tool
    /// invocation that is in flight runs to completion. As with
    /// [`Agent::solve`], the history is dropped on failure.
    pub async fn solve_cancellable<S: Into<String>>(
        &self,
        question: S,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Solution, Error> {
        let mut session = self.start(question);
        let answer = self.run_cancellable(&mut session, cancel).await?;
        Ok(Solution {
            answer,
            history: session.into_history(),
        })
    }

    /// Drives `session` until it produces a final answer or fails.
    ///
    /// The session is left in [`SessionState::Finished`] or
    /// [`SessionState::Failed`], and cannot be run again.
    pub async fn run(&self, session: &mut Session) -> Result<String, Error> {
        self.run_inner(session, None).await
    }

    /// Like [`Agent::run`], checking `cancel` at every turn boundary.
    pub async fn run_cancellable(
        &self,
        session: &mut Session,
        cancel: &watch::Receiver<bool>,
    ) -> Result<String, Error> {
        self.run_inner(session, Some(cancel)).await
    }

    async fn run_inner(
        &self,
        session: &mut Session,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<String, Error> {
        if session.is_closed() {
            return Err(Error::SessionClosed);
        }

        let span = info_span!("solve", question = %session.question());
        let result = self.drive(session, cancel).instrument(span).await;
        match &result {
            Ok(answer) => {
                info!("finished with answer: {answer:?}");
                session.set_state(SessionState::Finished);
            }
            Err(err) => {
                warn!("session failed: {err}");
                session.set_state(SessionState::Failed);
            }
        }
        result
    }

    async fn drive(
        &self,
        session: &mut Session,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<String, Error> {
        loop {
            let steps = session.history().len();
            if cancel.is_some_and(|rx| *rx.borrow()) {
                return Err(Error::Cancelled { steps });
            }
            if self.config.max_steps.is_some_and(|max| steps >= max) {
                return Err(Error::StepLimitExceeded { steps });
            }

            session.set_state(SessionState::AwaitingDecision);
            let request = match self.decide(session).await? {
                Decision::Finish(FinalAnswer { answer }) => return Ok(answer),
                Decision::Invoke(request) => request,
            };

            session.set_state(SessionState::Dispatching);
            let result = self.dispatch(&request).await?;
            self.emit(&result, TranscriptSource::Observation);
            session.push(HistoryEntry { request, result });
        }
    }

    /// Asks the model for the next step of `session`.
    async fn decide(&self, session: &Session) -> Result<Decision, Error> {
        let scratchpad = scratchpad::render(session.history());
        let prompt = self.prompt.assemble(session.question(), &scratchpad);
        self.emit(&prompt, TranscriptSource::Prompt);

        let mut req = ModelRequest::with_prompt(prompt);
        req.stop = self.stop_markers.clone();
        req.temperature = self.config.temperature;

        let completion = self
            .model_client
            .send_request(&req)
            .await
            .map_err(Error::Generation)?;
        debug!(
            "model finished ({:?}): {:?}",
            completion.finish_reason, completion.text
        );
        self.emit(&completion.text, TranscriptSource::Completion);

        decision::interpret(&completion.text)
    }

    /// Runs the requested tool, applying the tool failure policy.
    async fn dispatch(&self, request: &InvocationRequest) -> Result<String, Error> {
        let result = self
            .registry
            .invoke(&request.tool, &request.argument)
            .await;
        match (result, self.config.tool_failure_policy) {
            (
                Err(Error::CapabilityExecutionFailure { name, cause }),
                ToolFailurePolicy::Observe,
            ) => {
                debug!("reporting failure of tool ({name}) to the model");
                Ok(format!("the tool failed: {}", cause.reason()))
            }
            (result, _) => result,
        }
    }

    #[inline]
    fn emit(&self, transcript: &str, source: TranscriptSource) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(transcript, source);
        }
    }
}
