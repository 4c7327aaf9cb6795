use tiny_react_core::{
    Agent, AgentBuilder, AgentConfig, Error, Solution, TranscriptSource,
};
use tiny_react_model::ModelProvider;
use tokio::sync::watch;

use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self { agent_builder }
    }

    /// Sets the configuration of the agent loop.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.agent_builder = self.agent_builder.with_config(config);
        self
    }

    /// Attaches a callback to be invoked with every prompt, completion and
    /// observation.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session with the built-in tools.
    pub fn build(self) -> Result<Session, Error> {
        let agent = self
            .agent_builder
            .with_tool(TextLengthTool::new())
            .build()?;

        Ok(Session { agent })
    }
}

/// A question-answering session, backed by a fully configured agent.
///
/// It is basically a wrapper around [`Agent`]. Every question starts from
/// an empty history.
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Asks a question and waits for the final answer.
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<Solution, Error> {
        self.agent.solve(question).await
    }

    /// Like [`Session::ask`], but stops between turns once `cancel` holds
    /// `true`.
    #[inline]
    pub async fn ask_cancellable(
        &self,
        question: &str,
        cancel: &watch::Receiver<bool>,
    ) -> Result<Solution, Error> {
        self.agent.solve_cancellable(question, cancel).await
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}
