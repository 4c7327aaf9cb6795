use std::borrow::Cow;

use tiny_react_model::ModelProvider;

use super::{Agent, AgentConfig, TranscriptFn, TranscriptSource};
use crate::Error;
use crate::model_client::ModelClient;
use crate::prompt::{DEFAULT_TEMPLATE, PromptAssembler};
use crate::tool::{Registry, Tool};
use crate::ToolFailurePolicy;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    registry: Registry,
    config: AgentConfig,
    template: Cow<'static, str>,
    on_transcript: Option<TranscriptFn>,
    error: Option<Error>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            registry: Registry::default(),
            config: AgentConfig::default(),
            template: Cow::Borrowed(DEFAULT_TEMPLATE),
            on_transcript: None,
            error: None,
        }
    }

    /// Registers a tool.
    ///
    /// Registering two tools with the same name makes [`Self::build`] fail
    /// with [`Error::DuplicateCapability`].
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        if let Err(err) = self.registry.register(tool) {
            self.error.get_or_insert(err);
        }
        self
    }

    /// Replaces the whole configuration.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the maximum number of tool invocations, `None` for no limit.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    /// Sets what to do when a tool fails.
    #[inline]
    pub fn with_tool_failure_policy(mut self, policy: ToolFailurePolicy) -> Self {
        self.config.tool_failure_policy = policy;
        self
    }

    /// Replaces the prompt template. See [`DEFAULT_TEMPLATE`] for the
    /// placeholders.
    #[inline]
    pub fn with_prompt_template<S: Into<Cow<'static, str>>>(
        mut self,
        template: S,
    ) -> Self {
        self.template = template.into();
        self
    }

    /// Attaches a callback to be invoked with every prompt, completion and
    /// observation.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<Agent, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let prompt = PromptAssembler::with_template(self.template, &self.registry);
        Ok(Agent {
            model_client: self.model_client.with_retry(self.config.retry.clone()),
            registry: self.registry,
            prompt,
            stop_markers: self.config.stop_markers(),
            config: self.config,
            on_transcript: self.on_transcript,
        })
    }
}
