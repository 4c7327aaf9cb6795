use crate::model_client::RetryConfig;

/// Truncation markers that are always active. They stop the model right
/// before it could write an observation of its own.
pub const OBSERVATION_STOP_MARKERS: [&str; 2] = ["\nObservation", "Observation"];

/// The most truncation markers a request may carry. OpenAI-compatible
/// services reject requests with more `stop` sequences.
pub const MAX_STOP_MARKERS: usize = 4;

/// What to do when a tool fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolFailurePolicy {
    /// End the session with [`Error::CapabilityExecutionFailure`].
    ///
    /// [`Error::CapabilityExecutionFailure`]: crate::Error::CapabilityExecutionFailure
    #[default]
    Abort,
    /// Record `the tool failed: <cause>` as the observation and let the
    /// model deal with it.
    Observe,
}

/// Configuration of the agent loop.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    /// Maximum number of tool invocations per session, `None` for no limit.
    pub max_steps: Option<usize>,
    /// Sampling temperature sent with every request.
    pub temperature: Option<f32>,
    /// Truncation markers in addition to [`OBSERVATION_STOP_MARKERS`].
    ///
    /// Only the first few distinct ones are used, so that a request never
    /// carries more than [`MAX_STOP_MARKERS`] markers in total.
    pub extra_stop_markers: Vec<String>,
    /// What to do when a tool fails.
    pub tool_failure_policy: ToolFailurePolicy,
    /// Retry policy for rate-limited model requests, `None` to disable.
    pub retry: Option<RetryConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(15),
            temperature: Some(0.0),
            extra_stop_markers: vec![],
            tool_failure_policy: ToolFailurePolicy::default(),
            retry: Some(RetryConfig::default()),
        }
    }
}

impl AgentConfig {
    /// Returns the truncation markers sent with every request. The
    /// observation markers always come first, and extra markers beyond
    /// [`MAX_STOP_MARKERS`] are dropped.
    pub fn stop_markers(&self) -> Vec<String> {
        let mut markers: Vec<String> = OBSERVATION_STOP_MARKERS
            .iter()
            .map(|m| (*m).to_owned())
            .collect();
        for marker in &self.extra_stop_markers {
            if marker.is_empty() || markers.contains(marker) {
                continue;
            }
            if markers.len() >= MAX_STOP_MARKERS {
                warn!("too many stop markers, ignoring: {marker:?}");
                continue;
            }
            markers.push(marker.clone());
        }
        markers
    }
}
