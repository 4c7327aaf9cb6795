use serde::Serialize;

use crate::scratchpad::HistoryEntry;

/// Where a session is in the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// Waiting for the model to decide the next step.
    #[default]
    AwaitingDecision,
    /// Running the tool the model asked for.
    Dispatching,
    /// A final answer was produced.
    Finished,
    /// The session ended with an error.
    Failed,
}

/// One attempt at answering a question.
///
/// The history only grows, one entry per completed tool invocation, and is
/// all the memory the session has.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    question: String,
    history: Vec<HistoryEntry>,
    state: SessionState,
}

impl Session {
    /// Creates a session with an empty history.
    #[inline]
    pub fn new<S: Into<String>>(question: S) -> Self {
        Self {
            question: question.into(),
            history: vec![],
            state: SessionState::default(),
        }
    }

    /// Returns the question being answered.
    #[inline]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Returns the completed tool invocations, oldest first.
    #[inline]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` if the session has finished or failed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Finished | SessionState::Failed)
    }

    /// Consumes the session, returning its history.
    #[inline]
    pub fn into_history(self) -> Vec<HistoryEntry> {
        self.history
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: SessionState) {
        trace!("session state: {:?} -> {state:?}", self.state);
        self.state = state;
    }

    #[inline]
    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}

/// The outcome of a successful session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Solution {
    /// The final answer.
    pub answer: String,
    /// The tool invocations that led to it.
    pub history: Vec<HistoryEntry>,
}
