use std::error::Error as StdError;
use std::fmt::{self, Display};

use tiny_react_model::ModelProviderError;

use crate::tool;

/// The kind of error that ended a session (or a registration).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A tool with the same name is already registered.
    DuplicateCapability,
    /// The model asked for a tool that is not registered.
    UnknownCapability,
    /// The requested tool ran and failed.
    CapabilityExecutionFailure,
    /// The model output follows neither the action nor the final answer
    /// grammar.
    UnparseableOutput,
    /// The session used up its turns without a final answer.
    StepLimitExceeded,
    /// The model provider returned an error.
    Generation,
    /// The caller cancelled the session.
    Cancelled,
    /// The session has already finished or failed.
    SessionClosed,
}

/// The error type of the agent.
///
/// Every variant is terminal for the session it happens in. The payload
/// carries what is needed to diagnose it: the raw model output, the tool
/// name, or the number of turns taken.
#[derive(Debug)]
pub enum Error {
    /// A tool with the same name is already registered.
    DuplicateCapability {
        /// Name of the tool.
        name: String,
    },
    /// The model asked for a tool that is not registered.
    UnknownCapability {
        /// Name requested by the model.
        name: String,
    },
    /// The requested tool ran and failed.
    CapabilityExecutionFailure {
        /// Name of the tool.
        name: String,
        /// The failure raised by the tool.
        cause: tool::Error,
    },
    /// The model output follows neither grammar.
    UnparseableOutput {
        /// The model output, verbatim.
        raw: String,
    },
    /// The session used up its turns without a final answer.
    StepLimitExceeded {
        /// Number of tool invocations performed.
        steps: usize,
    },
    /// The model provider returned an error.
    Generation(Box<dyn ModelProviderError>),
    /// The caller cancelled the session at a turn boundary.
    Cancelled {
        /// Number of tool invocations performed before cancellation.
        steps: usize,
    },
    /// The session has already finished or failed.
    SessionClosed,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateCapability { .. } => ErrorKind::DuplicateCapability,
            Error::UnknownCapability { .. } => ErrorKind::UnknownCapability,
            Error::CapabilityExecutionFailure { .. } => {
                ErrorKind::CapabilityExecutionFailure
            }
            Error::UnparseableOutput { .. } => ErrorKind::UnparseableOutput,
            Error::StepLimitExceeded { .. } => ErrorKind::StepLimitExceeded,
            Error::Generation(_) => ErrorKind::Generation,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::SessionClosed => ErrorKind::SessionClosed,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateCapability { name } => {
                write!(f, "tool `{name}` is already registered")
            }
            Error::UnknownCapability { name } => {
                write!(f, "model requested unknown tool `{name}`")
            }
            Error::CapabilityExecutionFailure { name, cause } => {
                write!(f, "tool `{name}` failed: {cause}")
            }
            Error::UnparseableOutput { raw } => {
                write!(f, "could not parse model output: {raw:?}")
            }
            Error::StepLimitExceeded { steps } => {
                write!(f, "no final answer after {steps} steps")
            }
            Error::Generation(err) => {
                write!(f, "model request failed ({}): {err}", err.kind())
            }
            Error::Cancelled { steps } => {
                write!(f, "cancelled after {steps} steps")
            }
            Error::SessionClosed => write!(f, "session is already closed"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::CapabilityExecutionFailure { cause, .. } => Some(cause),
            Error::Generation(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
