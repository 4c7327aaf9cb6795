//! Core logic of the reasoning-and-acting loop: tools, prompt assembly,
//! output interpretation and the agent itself.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod decision;
mod error;
mod model_client;
pub mod prompt;
pub mod scratchpad;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentConfig, MAX_STOP_MARKERS,
    OBSERVATION_STOP_MARKERS, Session, SessionState, Solution,
    ToolFailurePolicy, TranscriptSource,
};
pub use error::{Error, ErrorKind};
pub use model_client::RetryConfig;
