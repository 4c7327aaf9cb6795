//! An abstraction layer for text-generation services.
//!
//! The agent only ever needs one thing from a model: take a prompt, produce
//! text, and stop the moment it is about to emit one of the requested
//! truncation markers. This crate pins that contract down so the reasoning
//! loop can run against any backend (a hosted API, a local model, or a
//! scripted fake in tests) without caring which.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
