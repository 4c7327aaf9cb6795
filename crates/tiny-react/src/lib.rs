//! An out-of-the-box reasoning-and-acting agent with built-in tools.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the agent into your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod session;
pub mod tools;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`tiny_react_core`] crate.
pub mod core {
    pub use tiny_react_core::*;
}
