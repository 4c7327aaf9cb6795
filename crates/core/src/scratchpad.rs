//! The session history and its textual rendering.
//!
//! The history is the only memory a session has. It is rendered in full on
//! every turn and appended to the prompt, so that the model "remembers" what
//! it has done so far.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::decision::{
    ACTION_INPUT_MARKER, ACTION_MARKER, InvocationRequest, OBSERVATION_MARKER,
    THOUGHT_MARKER,
};

/// A completed tool invocation and its real result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The request made by the model.
    pub request: InvocationRequest,
    /// What the tool returned.
    pub result: String,
}

/// Renders the history in the same grammar the model writes, with each
/// result as an `Observation:` line, followed by an open `Thought:` for the
/// model to continue.
///
/// Returns an empty string for an empty history.
pub fn render(history: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for entry in history {
        render_entry(entry, &mut out);
    }
    out
}

fn render_entry(entry: &HistoryEntry, out: &mut String) {
    let req = &entry.request;
    if !req.rationale.is_empty() {
        out.push_str(&req.rationale);
        out.push('\n');
    }
    // Writing into a `String` can't fail.
    let _ = write!(
        out,
        "{ACTION_MARKER} {}\n{ACTION_INPUT_MARKER} {}\n{}\n{THOUGHT_MARKER} ",
        req.tool,
        req.argument,
        observation_line(&entry.result),
    );
}

/// Formats a tool result as an observation line.
#[inline]
pub fn observation_line(result: &str) -> String {
    format!("{OBSERVATION_MARKER} {result}")
}

/// Extracts the result from an observation line, verbatim.
#[inline]
pub fn parse_observation(line: &str) -> Option<&str> {
    line.strip_prefix(OBSERVATION_MARKER)?.strip_prefix(' ')
}

/// Extracts every result from a rendered history, verbatim.
///
/// A result runs from its `Observation: ` line to the `Thought: ` line that
/// [`render`] closes each entry with, so results may span several lines. A
/// result that itself contains a `\nThought: ` line ends early.
pub fn parse_observations(rendered: &str) -> Vec<&str> {
    let open = format!("\n{OBSERVATION_MARKER} ");
    let close = format!("\n{THOUGHT_MARKER} ");

    let mut results = vec![];
    let mut rest = rendered;
    while let Some(start) = rest.find(&open) {
        let body = &rest[start + open.len()..];
        let Some(end) = body.find(&close) else {
            break;
        };
        results.push(&body[..end]);
        rest = &body[end + close.len()..];
    }
    results
}
