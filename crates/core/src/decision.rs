//! Turning raw model output into a decision.
//!
//! The model answers in a line-oriented grammar:
//!
//! ```text
//! <free-form reasoning>
//! Action: <tool name>
//! Action Input: <argument>
//! ```
//!
//! or
//!
//! ```text
//! <free-form reasoning>
//! Final Answer: <answer>
//! ```
//!
//! Markers are matched exactly: they must start a line, keep their case and
//! spelling, and have the colon right after the keyword. Anything else is
//! rejected with [`Error::UnparseableOutput`], there is no attempt to repair
//! the text.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Introduces the reasoning of a turn.
pub const THOUGHT_MARKER: &str = "Thought:";
/// Introduces the tool name.
pub const ACTION_MARKER: &str = "Action:";
/// Introduces the tool argument.
pub const ACTION_INPUT_MARKER: &str = "Action Input:";
/// Introduces a tool result. Only ever written by the agent.
pub const OBSERVATION_MARKER: &str = "Observation:";
/// Introduces the final answer.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

const MARKERS: [&str; 5] = [
    THOUGHT_MARKER,
    ACTION_MARKER,
    ACTION_INPUT_MARKER,
    OBSERVATION_MARKER,
    FINAL_ANSWER_MARKER,
];

/// The parsed intent of the model for one turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Run a tool and report back.
    Invoke(InvocationRequest),
    /// Stop with an answer.
    Finish(FinalAnswer),
}

/// A request to run a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Name of the tool.
    pub tool: String,
    /// The argument text, passed to the tool as is.
    pub argument: String,
    /// The reasoning that preceded the request.
    pub rationale: String,
}

/// The answer to the question.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinalAnswer {
    /// The answer text.
    pub answer: String,
}

/// Interprets the raw model output.
///
/// A final answer takes precedence: if a well-formed `Final Answer:` line
/// is present, the answer is returned even if action lines appear too. The
/// answer is whatever follows the last such marker, trimmed. Otherwise the
/// first `Action:` line immediately followed by an `Action Input:` line
/// forms the request.
pub fn interpret(raw: &str) -> Result<Decision, Error> {
    if let Some(answer) = final_answer(raw) {
        return Ok(Decision::Finish(FinalAnswer { answer }));
    }
    if let Some(request) = invocation(raw) {
        return Ok(Decision::Invoke(request));
    }
    debug!("unparseable model output: {raw:?}");
    Err(Error::UnparseableOutput {
        raw: raw.to_owned(),
    })
}

/// A line of the output, with its byte offset.
struct Line<'a> {
    offset: usize,
    text: &'a str,
}

impl<'a> Line<'a> {
    /// Returns the text after `marker` if the line starts with it.
    #[inline]
    fn after(&self, marker: &str) -> Option<&'a str> {
        self.text.strip_prefix(marker)
    }

    #[inline]
    fn is_marker_line(&self) -> bool {
        MARKERS.iter().any(|m| self.text.starts_with(m))
    }
}

fn lines(raw: &str) -> Vec<Line<'_>> {
    let mut offset = 0;
    raw.split_inclusive('\n')
        .map(|chunk| {
            let line = Line {
                offset,
                text: chunk.trim_end_matches(['\n', '\r']),
            };
            offset += chunk.len();
            line
        })
        .collect()
}

fn final_answer(raw: &str) -> Option<String> {
    let line = lines(raw)
        .into_iter()
        .rfind(|line| line.after(FINAL_ANSWER_MARKER).is_some())?;
    let answer = raw[line.offset + FINAL_ANSWER_MARKER.len()..].trim();
    if answer.is_empty() {
        return None;
    }
    Some(answer.to_owned())
}

fn invocation(raw: &str) -> Option<InvocationRequest> {
    let lines = lines(raw);
    lines.iter().enumerate().find_map(|(idx, line)| {
        let tool = line.after(ACTION_MARKER)?.trim();
        let first = lines.get(idx + 1)?.after(ACTION_INPUT_MARKER)?;
        if tool.is_empty() {
            return None;
        }

        // The argument may continue on the following lines, up to the next
        // marker.
        let mut argument = first.to_owned();
        for cont in lines[idx + 2..]
            .iter()
            .take_while(|line| !line.is_marker_line())
        {
            argument.push('\n');
            argument.push_str(cont.text);
        }

        Some(InvocationRequest {
            tool: tool.to_owned(),
            argument: argument.trim().to_owned(),
            rationale: raw[..line.offset].trim().to_owned(),
        })
    })
}
