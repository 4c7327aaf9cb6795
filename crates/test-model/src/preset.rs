use serde::{Deserialize, Serialize};

/// A scripted completion for one generation call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetCompletion {
    /// The full text the model "would" generate if nothing stopped it.
    pub text: String,
    /// If set, the text is delivered in pieces of at most this many
    /// characters. Otherwise it is delivered word by word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
}

impl PresetCompletion {
    /// Creates a `PresetCompletion` with the specified text.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Delivers the text in pieces of at most `size` characters.
    #[inline]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Splits `text` into the deltas this preset streams.
    pub(crate) fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self.chunk_size {
            Some(size) => {
                let mut pieces = vec![];
                let mut start = 0;
                for (count, (idx, _)) in text.char_indices().enumerate() {
                    if count > 0 && count % size == 0 {
                        pieces.push(&text[start..idx]);
                        start = idx;
                    }
                }
                if start < text.len() {
                    pieces.push(&text[start..]);
                }
                pieces
            }
            None => text.split_inclusive(' ').collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let script = vec![
            PresetCompletion::with_text(
                "I should measure it.\nAction: get_text_length\nAction Input: DOG",
            ),
            PresetCompletion::with_text("Final Answer: 3").with_failures(2),
        ];

        let serialized = serde_json::to_string(&script).unwrap();
        let deserialized: Vec<PresetCompletion> =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(script, deserialized);
    }

    #[test]
    fn test_minimal_json() {
        let preset: PresetCompletion =
            serde_json::from_str(r#"{ "text": "Final Answer: ok" }"#).unwrap();
        assert_eq!(preset, PresetCompletion::with_text("Final Answer: ok"));
    }

    #[test]
    fn test_split() {
        let preset = PresetCompletion::with_text("").with_chunk_size(3);
        assert_eq!(preset.split("abcdefgh"), vec!["abc", "def", "gh"]);
        assert_eq!(preset.split("añoñ"), vec!["año", "ñ"]);

        let preset = PresetCompletion::default();
        assert_eq!(preset.split("a bc d"), vec!["a ", "bc ", "d"]);
        assert!(preset.split("").is_empty());
    }
}
