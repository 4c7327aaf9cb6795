/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Truncation markers. The model must stop generating the moment it is
    /// about to produce any of them.
    pub stop: Vec<String>,
    /// Sampling temperature, `None` leaves it to the provider.
    pub temperature: Option<f32>,
}

impl ModelRequest {
    /// Creates a request with a single user message.
    #[inline]
    pub fn with_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            messages: vec![ModelMessage::User(prompt.into())],
            ..Default::default()
        }
    }

    /// Returns `true` if `marker` is one of the truncation markers.
    #[inline]
    pub fn halts_at(&self, marker: &str) -> bool {
        self.stop.iter().any(|m| m == marker)
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text content of the message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::System(text)
            | ModelMessage::User(text)
            | ModelMessage::Assistant(text) => text,
        }
    }
}
