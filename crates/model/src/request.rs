/// A request to be sent to the chat provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatRequest {
    /// The input messages, in the order the model should see them.
    pub messages: Vec<ChatMessage>,
    /// Sampling parameters forwarded to the provider.
    pub options: SamplingOptions,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

/// Sampling parameters for a single request.
///
/// All fields are optional, and providers ignore the ones they don't
/// support.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SamplingOptions {
    /// The sampling temperature.
    pub temperature: Option<f32>,
    /// Hard cap on the number of tokens to generate.
    pub max_tokens: Option<u32>,
}
