use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ChatRequest;
use crate::response::ChatResponse;

/// The error type for a chat provider.
pub trait ChatProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a chat-completion provider, which is an entry
/// for sending sampling requests to a hosted model.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
pub trait ChatProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ChatProviderError;

    /// The response type for this provider.
    type Response: ChatResponse<Error = Self::Error>;

    /// Sends a request to the model.
    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
