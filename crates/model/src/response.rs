use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ChatProviderError;

/// A response from the chat provider.
pub trait ChatResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ChatProviderError;

    /// Attempts to pull out the next event from the response.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct response state:
    ///
    /// - `Poll::Pending` means that this response is still waiting for
    ///   the next event. Implementations will ensure that the current
    ///   task will be notified when the next event may be ready.
    /// - `Poll::Ready(Ok(Some(event)))` means the response has an event
    ///   to deliver, and may produce further events on subsequent
    ///   `poll_next_event` calls.
    /// - `Poll::Ready(Ok(None))` means the response has completed.
    /// - `Poll::Ready(Err(error))` means an error occurred while
    ///   processing the response.
    ///
    /// Calling this method after completion should always return `None`.
    ///
    /// Dropping the response before completion cancels the underlying
    /// request; no further events are produced.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ChatEvent>, Self::Error>>;
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatFinishReason {
    /// The model has finished generating text.
    Stop,
    /// Generation hit the provider-side token cap.
    Length,
    /// The provider filtered the generated content.
    ContentFilter,
}

/// The event from a chat response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatEvent {
    /// Received a text increment.
    Delta(String),
    /// The response has been completed.
    Completed(ChatFinishReason),
}
