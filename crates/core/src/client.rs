use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use careline_model::{
    ChatEvent, ChatFinishReason, ChatProvider, ChatProviderError, ChatRequest,
    ChatResponse,
};
use tracing::Instrument;

type SendResult = Result<ClientReply, Box<dyn ChatProviderError>>;
type BoxedSendFuture = Pin<Box<dyn Future<Output = SendResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ChatRequest, Box<dyn Fn(&str) + Send + 'static>)
        -> BoxedSendFuture + Send + Sync
>;

/// A wrapper around a chat provider that drives responses to completion
/// and provides a type-erased interface for the rest of the crate.
#[derive(Clone)]
pub struct ChatClient {
    handler_fn: HandlerFn,
}

impl ChatClient {
    /// Wraps the given provider.
    #[inline]
    pub fn new<P: ChatProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ChatClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(trace_span!("chat client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request, invoking `on_delta` for every text increment, and
    /// returns the fully accumulated reply.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send(
        &self,
        req: ChatRequest,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> SendResult {
        (self.handler_fn)(req, Box::new(on_delta)).await
    }
}

/// A completely received reply from the chat client.
#[derive(Clone, Debug)]
pub struct ClientReply {
    /// The accumulated assistant text.
    pub text: String,
    /// The reason the model finished generating, if reported.
    pub finish_reason: Option<ChatFinishReason>,
}

async fn handle_response<P: ChatProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: Box<dyn Fn(&str) + Send + 'static>,
) -> SendResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut text = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ChatEvent::Delta(delta) => {
                on_delta(&delta);
                text.push_str(&delta);
            }
            ChatEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ClientReply {
        text,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use careline_model::ChatMessage;
    use careline_test_model::{PresetReply, ScriptedProvider};

    use super::*;

    #[tokio::test]
    async fn test_send() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(PresetReply::with_deltas(["How ", "are ", "you?"]));

        let client = ChatClient::new(provider);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let reply = client
            .send(
                ChatRequest {
                    messages: vec![ChatMessage::User("Hi".to_owned())],
                    options: Default::default(),
                },
                {
                    let seen = Arc::clone(&seen);
                    move |delta| {
                        seen.lock().unwrap().push(delta.to_owned());
                    }
                },
            )
            .await
            .unwrap();
        assert_eq!(reply.text, "How are you?");
        assert_eq!(reply.finish_reason, Some(ChatFinishReason::Stop));
        assert_eq!(*seen.lock().unwrap(), ["How ", "are ", "you?"]);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let provider = ScriptedProvider::default();
        let client = ChatClient::new(provider);
        let resp_or_err = client
            .send(
                ChatRequest {
                    messages: vec![ChatMessage::User("Hi".to_owned())],
                    options: Default::default(),
                },
                |_| {},
            )
            .await;
        assert!(resp_or_err.is_err());
    }
}
