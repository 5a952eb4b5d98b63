//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use careline_model::{
    ChatEvent, ChatProvider, ChatProviderError, ChatRequest, ChatResponse,
    ErrorKind,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ChatProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to set up the reply script, which is
/// how the model should respond to incoming requests. Replies are
/// consumed in request-arrival order: the `n`-th request gets the `n`-th
/// scripted reply, and once the script runs dry, further requests fail
/// with an error.
///
/// Every request is also recorded and can be inspected later through
/// [`ScriptedProvider::requests`], so tests can assert exactly what was
/// sent to the provider. The reply cursor and the request log are shared
/// between clones of the provider.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    replies: Vec<PresetReply>,
    delay: Option<Duration>,
    next_reply: Arc<AtomicUsize>,
    request_log: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    /// Appends a scripted reply to the script.
    #[inline]
    pub fn add_reply(&mut self, reply: PresetReply) {
        self.replies.push(reply);
    }

    /// Sets the delay inserted before each delivered event.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns a copy of every request this provider has received, in
    /// arrival order.
    ///
    /// The log is shared between clones of the provider.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.request_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ChatProvider for ScriptedProvider {
    type Error = Error;
    type Response = ScriptedResponse;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        self.request_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(req.clone());

        let reply_idx = self.next_reply.fetch_add(1, Ordering::Relaxed);
        let result = match self.replies.get(reply_idx) {
            Some(reply) => Ok(ScriptedResponse {
                reply: reply.clone(),
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                event_idx: 0,
                sleep: None,
            }),
            None => Err(Error {
                message: format!(
                    "reply script exhausted after {} requests",
                    self.replies.len()
                ),
                kind: ErrorKind::Other,
            }),
        };
        ready(result)
    }
}

/// The in-flight response produced by [`ScriptedProvider`].
pub struct ScriptedResponse {
    reply: PresetReply,
    delay: Duration,
    event_idx: usize,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl std::fmt::Debug for ScriptedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedResponse")
            .field("event_idx", &self.event_idx)
            .finish_non_exhaustive()
    }
}

impl ChatResponse for ScriptedResponse {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ChatEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(failure) = &this.reply.failure {
                if this.event_idx == failure.after_deltas {
                    return Poll::Ready(Err(Error {
                        message: "scripted failure".to_owned(),
                        kind: failure.kind,
                    }));
                }
            }

            let deltas = &this.reply.deltas;
            if this.event_idx < deltas.len() {
                let delta = deltas[this.event_idx].clone();
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(ChatEvent::Delta(delta))));
            } else if this.event_idx == deltas.len() {
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(ChatEvent::Completed(
                    this.reply.finish,
                ))));
            } else {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            }
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use careline_model::{ChatFinishReason, ChatMessage};

    use super::*;

    async fn collect_response(
        resp: ScriptedResponse,
    ) -> Result<(String, Option<ChatFinishReason>), Error> {
        let mut resp = pin!(resp);
        let mut text = String::new();
        let mut finish = None;
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?;
            match event {
                Some(ChatEvent::Delta(delta)) => text.push_str(&delta),
                Some(ChatEvent::Completed(reason)) => finish = Some(reason),
                None => break,
            }
        }
        Ok((text, finish))
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(PresetReply::with_deltas(["Hello, ", "world!"]));
        provider.add_reply(
            PresetReply::with_deltas(["That sounds hard."])
                .with_finish(ChatFinishReason::Length),
        );

        let mut req = ChatRequest {
            messages: vec![
                ChatMessage::System("Be supportive.".to_owned()),
                ChatMessage::User("Hi".to_owned()),
            ],
            options: Default::default(),
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (text, finish) = collect_response(resp).await.unwrap();
        assert_eq!(text, "Hello, world!");
        assert_eq!(finish, Some(ChatFinishReason::Stop));

        req.messages.push(ChatMessage::Assistant(text));
        req.messages
            .push(ChatMessage::User("I had a bad week".to_owned()));
        let resp = provider.send_request(&req).await.unwrap();
        let (text, finish) = collect_response(resp).await.unwrap();
        assert_eq!(text, "That sounds hard.");
        assert_eq!(finish, Some(ChatFinishReason::Length));

        let log = provider.requests();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].messages.len(), 4);
    }

    #[tokio::test]
    async fn test_script_exhausted() {
        let provider = ScriptedProvider::default();
        let req = ChatRequest {
            messages: vec![ChatMessage::User("Hi".to_owned())],
            options: Default::default(),
        };
        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(
            PresetReply::with_deltas(["partial "])
                .failing_after(1, ErrorKind::RateLimited),
        );

        let req = ChatRequest {
            messages: vec![ChatMessage::User("Hi".to_owned())],
            options: Default::default(),
        };
        let resp = provider.send_request(&req).await.unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }
}
