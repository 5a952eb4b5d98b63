use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use careline_model::{ChatEvent, ChatFinishReason, ChatResponse, ErrorKind};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletion, ChatCompletionChunk, parse_finish_reason};

struct StreamState {
    sse: Sse,
    id: Option<String>,
    pending_finish: Option<ChatFinishReason>,
    done: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ChatEvent>, StreamState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        inner: Inner,
    }
}

impl std::fmt::Debug for OpenAIResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIResponse").finish_non_exhaustive()
    }
}

enum Inner {
    // Incremental delivery over server-sent events.
    Streaming {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    },
    // The whole body arrived at once; replay it as events.
    Buffered {
        events: VecDeque<ChatEvent>,
    },
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let state = StreamState {
            sse,
            id: None,
            pending_finish: None,
            done: false,
        };
        let next_event_fut = async move { next_event(state).await };
        Self {
            inner: Inner::Streaming {
                next_event_fut: Some(Box::pin(next_event_fut)),
            },
        }
    }

    pub fn from_completion(body: ChatCompletion) -> Result<Self, Error> {
        let Some(choice) = body.choices.into_iter().next() else {
            return Err(Error::new(
                "response contains no choices",
                ErrorKind::Other,
            ));
        };

        let mut events = VecDeque::new();
        if let Some(content) = choice.message.content {
            if !content.is_empty() {
                events.push_back(ChatEvent::Delta(content));
            }
        }
        let finish = choice
            .finish_reason
            .as_deref()
            .map(parse_finish_reason)
            .unwrap_or(ChatFinishReason::Stop);
        events.push_back(ChatEvent::Completed(finish));

        Ok(Self {
            inner: Inner::Buffered { events },
        })
    }
}

impl ChatResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ChatEvent>, Self::Error>> {
        let this = self.project();
        match this.inner {
            Inner::Buffered { events } => Poll::Ready(Ok(events.pop_front())),
            Inner::Streaming { next_event_fut } => {
                let Some(fut) = next_event_fut else {
                    // The stream has been exhausted.
                    return Poll::Ready(Ok(None));
                };
                let (event, state) = match ready!(fut.as_mut().poll(cx)) {
                    Ok((Some(event), state)) => (event, state),
                    Ok((None, _)) => {
                        *next_event_fut = None;
                        return Poll::Ready(Ok(None));
                    }
                    Err(err) => {
                        *next_event_fut = None;
                        return Poll::Ready(Err(err));
                    }
                };

                // The stream may still have more data to pull, create a new
                // future for the next event.
                let fut = async move { next_event(state).await };
                *next_event_fut = Some(Box::pin(fut));

                Poll::Ready(Ok(Some(event)))
            }
        }
    }
}

async fn next_event(mut state: StreamState) -> NextEvent {
    if state.done {
        return Ok((None, state));
    }

    loop {
        let sse_event = match state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            state.done = true;
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(finish_reason) = &choice.finish_reason {
            state.pending_finish = Some(parse_finish_reason(finish_reason));
        }

        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                return Ok((Some(ChatEvent::Delta(content)), state));
            }
        }
    }

    // The stream is drained, report the finish reason if the server sent
    // one before terminating.
    if let Some(finish) = state.pending_finish.take() {
        state.done = true;
        return Ok((Some(ChatEvent::Completed(finish)), state));
    }

    Ok((None, state))
}
