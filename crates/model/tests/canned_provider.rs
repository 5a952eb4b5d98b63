use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use careline_model::{
    ChatEvent, ChatFinishReason, ChatMessage, ChatProvider, ChatProviderError,
    ChatRequest, ChatResponse, ErrorKind,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct CannedProviderError(ErrorKind);

impl Display for CannedProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for CannedProviderError {}

impl ChatProviderError for CannedProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct CannedResponse {
    deltas: VecDeque<String>,
    completed: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl CannedResponse {
    fn new(input: &str) -> Self {
        let deltas = format!("It sounds like {input}")
            .split_inclusive(' ')
            .map(ToString::to_string)
            .collect();
        Self {
            deltas,
            completed: false,
            sleep: None,
        }
    }
}

impl ChatResponse for CannedResponse {
    type Error = CannedProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ChatEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(delta) = this.deltas.pop_front() {
                return Poll::Ready(Ok(Some(ChatEvent::Delta(delta))));
            }
            if !this.completed {
                this.completed = true;
                return Poll::Ready(Ok(Some(ChatEvent::Completed(
                    ChatFinishReason::Stop,
                ))));
            }

            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct CannedProvider;

impl ChatProvider for CannedProvider {
    type Error = CannedProviderError;
    type Response = CannedResponse;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            let Some(msg) = req.messages.last() else {
                break 'blk Err(CannedProviderError(ErrorKind::Other));
            };

            let content = match msg {
                ChatMessage::User(text) => text.as_str(),
                _ => break 'blk Err(CannedProviderError(ErrorKind::Other)),
            };

            Ok(CannedResponse::new(content))
        };
        ready(result)
    }
}

#[tokio::test]
async fn test_completion() {
    let provider = CannedProvider;
    let req = ChatRequest {
        messages: vec![ChatMessage::User("you had a rough day".to_string())],
        options: Default::default(),
    };
    let mut resp = provider.send_request(&req).await.unwrap();

    let mut resp_message = String::new();
    let mut finish_reason = None;
    loop {
        let resp_fut = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx));
        match resp_fut.await {
            Ok(Some(event)) => match event {
                ChatEvent::Delta(delta) => {
                    resp_message.push_str(&delta);
                }
                ChatEvent::Completed(reason) => {
                    finish_reason = Some(reason);
                }
            },
            Ok(None) => break,
            Err(err) => unreachable!("unexpected error: {err:?}"),
        }
    }

    assert_eq!(resp_message, "It sounds like you had a rough day");
    assert_eq!(finish_reason, Some(ChatFinishReason::Stop));
}

#[tokio::test]
async fn test_error() {
    let provider = CannedProvider;
    let req = ChatRequest::default();
    let result = provider.send_request(&req).await;
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}
