use careline_model::{ChatMessage, ChatRequest, SamplingOptions};

use crate::NO_RESPONSE_FALLBACK;
use crate::client::ChatClient;
use crate::persona::Persona;
use crate::transcript::Transcript;

/// The conversational role: produces the next assistant utterance for a
/// user input, given the prior turns.
///
/// The responder holds no conversation state of its own. The transcript
/// is owned by the caller and passed in per call, and the caller decides
/// when to append the produced turn.
pub struct Responder {
    client: ChatClient,
    persona: Persona,
    options: SamplingOptions,
}

impl Responder {
    /// Creates a responder speaking as the given persona.
    #[inline]
    pub fn new(client: ChatClient, persona: Persona) -> Self {
        Self {
            client,
            persona,
            options: SamplingOptions::default(),
        }
    }

    /// Sets the sampling parameters forwarded with each request.
    #[inline]
    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the persona this responder speaks as.
    #[inline]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Produces the next reply for `input`.
    ///
    /// Provider failures are not surfaced: any error, including a
    /// malformed response, yields the fallback text instead.
    pub async fn reply(&self, transcript: &Transcript, input: &str) -> String {
        self.reply_with(transcript, input, |_| {}).await
    }

    /// Like [`Responder::reply`], invoking `on_delta` for each text
    /// increment as the provider produces it.
    ///
    /// When the request fails after some increments were already
    /// delivered, the partial text is discarded and the fallback text is
    /// returned, so both delivery modes expose one failure contract.
    pub async fn reply_with(
        &self,
        transcript: &Transcript,
        input: &str,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> String {
        let request = self.build_request(transcript, input);
        match self.client.send(request, on_delta).await {
            Ok(reply) => reply.text,
            Err(err) => {
                error!("responder request failed: {err}");
                NO_RESPONSE_FALLBACK.to_owned()
            }
        }
    }

    fn build_request(&self, transcript: &Transcript, input: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(transcript.len() * 2 + 2);
        messages.push(ChatMessage::System(
            self.persona.instructions().to_owned(),
        ));
        messages.extend(transcript.to_messages());
        messages.push(ChatMessage::User(input.to_owned()));
        ChatRequest {
            messages,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use careline_model::ErrorKind;
    use careline_test_model::{PresetReply, ScriptedProvider};

    use super::*;
    use crate::transcript::Turn;

    fn persona() -> Persona {
        Persona::new("Averie", "You are a supportive listener.")
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(PresetReply::with_deltas(["Take care."]));

        let mut transcript = Transcript::new();
        transcript.push(Turn::new("hi", "hello"));
        transcript.push(Turn::new("rough week", "tell me more"));

        let responder =
            Responder::new(ChatClient::new(provider.clone()), persona());
        let reply = responder.reply(&transcript, "thanks").await;
        assert_eq!(reply, "Take care.");

        // The persona goes first, then every prior turn in order, then the
        // new input.
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].messages,
            vec![
                ChatMessage::System("You are a supportive listener.".to_owned()),
                ChatMessage::User("hi".to_owned()),
                ChatMessage::Assistant("hello".to_owned()),
                ChatMessage::User("rough week".to_owned()),
                ChatMessage::Assistant("tell me more".to_owned()),
                ChatMessage::User("thanks".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn test_sampling_options_forwarded() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(PresetReply::with_deltas(["ok"]));

        let options = SamplingOptions {
            temperature: Some(0.01),
            max_tokens: Some(256),
        };
        let responder = Responder::new(ChatClient::new(provider.clone()), persona())
            .with_options(options);
        responder.reply(&Transcript::new(), "hi").await;

        assert_eq!(provider.requests()[0].options, options);
    }

    #[tokio::test]
    async fn test_fallback_on_error() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(PresetReply::failing(ErrorKind::RateLimited));

        let responder = Responder::new(ChatClient::new(provider), persona());
        let reply = responder.reply(&Transcript::new(), "hi").await;
        assert_eq!(reply, NO_RESPONSE_FALLBACK);
    }

    #[tokio::test]
    async fn test_fallback_discards_partial_stream() {
        let mut provider = ScriptedProvider::default();
        provider.add_reply(
            PresetReply::with_deltas(["partial ", "text"])
                .failing_after(1, ErrorKind::Other),
        );

        let responder = Responder::new(ChatClient::new(provider), persona());
        let reply = responder
            .reply_with(&Transcript::new(), "hi", |_| {})
            .await;
        assert_eq!(reply, NO_RESPONSE_FALLBACK);
    }
}
