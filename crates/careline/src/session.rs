use careline_core::persona::Persona;
use careline_core::transcript::{Transcript, Turn};
use careline_core::{ChatClient, EvaluationReport, Evaluator, Responder};
use careline_model::{ChatProvider, SamplingOptions};

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    client: ChatClient,
    responder_persona: Persona,
    evaluator_persona: Persona,
    analysis_window: Option<usize>,
    options: SamplingOptions,
}

impl SessionBuilder {
    /// Creates a session builder with a model provider and the two
    /// personas.
    ///
    /// Both roles share the provider; persona wording is configuration
    /// owned by the caller, the library ships no prompts of its own.
    pub fn new<P: ChatProvider + 'static>(
        provider: P,
        responder_persona: Persona,
        evaluator_persona: Persona,
    ) -> Self {
        Self {
            client: ChatClient::new(provider),
            responder_persona,
            evaluator_persona,
            analysis_window: None,
            options: SamplingOptions::default(),
        }
    }

    /// Restricts each analysis to the last `turns` turns of the
    /// conversation. By default the whole conversation is reviewed.
    #[inline]
    pub fn with_analysis_window(mut self, turns: usize) -> Self {
        self.analysis_window = Some(turns);
        self
    }

    /// Sets the sampling parameters used by both roles.
    #[inline]
    pub fn with_sampling_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let responder =
            Responder::new(self.client.clone(), self.responder_persona)
                .with_options(self.options);
        let mut evaluator =
            Evaluator::new(self.client, self.evaluator_persona)
                .with_assistant_label(responder.persona().name().to_owned())
                .with_options(self.options);
        if let Some(turns) = self.analysis_window {
            evaluator = evaluator.with_window(turns);
        }

        Session {
            responder,
            evaluator,
            transcript: Transcript::new(),
        }
    }
}

/// A two-role chat session, like a window that displays messages and has
/// an input box plus an "analyze" button.
///
/// The session owns the transcript. Exactly one turn is appended per
/// [`Session::send_message`] call, in submission order, including the
/// turns whose reply is the fallback text. Control flow is strictly
/// sequential: nothing runs in the background between calls.
pub struct Session {
    responder: Responder,
    evaluator: Evaluator,
    transcript: Transcript,
}

impl Session {
    /// Sends a user message and returns the assistant's reply.
    pub async fn send_message(&mut self, input: &str) -> String {
        self.send_message_with(input, |_| {}).await
    }

    /// Like [`Session::send_message`], invoking `on_delta` for each text
    /// increment as the provider produces it.
    pub async fn send_message_with(
        &mut self,
        input: &str,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> String {
        let reply = self
            .responder
            .reply_with(&self.transcript, input, on_delta)
            .await;
        self.transcript.push(Turn::new(input, reply.clone()));
        reply
    }

    /// Reviews the conversation so far and returns the extracted report.
    pub async fn analyze(&self) -> EvaluationReport {
        self.evaluator.analyze(&self.transcript).await
    }

    /// Reviews the conversation so far and returns the raw analysis
    /// text.
    pub async fn analyze_raw(&self) -> String {
        self.evaluator.analyze_raw(&self.transcript).await
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}
