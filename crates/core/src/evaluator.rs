use std::fmt::Write as _;

use careline_model::{ChatMessage, ChatRequest, SamplingOptions};

use crate::NO_RESPONSE_FALLBACK;
use crate::client::ChatClient;
use crate::persona::Persona;
use crate::report::EvaluationReport;
use crate::transcript::{Transcript, Turn};

/// The analysis role: reviews the accumulated conversation and produces
/// a clinical-style report on it.
///
/// The evaluator renders the transcript, or just its most recent turns
/// when a window is set, into a single user message under its own
/// persona; it never continues the conversation itself.
pub struct Evaluator {
    client: ChatClient,
    persona: Persona,
    window: Option<usize>,
    assistant_label: String,
    options: SamplingOptions,
}

impl Evaluator {
    /// Creates an evaluator reviewing as the given persona.
    #[inline]
    pub fn new(client: ChatClient, persona: Persona) -> Self {
        Self {
            client,
            persona,
            window: None,
            assistant_label: "Assistant".to_owned(),
            options: SamplingOptions::default(),
        }
    }

    /// Restricts the analysis to the last `turns` turns of the
    /// transcript. By default the whole transcript is reviewed.
    #[inline]
    pub fn with_window(mut self, turns: usize) -> Self {
        self.window = Some(turns);
        self
    }

    /// Sets the label used for the assistant's lines in the rendered
    /// conversation, typically the responder's display name.
    #[inline]
    pub fn with_assistant_label<S: Into<String>>(mut self, label: S) -> Self {
        self.assistant_label = label.into();
        self
    }

    /// Sets the sampling parameters forwarded with each request.
    #[inline]
    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the raw analysis text for the conversation so far.
    ///
    /// The failure contract is the same as the responder's: any provider
    /// error yields the fallback text instead of an error.
    pub async fn analyze_raw(&self, transcript: &Transcript) -> String {
        let request = self.build_request(transcript);
        match self.client.send(request, |_| {}).await {
            Ok(reply) => reply.text,
            Err(err) => {
                error!("evaluator request failed: {err}");
                NO_RESPONSE_FALLBACK.to_owned()
            }
        }
    }

    /// Runs the analysis and extracts the labeled sections from it.
    ///
    /// Text that doesn't follow the requested template degrades to
    /// reports with missing sections, it is never an error.
    pub async fn analyze(&self, transcript: &Transcript) -> EvaluationReport {
        EvaluationReport::parse(&self.analyze_raw(transcript).await)
    }

    fn build_request(&self, transcript: &Transcript) -> ChatRequest {
        let turns = match self.window {
            Some(n) => transcript.window(n),
            None => transcript.turns(),
        };
        ChatRequest {
            messages: vec![
                ChatMessage::System(self.persona.instructions().to_owned()),
                ChatMessage::User(self.render_turns(turns)),
            ],
            options: self.options,
        }
    }

    fn render_turns(&self, turns: &[Turn]) -> String {
        let mut rendered = String::new();
        for turn in turns {
            // The trailing newline keeps the block well-formed for the
            // model even on the last line.
            let _ = writeln!(rendered, "User: {}", turn.user);
            let _ = writeln!(rendered, "{}: {}", self.assistant_label, turn.assistant);
        }
        rendered
    }
}
