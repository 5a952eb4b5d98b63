//! Core logic for the two-role conversation: the append-only transcript,
//! the responder that answers the user, and the evaluator that reviews
//! the conversation.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod evaluator;
mod report;
mod responder;

pub mod persona;
pub mod transcript;

pub use client::{ChatClient, ClientReply};
pub use evaluator::Evaluator;
pub use report::{EvaluationReport, MISSING_SECTION};
pub use responder::Responder;

/// The literal text returned in place of an assistant reply or an
/// analysis when the provider call fails.
pub const NO_RESPONSE_FALLBACK: &str =
    "No valid response received from the API.";
