use careline_model::{ChatFinishReason, ErrorKind};
use serde::{Deserialize, Serialize};

/// The scripted reply for one user turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetReply {
    /// Text increments delivered in order.
    pub deltas: Vec<String>,
    /// The finish reason reported after the last delta.
    pub finish: ChatFinishReason,
    /// If set, the response fails instead of running to completion.
    pub failure: Option<PresetFailure>,
}

/// A scripted mid-response failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetFailure {
    /// The error kind the response fails with.
    pub kind: ErrorKind,
    /// How many deltas are delivered before the failure. `0` means the
    /// response fails on the first poll.
    pub after_deltas: usize,
}

impl PresetReply {
    /// Creates a reply that delivers the given deltas and then stops.
    #[inline]
    pub fn with_deltas<S: Into<String>>(
        deltas: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            finish: ChatFinishReason::Stop,
            failure: None,
        }
    }

    /// Sets the finish reason reported after the last delta.
    #[inline]
    pub fn with_finish(mut self, finish: ChatFinishReason) -> Self {
        self.finish = finish;
        self
    }

    /// Creates a reply that fails immediately with the given error kind.
    #[inline]
    pub fn failing(kind: ErrorKind) -> Self {
        Self {
            deltas: vec![],
            finish: ChatFinishReason::Stop,
            failure: Some(PresetFailure {
                kind,
                after_deltas: 0,
            }),
        }
    }

    /// Makes the reply fail with `kind` after `after_deltas` deltas have
    /// been delivered.
    #[inline]
    pub fn failing_after(mut self, after_deltas: usize, kind: ErrorKind) -> Self {
        self.failure = Some(PresetFailure { kind, after_deltas });
        self
    }
}
