//! Persona configuration.
//!
//! Prompt wording varies between deployments and none of it is canonical,
//! so personas are plain data supplied by the embedder rather than
//! constants baked into this crate.

use serde::{Deserialize, Serialize};

/// A persona: a display name plus the system instructions that establish
/// the role for a model call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Persona {
    name: String,
    instructions: String,
}

impl Persona {
    /// Creates a persona from a display name and system instructions.
    #[inline]
    pub fn new<N: Into<String>, I: Into<String>>(
        name: N,
        instructions: I,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
        }
    }

    /// Returns the display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the system instructions.
    #[inline]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}
