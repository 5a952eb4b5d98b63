//! An out-of-the-box two-role chat session: a supportive responder plus
//! an on-demand conversation evaluator, both backed by the same model
//! provider.
//!
//! The crate includes a small CLI for using in the terminal. And you can
//! also use it as a library to bring the session into your own host
//! apps.

#![deny(missing_docs)]

mod session;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`careline_core`] crate.
pub mod core {
    pub use careline_core::*;
}
