//! Inference session.
//!
//! - [`manager`]: Engine lifecycle, single-flight initialization and reuse
//! - [`stream`]: Prompt runs that render a chunk stream as it arrives

pub mod manager;
pub mod stream;

pub use manager::{Readiness, SessionError, SessionManager, SessionStatus};
pub use stream::{PromptError, PromptRunner, RunSummary};
