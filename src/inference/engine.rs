//! Engine capability traits and request types.
//!
//! The runtime that actually loads and executes a model sits behind two traits:
//! 1. [`EngineLoader`] builds an engine for a model, reporting progress as it goes
//! 2. [`Engine`] answers chat-completion requests with a lazy stream of chunks
//!
//! The session layer only ever talks to these traits, so the built-in
//! simulated runtime and any scripted test runtime are interchangeable.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::inference::chunk::ChatCompletionChunk;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load model: {0}")]
    LoadFailed(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    /// The stream closed before the engine reported a finish reason.
    #[error("Stream interrupted: {0}")]
    Interrupted(String),
}

/// Identifier selecting which model to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A chat-completion request handed to an [`Engine`].
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Unique request ID, used for logging only.
    #[serde(skip)]
    pub request_id: String,

    pub messages: Vec<ChatMessage>,

    /// Request incremental output.
    pub stream: bool,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: usize,
}

impl ChatCompletionRequest {
    /// A streaming request carrying one user message.
    pub fn single_turn(prompt: &str, temperature: f64, max_tokens: usize) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: prompt.to_string(),
            }],
            stream: true,
            temperature,
            max_tokens,
        }
    }

    /// Content of the most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Progress notification emitted while an engine is being built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    /// Fraction complete in `[0, 1]`. `None` counts as zero.
    pub progress: Option<f64>,

    /// Free-form description of the current step.
    pub text: Option<String>,
}

impl ProgressEvent {
    pub fn at(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Rounded percentage in `0..=100`.
    pub fn percent(&self) -> u8 {
        let fraction = match self.progress {
            Some(p) if p.is_finite() => p.clamp(0.0, 1.0),
            _ => 0.0,
        };
        (fraction * 100.0).round() as u8
    }
}

/// Receives progress events during engine construction.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Lazy, finite, single-consumption stream of generated chunks.
pub type ChunkStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, EngineError>> + Send>>;

/// A loaded model runtime instance.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Model this engine was built for.
    fn model_id(&self) -> &ModelId;

    /// Start a generation request and return its chunk stream.
    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChunkStream, EngineError>;
}

/// Capability to construct engines.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn create_engine(
        &self,
        model_id: &ModelId,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<Arc<dyn Engine>, EngineError>;
}
