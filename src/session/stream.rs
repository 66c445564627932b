//! Prompt runs: issue a streaming request and render chunks as they arrive.
//!
//! One run owns one chunk stream. Chunks are appended to the output strictly
//! in arrival order. A failure stops the run where it is; whatever was
//! already rendered stays on the surface and the error is appended after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::inference::engine::{ChatCompletionRequest, Engine, EngineError};
use crate::metrics::SessionMetrics;
use crate::ui::Surface;

/// Sampling temperature for every request.
pub const TEMPERATURE: f64 = 0.7;

/// Output length limit for every request, in tokens.
pub const MAX_TOKENS: usize = 256;

pub const EMPTY_PROMPT_MESSAGE: &str = "Type a prompt first";
pub const THINKING_MESSAGE: &str = "Thinking...";
pub const RUN_FAILED_STATUS: &str = "Run failed. See logs for details.";
pub const BUSY_STATUS: &str = "A request is already running.";

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("a request is already running")]
    Busy,

    #[error("generation failed: {0}")]
    GenerationFailed(#[source] EngineError),
}

/// What a completed run rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub request_id: String,
    /// Chunks received, including ones without content.
    pub chunks: usize,
    /// Characters appended, not counting the trailing newline.
    pub chars: usize,
}

/// Releases the busy flag when a run ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives prompt runs against a ready engine, one at a time.
pub struct PromptRunner {
    surface: Arc<dyn Surface>,
    metrics: Arc<SessionMetrics>,
    busy: AtomicBool,
}

impl PromptRunner {
    pub fn new(surface: Arc<dyn Surface>, metrics: Arc<SessionMetrics>) -> Self {
        Self {
            surface,
            metrics,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a run is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one prompt to completion or failure, rendering as it streams.
    pub async fn run_prompt(&self, engine: &dyn Engine, text: &str) -> Result<RunSummary, PromptError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            warn!("Prompt rejected, a request is already running");
            self.metrics.prompts_rejected.inc();
            self.surface.set_status(BUSY_STATUS);
            return Err(PromptError::Busy);
        };

        let prompt = text.trim();
        if prompt.is_empty() {
            self.metrics.prompts_rejected.inc();
            self.surface.set_output(EMPTY_PROMPT_MESSAGE);
            return Err(PromptError::EmptyPrompt);
        }

        self.surface.set_output(THINKING_MESSAGE);

        let request = ChatCompletionRequest::single_turn(prompt, TEMPERATURE, MAX_TOKENS);
        let request_id = request.request_id.clone();
        info!(
            request_id,
            model = %engine.model_id(),
            prompt_chars = prompt.chars().count(),
            "Prompt run"
        );

        let mut summary = RunSummary {
            request_id,
            chunks: 0,
            chars: 0,
        };

        match self.consume(engine, request, &mut summary).await {
            Ok(()) => {
                info!(
                    request_id = summary.request_id,
                    chunks = summary.chunks,
                    chars = summary.chars,
                    "Prompt run complete"
                );
                Ok(summary)
            }
            Err(e) => {
                self.report_failure(&summary, &e);
                Err(PromptError::GenerationFailed(e))
            }
        }
    }

    async fn consume(
        &self,
        engine: &dyn Engine,
        request: ChatCompletionRequest,
        summary: &mut RunSummary,
    ) -> Result<(), EngineError> {
        self.metrics.generation_requests.inc();
        let mut stream = engine.create_chat_completion(request).await?;
        self.surface.set_output("");

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let text = chunk.text();
            self.surface.append_output(text);

            summary.chunks += 1;
            summary.chars += text.chars().count();
            self.metrics.stream_chunks.inc();
        }

        debug!(request_id = summary.request_id, "Stream exhausted");
        self.surface.append_output("\n");
        Ok(())
    }

    fn report_failure(&self, summary: &RunSummary, e: &EngineError) {
        error!(
            request_id = summary.request_id,
            chunks = summary.chunks,
            error = %e,
            "Prompt run failed"
        );
        self.metrics.generation_failures.inc();

        if summary.chars == 0 {
            self.surface.set_output(&format!("ERROR: {e}"));
        } else {
            self.surface.append_output(&format!("\nERROR: {e}"));
        }
        self.surface.set_status(RUN_FAILED_STATUS);
    }
}
