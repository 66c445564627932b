//! Built-in simulated runtime.
//!
//! Stands in for a real model runtime so the front-end can run without one.
//! Loading walks through the model's weight shards and reports progress;
//! generation streams a deterministic reply one word at a time through a
//! channel, the same way a decode loop would hand out tokens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{future, stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::inference::catalog::{self, ModelMetadata};
use crate::inference::chunk::ChatCompletionChunk;
use crate::inference::engine::{
    ChatCompletionRequest, ChunkStream, Engine, EngineError, EngineLoader, ModelId,
    ProgressEvent, ProgressObserver, Role,
};

/// Loader for the simulated runtime.
pub struct SimulatedLoader {
    config: RuntimeConfig,
}

impl SimulatedLoader {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLoader for SimulatedLoader {
    async fn create_engine(
        &self,
        model_id: &ModelId,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<Arc<dyn Engine>, EngineError> {
        let metadata = catalog::lookup(model_id)
            .ok_or_else(|| EngineError::ModelNotFound(model_id.to_string()))?;

        let steps = self.config.load_steps.max(1);
        let shards = metadata.shard_count();

        info!(
            model = %model_id,
            family = %metadata.family,
            parameters = metadata.parameters,
            quantization = %metadata.quantization,
            download_bytes = metadata.download_bytes,
            shards,
            "Loading model"
        );

        for step in 0..=steps {
            let fraction = f64::from(step) / f64::from(steps);
            let shard = (fraction * shards as f64).round() as u64;
            progress.on_progress(
                &ProgressEvent::at(fraction)
                    .with_text(format!("Fetching param cache[{shard}/{shards}]")),
            );
            if step < steps && self.config.load_step_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.load_step_ms)).await;
            }
        }

        Ok(Arc::new(SimulatedEngine {
            model_id: model_id.clone(),
            metadata,
            token_delay: Duration::from_millis(self.config.token_delay_ms),
        }))
    }
}

/// Engine handle produced by [`SimulatedLoader`].
pub struct SimulatedEngine {
    model_id: ModelId,
    metadata: ModelMetadata,
    token_delay: Duration,
}

impl SimulatedEngine {
    /// Reply text for a prompt.
    fn reply(&self, prompt: &str) -> String {
        format!(
            "You said \"{prompt}\". This answer was streamed by the built-in {} runtime ({} context).",
            self.metadata.family, self.metadata.context_length
        )
    }
}

/// Wrap the generation channel so that a producer which stops before sending
/// its finish chunk surfaces as [`EngineError::Interrupted`] instead of a
/// silently short reply.
fn finish_checked(rx: mpsc::Receiver<Result<ChatCompletionChunk, EngineError>>) -> ChunkStream {
    let finished = Arc::new(AtomicBool::new(false));
    let seen = finished.clone();

    let chunks = ReceiverStream::new(rx).inspect(move |item| {
        if matches!(item, Ok(chunk) if chunk.is_finish()) {
            seen.store(true, Ordering::Relaxed);
        }
    });
    let tail = stream::once(async move {
        (!finished.load(Ordering::Relaxed)).then(|| {
            Err(EngineError::Interrupted(
                "generation stopped before finishing".to_string(),
            ))
        })
    })
    .filter_map(future::ready);

    Box::pin(chunks.chain(tail))
}

/// Split text into word tokens, keeping the trailing whitespace on each.
fn tokenize(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl Engine for SimulatedEngine {
    fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChunkStream, EngineError> {
        let prompt = request
            .last_user_message()
            .ok_or_else(|| EngineError::Generation("request has no user message".to_string()))?;

        let mut tokens = tokenize(&self.reply(prompt));
        let truncated = tokens.len() > request.max_tokens;
        tokens.truncate(request.max_tokens);

        let (tx, rx) = mpsc::channel(32);
        let request_id = request.request_id;
        let model = self.model_id.to_string();
        let token_delay = self.token_delay;
        let temperature = request.temperature;

        tokio::spawn(async move {
            info!(
                request_id,
                tokens = tokens.len(),
                temperature,
                "Starting generation"
            );

            let mut generated = 0;
            for (i, token) in tokens.into_iter().enumerate() {
                if !token_delay.is_zero() {
                    tokio::time::sleep(token_delay).await;
                }

                let mut chunk = ChatCompletionChunk::content(&request_id, &model, token);
                // First chunk includes the role.
                if i == 0 {
                    chunk = chunk.with_role(Role::Assistant);
                }

                if tx.send(Ok(chunk)).await.is_err() {
                    debug!(request_id, "Receiver dropped, stopping generation");
                    return;
                }
                generated += 1;
            }

            let reason = if truncated { "length" } else { "stop" };
            let _ = tx
                .send(Ok(ChatCompletionChunk::finish(&request_id, &model, reason)))
                .await;

            info!(request_id, generated, reason, "Generation complete");
        });

        Ok(finish_checked(rx))
    }
}
