//! Prometheus counters for the session lifecycle.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters covering engine initialization and prompt runs.
pub struct SessionMetrics {
    registry: Registry,

    /// Engine construction attempts, labeled `outcome` = `ready` | `failed`.
    pub engine_init: IntCounterVec,

    /// Generation requests issued to an engine.
    pub generation_requests: IntCounter,

    /// Chunks rendered from generation streams.
    pub stream_chunks: IntCounter,

    /// Generation requests that ended in an error.
    pub generation_failures: IntCounter,

    /// Prompts rejected before reaching the engine (empty or busy).
    pub prompts_rejected: IntCounter,
}

impl SessionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("prompt_session".to_string()), None)?;

        let engine_init = IntCounterVec::new(
            Opts::new("engine_init_total", "Engine construction attempts"),
            &["outcome"],
        )?;
        let generation_requests =
            IntCounter::new("generation_requests_total", "Generation requests issued")?;
        let stream_chunks = IntCounter::new("stream_chunks_total", "Stream chunks rendered")?;
        let generation_failures =
            IntCounter::new("generation_failures_total", "Generation requests that failed")?;
        let prompts_rejected =
            IntCounter::new("prompts_rejected_total", "Prompts rejected before generation")?;

        registry.register(Box::new(engine_init.clone()))?;
        registry.register(Box::new(generation_requests.clone()))?;
        registry.register(Box::new(stream_chunks.clone()))?;
        registry.register(Box::new(generation_failures.clone()))?;
        registry.register(Box::new(prompts_rejected.clone()))?;

        Ok(Self {
            registry,
            engine_init,
            generation_requests,
            stream_chunks,
            generation_failures,
            prompts_rejected,
        })
    }

    /// Number of construction attempts that ended with `outcome`.
    pub fn engine_inits(&self, outcome: &str) -> u64 {
        self.engine_init.with_label_values(&[outcome]).get()
    }

    /// Text exposition of all counters.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
