//! Catalog of models the built-in runtime can load.
//!
//! Metadata is used to size the simulated download and to report what was
//! loaded. Lookups are exact on the model identifier.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inference::engine::ModelId;

/// Metadata for a loadable model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model identifier as typed by the user.
    pub id: String,

    /// Architecture family (e.g., "llama", "qwen2").
    pub family: String,

    /// Approximate parameter count.
    pub parameters: u64,

    /// Size of the weight shards to fetch on first load.
    pub download_bytes: u64,

    /// Context length the model was trained with.
    pub context_length: usize,

    /// Quantization type string.
    pub quantization: String,
}

impl ModelMetadata {
    /// Number of weight shards fetched during load, at 64 MB per shard.
    pub fn shard_count(&self) -> u64 {
        const SHARD_BYTES: u64 = 64 * 1024 * 1024;
        self.download_bytes.div_ceil(SHARD_BYTES).max(1)
    }
}

fn entry(
    id: &str,
    family: &str,
    parameters: u64,
    download_mb: u64,
    context_length: usize,
    quantization: &str,
) -> ModelMetadata {
    ModelMetadata {
        id: id.to_string(),
        family: family.to_string(),
        parameters,
        download_bytes: download_mb * 1024 * 1024,
        context_length,
        quantization: quantization.to_string(),
    }
}

/// All models the built-in runtime knows about.
pub fn known_models() -> Vec<ModelMetadata> {
    vec![
        entry(
            "Llama-3.2-1B-Instruct-q4f16_1",
            "llama",
            1_240_000_000,
            880,
            4096,
            "q4f16_1",
        ),
        entry(
            "Qwen2.5-0.5B-Instruct-q4f16_1",
            "qwen2",
            494_000_000,
            420,
            4096,
            "q4f16_1",
        ),
        entry(
            "Phi-3.5-mini-instruct-q4f16_1",
            "phi3",
            3_820_000_000,
            2150,
            4096,
            "q4f16_1",
        ),
        entry("demo-model", "demo", 1_000_000, 4, 512, "f32"),
    ]
}

/// Look up a model by identifier.
pub fn lookup(model_id: &ModelId) -> Option<ModelMetadata> {
    let found = known_models()
        .into_iter()
        .find(|m| m.id == model_id.as_str());
    debug!(model = %model_id, found = found.is_some(), "Catalog lookup");
    found
}
