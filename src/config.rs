//! Runtime configuration for prompt-session.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! Command-line flags override the file where both exist.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "prompt-session", about = "Prompt front-end for a local LLM runtime")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "prompt-session.json")]
    pub config: PathBuf,

    /// Model to load on first use (overrides the config file).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Run a single prompt and exit instead of reading prompts from stdin.
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,

    /// Print the metrics exposition on exit.
    #[arg(long)]
    pub metrics: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model selection.
    pub model: ModelConfig,

    /// Runtime library acquisition.
    pub library: LibraryConfig,

    /// Built-in runtime tuning.
    pub runtime: RuntimeConfig,

    /// Hardware probe settings.
    pub hardware: HardwareConfig,
}

/// Model selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier selected at startup.
    pub model_id: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "Llama-3.2-1B-Instruct-q4f16_1".to_string(),
        }
    }
}

/// Where the runtime library is acquired from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Provider names, attempted in order. The first that loads wins.
    pub sources: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            sources: vec!["builtin".to_string()],
        }
    }
}

/// Tuning for the built-in simulated runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of progress steps emitted while loading a model.
    pub load_steps: u32,

    /// Delay between load steps in milliseconds.
    pub load_step_ms: u64,

    /// Delay between streamed tokens in milliseconds.
    pub token_delay_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            load_steps: 10,
            load_step_ms: 150,
            token_delay_ms: 30,
        }
    }
}

/// Hardware acceleration probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Device nodes whose presence indicates an accelerator.
    pub probe_paths: Vec<PathBuf>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            probe_paths: vec![
                PathBuf::from("/dev/nvidia0"),
                PathBuf::from("/dev/dri/renderD128"),
                PathBuf::from("/dev/kfd"),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(model) = &cli.model {
            self.model.model_id = model.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.library.sources, vec!["builtin".to_string()]);
        assert_eq!(cfg.runtime.load_steps, 10);
        assert!(!cfg.model.model_id.is_empty());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "model": { "model_id": "demo-model" } }"#).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.model.model_id, "demo-model");
        assert_eq!(cfg.runtime.token_delay_ms, 30);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg.library.sources.len(), 1);
    }

    #[test]
    fn test_cli_model_override() {
        let cli = Cli::parse_from(["prompt-session", "--model", "other-model"]);
        let mut cfg = Config::default();
        cfg.apply_cli(&cli);
        assert_eq!(cfg.model.model_id, "other-model");
    }
}
