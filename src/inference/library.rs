//! Runtime library acquisition.
//!
//! The engine loader is obtained once at startup from an ordered list of
//! providers. The first provider that loads wins; if every provider fails the
//! library stays unavailable for the rest of the process.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Config, RuntimeConfig};
use crate::inference::engine::EngineLoader;
use crate::inference::runtime::SimulatedLoader;
use crate::ui::Surface;

/// Status shown when every provider failed.
pub const UNAVAILABLE_STATUS: &str = "FAILED to load engine library. Check the configured sources.";

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Unknown library source: {0}")]
    UnknownSource(String),

    #[error("Library source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

/// A place the engine loader can be obtained from.
#[async_trait]
pub trait LibraryProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> Result<Arc<dyn EngineLoader>, LibraryError>;
}

/// Outcome of library acquisition.
#[derive(Clone)]
pub enum Library {
    Loaded {
        source: String,
        loader: Arc<dyn EngineLoader>,
    },
    Unavailable,
}

impl Library {
    pub fn loaded(source: impl Into<String>, loader: Arc<dyn EngineLoader>) -> Self {
        Self::Loaded {
            source: source.into(),
            loader,
        }
    }

    pub fn loader(&self) -> Option<&Arc<dyn EngineLoader>> {
        match self {
            Self::Loaded { loader, .. } => Some(loader),
            Self::Unavailable => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Loaded { source, .. } => Some(source),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Provider for the built-in simulated runtime.
pub struct BuiltinProvider {
    config: RuntimeConfig,
}

impl BuiltinProvider {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LibraryProvider for BuiltinProvider {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn load(&self) -> Result<Arc<dyn EngineLoader>, LibraryError> {
        Ok(Arc::new(SimulatedLoader::new(self.config.clone())))
    }
}

/// Placeholder for a configured source name nothing resolves.
struct UnresolvedProvider {
    name: String,
}

#[async_trait]
impl LibraryProvider for UnresolvedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Arc<dyn EngineLoader>, LibraryError> {
        Err(LibraryError::UnknownSource(self.name.clone()))
    }
}

/// Resolve the configured source names into providers, preserving order.
pub fn providers_from_config(config: &Config) -> Vec<Arc<dyn LibraryProvider>> {
    config
        .library
        .sources
        .iter()
        .map(|name| -> Arc<dyn LibraryProvider> {
            match name.as_str() {
                "builtin" => Arc::new(BuiltinProvider::new(config.runtime.clone())),
                other => Arc::new(UnresolvedProvider {
                    name: other.to_string(),
                }),
            }
        })
        .collect()
}

/// Try each provider in order and report the outcome on the surface.
pub async fn acquire(providers: &[Arc<dyn LibraryProvider>], surface: &dyn Surface) -> Library {
    let mut failures = Vec::new();

    for provider in providers {
        match provider.load().await {
            Ok(loader) => {
                info!(source = provider.name(), "Engine library loaded");
                surface.set_status(&format!("engine library loaded ({})", provider.name()));
                return Library::loaded(provider.name(), loader);
            }
            Err(e) => {
                warn!(source = provider.name(), error = %e, "Engine library source failed");
                failures.push(e.to_string());
            }
        }
    }

    error!(errors = ?failures, "No engine library source could be loaded");
    surface.set_status(UNAVAILABLE_STATUS);
    Library::Unavailable
}
