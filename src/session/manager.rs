//! Engine lifecycle: lazy, single-flight initialization and reuse.
//!
//! The manager owns the one engine handle of the process. State moves
//! `Uninitialized → Initializing → Ready | Failed` and only
//! [`SessionManager::ensure_ready`] drives it:
//! 1. `Ready` returns at once, so the engine is reused across prompts
//! 2. `Initializing` returns at once, so at most one construction is in flight
//! 3. anything else starts a construction with the currently selected model
//!
//! `Failed` is not terminal: the next call retries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::inference::engine::{Engine, EngineError, ModelId, ProgressObserver};
use crate::inference::library::Library;
use crate::metrics::SessionMetrics;
use crate::ui::{ProgressRenderer, Surface};

/// Status shown when a construction attempt fails.
pub const INIT_FAILED_STATUS: &str = "Model init failed. See logs for details.";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("engine library not available")]
    LibraryUnavailable,

    #[error("engine initialization failed: {0}")]
    EngineInitFailed(#[source] EngineError),
}

/// Lifecycle state of the engine handle.
#[derive(Clone, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready(Arc<dyn Engine>),
    Failed(String),
}

/// Snapshot of [`SessionState`] without the engine handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Initializing,
    Ready(ModelId),
    Failed(String),
}

/// What an `ensure_ready` call observed or achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// An engine is loaded.
    Ready,
    /// Another call is constructing the engine; nothing was started.
    InFlight,
    /// This call's construction attempt failed.
    Failed,
}

/// Resets `Initializing` when an attempt ends without settling, including
/// when the future driving it is dropped or panics.
struct InitGuard<'a> {
    state: &'a Mutex<SessionState>,
    settled: bool,
}

impl InitGuard<'_> {
    fn settle(mut self, next: SessionState) {
        *lock(self.state) = next;
        self.settled = true;
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock(self.state);
        if matches!(*state, SessionState::Initializing) {
            debug!("Initialization abandoned, releasing guard");
            *state = SessionState::Uninitialized;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the engine handle and its lifecycle.
pub struct SessionManager {
    state: Mutex<SessionState>,
    selected_model: Mutex<ModelId>,
    library: Library,
    surface: Arc<dyn Surface>,
    metrics: Arc<SessionMetrics>,
}

impl SessionManager {
    pub fn new(
        library: Library,
        model_id: ModelId,
        surface: Arc<dyn Surface>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState::Uninitialized),
            selected_model: Mutex::new(model_id),
            library,
            surface,
            metrics,
        }
    }

    /// Select the model for the next initialization attempt.
    ///
    /// A loaded engine is kept; selecting another model does not reload.
    pub fn select_model(&self, model_id: impl Into<ModelId>) {
        let model_id = model_id.into();
        if let SessionState::Ready(engine) = &*lock(&self.state) {
            if engine.model_id() != &model_id {
                info!(
                    loaded = %engine.model_id(),
                    selected = %model_id,
                    "Model selection changed after load; keeping the loaded engine"
                );
            }
        }
        *lock(&self.selected_model) = model_id;
    }

    pub fn selected_model(&self) -> ModelId {
        lock(&self.selected_model).clone()
    }

    pub fn status(&self) -> SessionStatus {
        match &*lock(&self.state) {
            SessionState::Uninitialized => SessionStatus::Uninitialized,
            SessionState::Initializing => SessionStatus::Initializing,
            SessionState::Ready(engine) => SessionStatus::Ready(engine.model_id().clone()),
            SessionState::Failed(message) => SessionStatus::Failed(message.clone()),
        }
    }

    /// The loaded engine, if any.
    pub fn engine(&self) -> Option<Arc<dyn Engine>> {
        match &*lock(&self.state) {
            SessionState::Ready(engine) => Some(engine.clone()),
            _ => None,
        }
    }

    /// Make sure an engine is loaded, constructing it if nobody has.
    ///
    /// Construction failures are reported on the surface and come back as
    /// [`Readiness::Failed`]; only a missing library is an error.
    pub async fn ensure_ready(&self) -> Result<Readiness, SessionError> {
        let (guard, loader) = {
            let mut state = lock(&self.state);
            match &*state {
                SessionState::Ready(_) => return Ok(Readiness::Ready),
                SessionState::Initializing => {
                    debug!("Initialization already in flight");
                    return Ok(Readiness::InFlight);
                }
                SessionState::Uninitialized | SessionState::Failed(_) => {}
            }

            let loader = self
                .library
                .loader()
                .cloned()
                .ok_or(SessionError::LibraryUnavailable)?;

            *state = SessionState::Initializing;
            let guard = InitGuard {
                state: &self.state,
                settled: false,
            };
            (guard, loader)
        };

        let model_id = self.selected_model();
        self.surface.set_output("");
        self.surface.set_status(&format!(
            "Loading {model_id}… (first time downloads; later runs work offline)"
        ));
        info!(model = %model_id, "Initializing engine");

        let observer: Arc<dyn ProgressObserver> =
            Arc::new(ProgressRenderer::new(self.surface.clone()));

        match loader.create_engine(&model_id, observer).await {
            Ok(engine) => {
                guard.settle(SessionState::Ready(engine));
                self.metrics.engine_init.with_label_values(&["ready"]).inc();
                info!(model = %model_id, "Engine ready");
                self.surface.set_status(&format!("Loaded {model_id}."));
                Ok(Readiness::Ready)
            }
            Err(e) => {
                let message = e.to_string();
                let err = SessionError::EngineInitFailed(e);
                error!(model = %model_id, error = %err, "Engine initialization failed");

                guard.settle(SessionState::Failed(message.clone()));
                self.metrics.engine_init.with_label_values(&["failed"]).inc();
                self.surface
                    .set_output(&format!("ERROR during model init: {message}"));
                self.surface.set_status(INIT_FAILED_STATUS);
                Ok(Readiness::Failed)
            }
        }
    }
}
