//! Front-end wiring: one trigger action composed of "ensure ready, then run".
//!
//! [`Frontend::trigger`] is what a user action invokes. The prompt runner only
//! ever sees an engine the session manager reported as ready.

use std::ops::ControlFlow;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::gpu::device;
use crate::inference::engine::ModelId;
use crate::inference::library::{self, providers_from_config};
use crate::metrics::SessionMetrics;
use crate::session::stream::RUN_FAILED_STATUS;
use crate::session::{
    PromptError, PromptRunner, Readiness, RunSummary, SessionError, SessionManager,
    SessionStatus,
};
use crate::ui::Surface;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("engine not ready ({0:?})")]
    NotReady(Readiness),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// A line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    SelectModel(String),
    Status,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix(':') else {
            return Self::Prompt(line.to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        match (parts.next().unwrap_or(""), parts.next().map(str::trim)) {
            ("model", Some(id)) if !id.is_empty() => Self::SelectModel(id.to_string()),
            ("status", None) => Self::Status,
            ("quit" | "q", None) => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// Human-readable session status.
pub fn describe(status: &SessionStatus) -> String {
    match status {
        SessionStatus::Uninitialized => "No model loaded yet.".to_string(),
        SessionStatus::Initializing => "Model is loading…".to_string(),
        SessionStatus::Ready(model) => format!("Loaded {model}."),
        SessionStatus::Failed(message) => format!("Model init failed: {message}"),
    }
}

/// The session manager and prompt runner behind one surface.
pub struct Frontend {
    session: Arc<SessionManager>,
    runner: PromptRunner,
    surface: Arc<dyn Surface>,
}

impl Frontend {
    pub fn new(session: Arc<SessionManager>, runner: PromptRunner, surface: Arc<dyn Surface>) -> Self {
        Self {
            session,
            runner,
            surface,
        }
    }

    /// Acquire the engine library, probe hardware and build the front-end.
    pub async fn start(
        config: &Config,
        surface: Arc<dyn Surface>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let library = library::acquire(&providers_from_config(config), surface.as_ref()).await;
        let devices = device::probe(&config.hardware.probe_paths, surface.as_ref());

        info!(
            library = library.source().unwrap_or("unavailable"),
            accelerators = devices.len(),
            model = config.model.model_id,
            "Front-end started"
        );

        let session = Arc::new(SessionManager::new(
            library,
            ModelId::new(config.model.model_id.clone()),
            surface.clone(),
            metrics.clone(),
        ));
        let runner = PromptRunner::new(surface.clone(), metrics);
        Self::new(session, runner, surface)
    }

    /// Make sure the engine is loaded, then run `text` through it.
    pub async fn trigger(&self, text: &str) -> Result<RunSummary, TriggerError> {
        let readiness = match self.session.ensure_ready().await {
            Ok(readiness) => readiness,
            Err(e) => {
                error!(error = %e, "Run failed before generation");
                self.surface.set_output(&format!("ERROR: {e}"));
                self.surface.set_status(RUN_FAILED_STATUS);
                return Err(e.into());
            }
        };

        let engine = self
            .session
            .engine()
            .ok_or(TriggerError::NotReady(readiness))?;

        Ok(self.runner.run_prompt(engine.as_ref(), text).await?)
    }

    /// Execute one line of user input.
    pub async fn handle(&self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Prompt(text) => {
                // Failures are already on the surface.
                if let Err(e) = self.trigger(&text).await {
                    info!(error = %e, "Trigger did not complete");
                }
            }
            Command::SelectModel(id) => {
                self.session.select_model(id.as_str());
                let message = match self.session.status() {
                    SessionStatus::Ready(loaded) if loaded.as_str() != id => format!(
                        "Selected {id}. {loaded} stays loaded until restart."
                    ),
                    _ => format!("Selected {id}."),
                };
                self.surface.set_status(&message);
            }
            Command::Status => {
                self.surface.set_status(&describe(&self.session.status()));
            }
            Command::Quit => return ControlFlow::Break(()),
            Command::Unknown(input) => {
                self.surface.set_status(&format!(
                    "Unknown command {input}. Try :model <id>, :status or :quit."
                ));
            }
        }
        ControlFlow::Continue(())
    }
}
