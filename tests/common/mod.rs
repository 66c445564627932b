//! Scripted runtime shared by the integration tests.
//!
//! The loader counts constructions, replays a fixed progress sequence and can
//! be held at a gate until the test releases it. Engines replay a fixed chunk
//! script and count generation requests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use prompt_session::inference::chunk::ChatCompletionChunk;
use prompt_session::inference::engine::{
    ChatCompletionRequest, ChunkStream, Engine, EngineError, EngineLoader, ModelId,
    ProgressEvent, ProgressObserver,
};
use prompt_session::inference::library::Library;
use prompt_session::metrics::SessionMetrics;
use prompt_session::session::{PromptRunner, SessionManager};
use prompt_session::ui::MemorySurface;

/// One step of a chunk script.
#[derive(Clone)]
pub enum Step {
    Text(String),
    NoContent,
    Fail(EngineError),
    /// Suspend the stream until the gate is notified.
    Gate(Arc<Notify>),
}

pub fn texts(parts: &[&str]) -> Vec<Step> {
    parts.iter().map(|p| Step::Text(p.to_string())).collect()
}

pub struct ScriptedEngine {
    model_id: ModelId,
    script: Vec<Step>,
    reject: Option<EngineError>,
    pub requests: AtomicUsize,
    pub last_request: Mutex<Option<ChatCompletionRequest>>,
}

impl ScriptedEngine {
    pub fn new(model_id: &str, script: Vec<Step>) -> Self {
        Self {
            model_id: ModelId::new(model_id),
            script,
            reject: None,
            requests: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Engine that refuses every request before streaming.
    pub fn rejecting(model_id: &str, error: EngineError) -> Self {
        Self {
            reject: Some(error),
            ..Self::new(model_id, Vec::new())
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChunkStream, EngineError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(error) = &self.reject {
            return Err(error.clone());
        }

        let request_id = request.request_id;
        let model = self.model_id.to_string();
        let steps = self.script.clone().into_iter();

        let stream = futures::stream::unfold(steps, move |mut steps| {
            let request_id = request_id.clone();
            let model = model.clone();
            async move {
                loop {
                    match steps.next()? {
                        Step::Gate(gate) => gate.notified().await,
                        Step::Text(text) => {
                            let chunk = ChatCompletionChunk::content(&request_id, &model, text);
                            return Some((Ok(chunk), steps));
                        }
                        Step::NoContent => {
                            let chunk = ChatCompletionChunk::finish(&request_id, &model, "stop");
                            return Some((Ok(chunk), steps));
                        }
                        Step::Fail(error) => return Some((Err(error), steps)),
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

pub struct ScriptedLoader {
    progress: Vec<Option<f64>>,
    script: Vec<Step>,
    gate: Option<Arc<Notify>>,
    failures_left: AtomicUsize,
    panics_left: AtomicUsize,
    pub constructions: AtomicUsize,
    pub requested_models: Mutex<Vec<ModelId>>,
    pub engines: Mutex<Vec<Arc<ScriptedEngine>>>,
}

impl ScriptedLoader {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            progress: Vec::new(),
            script,
            gate: None,
            failures_left: AtomicUsize::new(0),
            panics_left: AtomicUsize::new(0),
            constructions: AtomicUsize::new(0),
            requested_models: Mutex::new(Vec::new()),
            engines: Mutex::new(Vec::new()),
        }
    }

    pub fn with_progress(mut self, progress: &[Option<f64>]) -> Self {
        self.progress = progress.to_vec();
        self
    }

    /// Hold every construction until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Fail the next `n` constructions.
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Panic inside the next `n` constructions.
    pub fn panicking(self, n: usize) -> Self {
        self.panics_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn last_engine(&self) -> Arc<ScriptedEngine> {
        self.engines.lock().unwrap().last().cloned().expect("no engine built")
    }
}

#[async_trait]
impl EngineLoader for ScriptedLoader {
    async fn create_engine(
        &self,
        model_id: &ModelId,
        progress: Arc<dyn ProgressObserver>,
    ) -> Result<Arc<dyn Engine>, EngineError> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        self.requested_models.lock().unwrap().push(model_id.clone());

        for p in &self.progress {
            progress.on_progress(&ProgressEvent {
                progress: *p,
                text: None,
            });
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if take_one(&self.panics_left) {
            panic!("loader crashed while building {model_id}");
        }

        if take_one(&self.failures_left) {
            return Err(EngineError::LoadFailed("out of memory".to_string()));
        }

        let engine = Arc::new(ScriptedEngine::new(model_id.as_str(), self.script.clone()));
        self.engines.lock().unwrap().push(engine.clone());
        Ok(engine)
    }
}

/// Decrement `counter` if it is non-zero; true when it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

pub struct Harness {
    pub loader: Arc<ScriptedLoader>,
    pub surface: Arc<MemorySurface>,
    pub metrics: Arc<SessionMetrics>,
    pub session: Arc<SessionManager>,
    pub runner: PromptRunner,
}

pub fn harness(model: &str, loader: ScriptedLoader) -> Harness {
    let loader = Arc::new(loader);
    let surface = Arc::new(MemorySurface::new());
    let metrics = Arc::new(SessionMetrics::new().unwrap());
    let session = Arc::new(SessionManager::new(
        Library::loaded("scripted", loader.clone()),
        ModelId::new(model),
        surface.clone(),
        metrics.clone(),
    ));
    let runner = PromptRunner::new(surface.clone(), metrics.clone());

    Harness {
        loader,
        surface,
        metrics,
        session,
        runner,
    }
}
