//! Integration tests for prompt runs and stream rendering.

mod common;

use std::sync::Arc;

use tokio::sync::Notify;

use common::{harness, texts, ScriptedEngine, ScriptedLoader, Step};
use prompt_session::inference::engine::{EngineError, Role};
use prompt_session::session::stream::{
    BUSY_STATUS, EMPTY_PROMPT_MESSAGE, MAX_TOKENS, RUN_FAILED_STATUS, TEMPERATURE,
    THINKING_MESSAGE,
};
use prompt_session::session::PromptError;

#[tokio::test]
async fn test_empty_prompts_are_rejected_without_request() {
    let h = harness("demo-model", ScriptedLoader::new(texts(&["x"])));
    let engine = ScriptedEngine::new("demo-model", texts(&["x"]));

    for prompt in ["", "   ", "\n\t "] {
        let result = h.runner.run_prompt(&engine, prompt).await;
        assert!(matches!(result, Err(PromptError::EmptyPrompt)));
        assert_eq!(h.surface.output(), EMPTY_PROMPT_MESSAGE);
    }

    assert_eq!(engine.request_count(), 0);
    assert!(!h.runner.is_busy());
}

#[tokio::test]
async fn test_chunks_render_in_order() {
    let h = harness("demo-model", ScriptedLoader::new(Vec::new()));
    let engine = ScriptedEngine::new("demo-model", texts(&["Hel", "lo, ", "world"]));

    let summary = h.runner.run_prompt(&engine, "greet me").await.unwrap();

    assert_eq!(h.surface.output(), "Hello, world\n");
    assert_eq!(h.surface.output_history(), vec![THINKING_MESSAGE, ""]);
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.chars, 12);
    assert_eq!(h.metrics.stream_chunks.get(), 3);
}

#[tokio::test]
async fn test_request_shape() {
    let h = harness("demo-model", ScriptedLoader::new(Vec::new()));
    let engine = ScriptedEngine::new("demo-model", texts(&["ok"]));

    h.runner.run_prompt(&engine, "  what is rust?  ").await.unwrap();

    let request = engine.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, Role::User);
    assert_eq!(request.messages[0].content, "what is rust?");
    assert!(request.stream);
    assert_eq!(request.temperature, TEMPERATURE);
    assert_eq!(request.max_tokens, MAX_TOKENS);
    assert_eq!(TEMPERATURE, 0.7);
    assert_eq!(MAX_TOKENS, 256);
}

#[tokio::test]
async fn test_chunk_without_content_contributes_nothing() {
    let h = harness("demo-model", ScriptedLoader::new(Vec::new()));
    let script = vec![
        Step::Text("a".to_string()),
        Step::NoContent,
        Step::Text("b".to_string()),
    ];
    let engine = ScriptedEngine::new("demo-model", script);

    let summary = h.runner.run_prompt(&engine, "go").await.unwrap();

    assert_eq!(h.surface.output(), "ab\n");
    assert_eq!(summary.chunks, 3);
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_partial_output() {
    let h = harness("demo-model", ScriptedLoader::new(Vec::new()));
    let mut script = texts(&["Par", "tial"]);
    script.push(Step::Fail(EngineError::Interrupted("connection reset".to_string())));
    script.push(Step::Text("never".to_string()));
    let engine = ScriptedEngine::new("demo-model", script);

    let result = h.runner.run_prompt(&engine, "go").await;

    assert!(matches!(
        result,
        Err(PromptError::GenerationFailed(EngineError::Interrupted(_)))
    ));
    let output = h.surface.output();
    assert!(output.starts_with("Partial"));
    assert!(output.ends_with("ERROR: Stream interrupted: connection reset"));
    assert!(!output.contains("never"));
    assert_eq!(h.surface.status(), RUN_FAILED_STATUS);
    assert_eq!(h.metrics.generation_failures.get(), 1);
    assert!(!h.runner.is_busy());
}

#[tokio::test]
async fn test_rejected_request_replaces_thinking_indicator() {
    let h = harness("demo-model", ScriptedLoader::new(Vec::new()));
    let engine = ScriptedEngine::rejecting(
        "demo-model",
        EngineError::Generation("context overflow".to_string()),
    );

    let result = h.runner.run_prompt(&engine, "go").await;

    assert!(matches!(result, Err(PromptError::GenerationFailed(_))));
    assert_eq!(h.surface.output(), "ERROR: Generation failed: context overflow");
    assert_eq!(h.surface.status(), RUN_FAILED_STATUS);
}

#[tokio::test]
async fn test_decoder_error_after_text_is_appended() {
    let h = harness("demo-model", ScriptedLoader::new(Vec::new()));
    let mut script = texts(&["ok "]);
    script.push(Step::Fail(EngineError::Generation("decoder fault".to_string())));
    let engine = ScriptedEngine::new("demo-model", script);

    let result = h.runner.run_prompt(&engine, "go").await;

    assert!(result.is_err());
    assert_eq!(
        h.surface.output(),
        "ok \nERROR: Generation failed: decoder fault"
    );
}

#[tokio::test]
async fn test_overlapping_run_is_rejected() {
    let h = Arc::new(harness("demo-model", ScriptedLoader::new(Vec::new())));
    let gate = Arc::new(Notify::new());
    let script = vec![
        Step::Text("first ".to_string()),
        Step::Gate(gate.clone()),
        Step::Text("done".to_string()),
    ];
    let engine = Arc::new(ScriptedEngine::new("demo-model", script));

    let first = {
        let h = h.clone();
        let engine = engine.clone();
        tokio::spawn(async move { h.runner.run_prompt(engine.as_ref(), "one").await })
    };

    while !h.runner.is_busy() {
        tokio::task::yield_now().await;
    }

    let second = h.runner.run_prompt(engine.as_ref(), "two").await;
    assert!(matches!(second, Err(PromptError::Busy)));
    assert_eq!(h.surface.status(), BUSY_STATUS);

    gate.notify_one();
    first.await.unwrap().unwrap();

    assert_eq!(h.surface.output(), "first done\n");
    assert_eq!(engine.request_count(), 1);
    assert_eq!(h.metrics.prompts_rejected.get(), 1);
}
