//! prompt-session: prompt front-end for a local LLM runtime.
//!
//! Loads a model engine lazily and at most once, reports load progress,
//! reuses the engine across prompts and renders each response as it streams:
//!   trigger → ensure ready (single-flight) → run prompt → append chunks
//!
//! The runtime itself sits behind the [`inference::engine`] traits.

pub mod app;
pub mod config;
pub mod gpu;
pub mod inference;
pub mod metrics;
pub mod session;
pub mod ui;
