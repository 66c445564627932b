//! Model runtime seam.
//!
//! - [`engine`]: Engine and loader traits, request and progress types
//! - [`chunk`]: Streaming chat completion chunks
//! - [`runtime`]: Built-in simulated runtime
//! - [`catalog`]: Models the built-in runtime can load
//! - [`library`]: Acquisition of the engine loader with ordered fallback

pub mod catalog;
pub mod chunk;
pub mod engine;
pub mod library;
pub mod runtime;
