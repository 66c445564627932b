//! Display surfaces.
//!
//! - [`surface`]: Status and output regions, terminal and in-memory
//! - [`progress`]: Renders engine load progress onto a surface

pub mod progress;
pub mod surface;

pub use progress::ProgressRenderer;
pub use surface::{MemorySurface, Surface, TerminalSurface};
