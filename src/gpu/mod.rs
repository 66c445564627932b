//! Hardware acceleration probe.
//!
//! - [`device`]: Accelerator discovery and the startup status it produces

pub mod device;
