//! Accelerator discovery.
//!
//! Looks for accelerator device nodes at startup. The result only sets an
//! informational status; nothing is gated on it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ui::Surface;

pub const ACCELERATED_STATUS: &str = "GPU acceleration detected. Ready to load a model.";
pub const UNACCELERATED_STATUS: &str = "No GPU acceleration detected. It may run slowly or fall back.";

/// Kind of accelerator behind a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Nvidia,
    Amd,
    /// Generic DRM render node.
    Render,
    Unknown,
}

/// A detected accelerator device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuDeviceInfo {
    /// Device index in probe order.
    pub id: usize,

    /// Device node path.
    pub path: PathBuf,

    pub kind: DeviceKind,
}

fn classify(path: &Path) -> DeviceKind {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name.starts_with("nvidia") {
        DeviceKind::Nvidia
    } else if name == "kfd" {
        DeviceKind::Amd
    } else if name.starts_with("render") {
        DeviceKind::Render
    } else {
        DeviceKind::Unknown
    }
}

/// Detect accelerators among the given device nodes.
pub fn detect_devices(probe_paths: &[PathBuf]) -> Vec<GpuDeviceInfo> {
    let devices: Vec<GpuDeviceInfo> = probe_paths
        .iter()
        .filter(|p| p.exists())
        .enumerate()
        .map(|(id, path)| GpuDeviceInfo {
            id,
            path: path.clone(),
            kind: classify(path),
        })
        .collect();

    info!(count = devices.len(), "Accelerator probe complete");
    devices
}

/// Status line for a probe result.
pub fn status_message(devices: &[GpuDeviceInfo]) -> &'static str {
    if devices.is_empty() {
        UNACCELERATED_STATUS
    } else {
        ACCELERATED_STATUS
    }
}

/// Probe once and report the result on the surface.
pub fn probe(probe_paths: &[PathBuf], surface: &dyn Surface) -> Vec<GpuDeviceInfo> {
    let devices = detect_devices(probe_paths);
    surface.set_status(status_message(&devices));
    devices
}
