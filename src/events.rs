use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::texture::ImageSubmission;

/// Input accepted by the controller; each maps to one session operation.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SetQuality(i64),
    SetIntensity(f32),
    SetWireframe(bool),
    ToggleWireframe,
    Submit(ImageSubmission),
}

/// Emitted by the controller as submissions and runs progress.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Refused before decoding (wrong type, or busy).
    Rejected { name: String, reason: String },
    DecodeFailed { name: String, error: String },
    Started { name: String },
    Stage { index: usize, label: &'static str },
    Completed { width: u32, height: u32 },
}

/// Ask the viewer to write its current frame to `path`.
#[derive(Debug)]
pub struct ExportRequest {
    pub path: PathBuf,
    pub reply: oneshot::Sender<anyhow::Result<PathBuf>>,
}
