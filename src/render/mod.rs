//! Seam between the session and whatever draws it.

pub mod preview;

use std::time::Duration;

use anyhow::Result;
use image::RgbaImage;

use crate::session::FrameInput;

/// A drawing backend driven once per display frame.
///
/// Implementations own all lighting, shading and post-processing; the core
/// only hands over what to draw and reads frames back for export.
pub trait Renderer: Send {
    fn draw(&mut self, input: &FrameInput, elapsed: Duration) -> Result<()>;

    /// The most recently drawn frame.
    fn capture(&self) -> Result<RgbaImage>;
}
