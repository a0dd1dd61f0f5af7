//! PNG export of renderer captures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::info;

use crate::render::Renderer;

pub const DEFAULT_EXPORT_NAME: &str = "HoloGen_Capture.png";

pub fn write_png(frame: &RgbaImage, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating export directory {}", parent.display()))?;
    }
    frame
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing capture to {}", path.display()))?;
    info!(path = %path.display(), width = frame.width(), height = frame.height(), "capture exported");
    Ok(path.to_path_buf())
}

/// Snapshot whatever the renderer last drew. Never waits on synthesis.
pub fn export_capture<R: Renderer + ?Sized>(renderer: &R, path: &Path) -> Result<PathBuf> {
    let frame = renderer.capture().context("capturing frame")?;
    write_png(&frame, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_readable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_EXPORT_NAME);
        let frame = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        let written = write_png(&frame, &path).unwrap();
        assert_eq!(written, path);
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back, frame);
    }
}
