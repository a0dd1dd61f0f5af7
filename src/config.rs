use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use tracing::warn;

use crate::export::DEFAULT_EXPORT_NAME;
use crate::params::{self, DEFAULT_INTENSITY, DEFAULT_QUALITY, ParameterState};

/// Largest capture canvas side accepted.
pub const MAX_CAPTURE_DIM: u32 = 8192;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Initial quality (1-100); clamped.
    pub quality: i64,
    /// Initial depth intensity (0.0-3.0); clamped.
    pub intensity: f32,
    /// Start in wireframe mode.
    pub wireframe: bool,
    /// Delay between synthesis stage emissions.
    #[serde(with = "humantime_serde")]
    pub stage_interval: Duration,
    /// Viewer redraw rate in Hz.
    pub frame_rate: u32,
    /// Decoded images are downscaled so neither side exceeds this.
    pub max_texture_dim: u32,
    /// Preview renderer canvas size.
    pub capture: CaptureSize,
    /// Where `export` writes when no path is given.
    pub export_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CaptureSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            quality: i64::from(DEFAULT_QUALITY),
            intensity: DEFAULT_INTENSITY,
            wireframe: false,
            stage_interval: Duration::from_millis(350),
            frame_rate: 60,
            max_texture_dim: 4096,
            capture: CaptureSize::default(),
            export_path: PathBuf::from(DEFAULT_EXPORT_NAME),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    ///
    /// Out-of-range quality and intensity are not errors; they are clamped
    /// when the session starts.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.stage_interval.is_zero(),
            "stage-interval must be greater than zero"
        );
        ensure!(
            (1..=240).contains(&self.frame_rate),
            "frame-rate must be between 1 and 240"
        );
        ensure!(
            self.max_texture_dim > 0,
            "max-texture-dim must be greater than zero"
        );
        ensure!(
            self.capture.width > 0 && self.capture.height > 0,
            "capture width and height must be greater than zero"
        );
        ensure!(
            self.capture.width <= MAX_CAPTURE_DIM && self.capture.height <= MAX_CAPTURE_DIM,
            "capture width and height must be at most {MAX_CAPTURE_DIM}"
        );
        if i64::from(params::clamp_quality(self.quality)) != self.quality {
            warn!(quality = self.quality, "quality out of range; clamping");
        }
        if params::clamp_intensity(self.intensity) != Some(self.intensity) {
            warn!(intensity = self.intensity, "intensity off the 0.0-3.0 grid; clamping");
        }
        Ok(self)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    pub fn initial_params(&self) -> ParameterState {
        ParameterState::new(self.quality, self.intensity, self.wireframe)
    }
}
