use std::ops::RangeInclusive;

use crate::texture::Texture;

pub const QUALITY_RANGE: RangeInclusive<u8> = 1..=100;
pub const INTENSITY_MIN: f32 = 0.0;
pub const INTENSITY_MAX: f32 = 3.0;
/// Slider granularity for intensity is 1 / this, i.e. 0.1.
pub const INTENSITY_STEPS_PER_UNIT: f32 = 10.0;

pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_INTENSITY: f32 = 1.2;

/// User-controlled sculpture parameters.
///
/// Every setter clamps into the valid domain so the value the renderer sees
/// is always the value a control would display.
#[derive(Debug, Clone)]
pub struct ParameterState {
    quality: u8,
    intensity: f32,
    wireframe: bool,
    active_image: Option<Texture>,
}

impl Default for ParameterState {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            intensity: DEFAULT_INTENSITY,
            wireframe: false,
            active_image: None,
        }
    }
}

impl ParameterState {
    pub fn new(quality: i64, intensity: f32, wireframe: bool) -> Self {
        let mut params = Self::default();
        params.set_quality(quality);
        params.set_intensity(intensity);
        params.set_wireframe(wireframe);
        params
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn active_image(&self) -> Option<&Texture> {
        self.active_image.as_ref()
    }

    pub fn set_quality(&mut self, value: i64) {
        self.quality = clamp_quality(value);
    }

    /// Non-finite input other than the infinities is ignored.
    pub fn set_intensity(&mut self, value: f32) {
        if let Some(v) = clamp_intensity(value) {
            self.intensity = v;
        }
    }

    pub fn set_wireframe(&mut self, on: bool) {
        self.wireframe = on;
    }

    pub(crate) fn set_active_image(&mut self, image: Texture) {
        self.active_image = Some(image);
    }
}

pub fn clamp_quality(value: i64) -> u8 {
    let lo = i64::from(*QUALITY_RANGE.start());
    let hi = i64::from(*QUALITY_RANGE.end());
    value.clamp(lo, hi) as u8
}

/// Clamp to `[0.0, 3.0]` and snap to the 0.1 slider grid. `None` for NaN.
pub fn clamp_intensity(value: f32) -> Option<f32> {
    if value.is_nan() {
        return None;
    }
    let clamped = value.clamp(INTENSITY_MIN, INTENSITY_MAX);
    let steps = (clamped * INTENSITY_STEPS_PER_UNIT).round();
    Some((steps / INTENSITY_STEPS_PER_UNIT).clamp(INTENSITY_MIN, INTENSITY_MAX))
}
