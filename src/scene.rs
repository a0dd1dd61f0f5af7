//! Fixed stage the sculpture is shown on.

/// Camera eye position; it looks down -Z at the origin.
pub const CAMERA_POSITION: [f32; 3] = [0.0, 0.0, 8.0];
/// Vertical field of view in degrees.
pub const CAMERA_FOV_DEG: f32 = 45.0;

/// `#050505`
pub const BACKGROUND: [u8; 3] = [5, 5, 5];

/// Linear fog towards the background colour between these view depths.
pub const FOG_NEAR: f32 = 2.0;
pub const FOG_FAR: f32 = 20.0;

/// Fraction of the background colour mixed in at view depth `depth`.
pub fn fog_factor(depth: f32) -> f32 {
    ((depth - FOG_NEAR) / (FOG_FAR - FOG_NEAR)).clamp(0.0, 1.0)
}
