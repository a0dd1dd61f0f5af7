//! Idle motion of the sculpture as a pure function of elapsed time.
//!
//! Nothing accumulates between frames, so a pose can be recomputed for any
//! instant (replays, tests, a renderer that restarts).

use std::time::Duration;

use crate::geometry::{GeometryKind, KNOT_SCALE, PLANE_TILT_X};

#[derive(Debug, Clone, Copy, PartialEq)]
struct FloatStyle {
    speed: f32,
    rotation_intensity: f32,
    float_intensity: f32,
}

const DEMO_FLOAT: FloatStyle = FloatStyle {
    speed: 2.0,
    rotation_intensity: 0.5,
    float_intensity: 0.5,
};

const DISPLACEMENT_FLOAT: FloatStyle = FloatStyle {
    speed: 1.0,
    rotation_intensity: 0.2,
    float_intensity: 0.2,
};

/// Model transform for one frame.
///
/// Two nested frames: the floating group wobbles and lifts, and the mesh
/// inside it carries its own tilt, spin and scale. Both rotations are Euler
/// angles in radians with X outermost, so a point turns about Z, then Y,
/// then X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub float_rotation: [f32; 3],
    pub lift: f32,
    pub mesh_rotation: [f32; 3],
    pub scale: f32,
}

impl Pose {
    pub fn at(kind: GeometryKind, elapsed: Duration) -> Self {
        let t = elapsed.as_secs_f32();
        let (style, tilt, scale) = match kind {
            GeometryKind::Demo => (DEMO_FLOAT, 0.0, KNOT_SCALE),
            GeometryKind::Displacement => (DISPLACEMENT_FLOAT, PLANE_TILT_X, 1.0),
        };
        let phase = t / 4.0 * style.speed;
        let r = style.rotation_intensity;
        Self {
            float_rotation: [
                phase.cos() / 8.0 * r,
                phase.sin() / 8.0 * r,
                phase.sin() / 20.0 * r,
            ],
            lift: phase.sin() / 10.0 * style.float_intensity,
            mesh_rotation: [tilt, spin(t), 0.0],
            scale,
        }
    }

    /// Apply the pose to a model-space point.
    pub fn transform(&self, p: [f32; 3]) -> [f32; 3] {
        let local = rotate_xyz(self.mesh_rotation, p.map(|c| c * self.scale));
        let [x, y, z] = rotate_xyz(self.float_rotation, local);
        [x, y + self.lift, z]
    }
}

/// Rx * Ry * Rz applied to `p`.
fn rotate_xyz([ax, ay, az]: [f32; 3], [mut x, mut y, mut z]: [f32; 3]) -> [f32; 3] {
    let (s, c) = az.sin_cos();
    (x, y) = (x * c - y * s, x * s + y * c);
    let (s, c) = ay.sin_cos();
    (x, z) = (x * c + z * s, -x * s + z * c);
    let (s, c) = ax.sin_cos();
    (y, z) = (y * c - z * s, y * s + z * c);
    [x, y, z]
}

/// Slow yaw shared by both modes.
pub fn spin(t: f32) -> f32 {
    (t / 8.0).sin() / 4.0
}
