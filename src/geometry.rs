//! Mesh selection: derives what the renderer should draw from the current
//! parameters. Nothing here is stored; descriptors are recomputed whenever
//! they are needed so they cannot drift from the parameters.

use std::f32::consts::PI;

use crate::params::ParameterState;
use crate::tessellation;
use crate::texture::Texture;

/// Side length of the displacement plane in world units.
pub const PLANE_SIZE: f32 = 4.0;
/// Depth exaggeration applied on top of the user intensity.
pub const DISPLACEMENT_EXAGGERATION: f32 = 1.5;
/// Fixed rotation about X that tips the plane towards the camera.
pub const PLANE_TILT_X: f32 = -PI / 6.0;

pub const KNOT_RADIUS: f32 = 1.0;
pub const KNOT_TUBE: f32 = 0.3;
pub const KNOT_P: u32 = 2;
pub const KNOT_Q: u32 = 3;
pub const KNOT_SCALE: f32 = 1.5;

/// `#00F0FF`
pub const DEMO_COLOR: [f32; 3] = [0.0, 240.0 / 255.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Demo,
    Displacement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryDescriptor {
    pub kind: GeometryKind,
    pub segments: u32,
    pub displacement_scale: f32,
    pub wireframe: bool,
    pub source_texture: Texture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Flat emissive colour used by the demo knot.
    Emissive {
        color: [f32; 3],
        emissive_intensity: f32,
        opacity: f32,
    },
    /// Image-mapped surface used by the displacement plane.
    Textured {
        metalness: f32,
        roughness: f32,
        alpha_test: f32,
        double_sided: bool,
    },
}

impl GeometryDescriptor {
    /// Tube resolution of the demo knot.
    pub fn radial_segments(&self) -> u32 {
        self.segments / 4
    }

    pub fn material(&self) -> Material {
        match self.kind {
            GeometryKind::Demo => Material::Emissive {
                color: DEMO_COLOR,
                emissive_intensity: if self.wireframe { 1.5 } else { 0.2 },
                opacity: 0.8,
            },
            GeometryKind::Displacement => Material::Textured {
                metalness: 0.4,
                roughness: 0.3,
                alpha_test: 0.05,
                double_sided: true,
            },
        }
    }
}

pub fn displacement_scale(intensity: f32) -> f32 {
    intensity * DISPLACEMENT_EXAGGERATION
}

pub fn select_geometry(params: &ParameterState) -> GeometryDescriptor {
    let segments = tessellation::segments(params.quality());
    match params.active_image() {
        None => GeometryDescriptor {
            kind: GeometryKind::Demo,
            segments,
            displacement_scale: 0.0,
            wireframe: params.wireframe(),
            source_texture: Texture::placeholder(),
        },
        Some(image) => {
            let source_texture = if image.is_drawable() {
                image.clone()
            } else {
                Texture::placeholder()
            };
            GeometryDescriptor {
                kind: GeometryKind::Displacement,
                segments,
                displacement_scale: displacement_scale(params.intensity()),
                wireframe: params.wireframe(),
                source_texture,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn with_image(img: RgbaImage) -> ParameterState {
        let mut p = ParameterState::default();
        p.set_active_image(Texture::from_rgba(img));
        p
    }

    #[test]
    fn demo_without_image_regardless_of_edits() {
        let mut p = ParameterState::default();
        for q in [1, 37, 80, 100] {
            for i in [0.0, 1.2, 3.0] {
                p.set_quality(q);
                p.set_intensity(i);
                let g = select_geometry(&p);
                assert_eq!(g.kind, GeometryKind::Demo);
                assert!(g.source_texture.is_placeholder());
            }
        }
    }

    #[test]
    fn demo_uses_quarter_segments_for_tube() {
        let mut p = ParameterState::default();
        p.set_quality(1);
        let g = select_geometry(&p);
        assert_eq!(g.segments, 66);
        assert_eq!(g.radial_segments(), 16);
    }

    #[test]
    fn displacement_scale_is_intensity_times_one_and_a_half() {
        let mut p = with_image(RgbaImage::new(4, 4));
        for step in 0..=30 {
            let intensity = step as f32 / 10.0;
            p.set_intensity(intensity);
            let g = select_geometry(&p);
            assert_eq!(g.kind, GeometryKind::Displacement);
            assert_eq!(g.displacement_scale, p.intensity() * 1.5);
        }
    }

    #[test]
    fn undrawable_image_falls_back_to_placeholder() {
        let p = with_image(RgbaImage::new(0, 0));
        let g = select_geometry(&p);
        assert_eq!(g.kind, GeometryKind::Displacement);
        assert!(g.source_texture.is_placeholder());
    }

    #[test]
    fn wireframe_changes_demo_emissive_only() {
        let mut p = ParameterState::default();
        let solid = select_geometry(&p);
        p.set_wireframe(true);
        let wire = select_geometry(&p);
        assert_eq!(solid.segments, wire.segments);
        assert_eq!(solid.kind, wire.kind);
        match (solid.material(), wire.material()) {
            (
                Material::Emissive {
                    emissive_intensity: a,
                    ..
                },
                Material::Emissive {
                    emissive_intensity: b,
                    ..
                },
            ) => {
                assert!((a - 0.2).abs() < f32::EPSILON);
                assert!((b - 1.5).abs() < f32::EPSILON);
            }
            other => panic!("expected emissive materials, got {other:?}"),
        }
    }
}
