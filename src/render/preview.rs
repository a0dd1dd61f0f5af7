//! Headless point-splat renderer.
//!
//! Projects every mesh vertex through the scene camera into an RGBA canvas
//! with a depth buffer. Good enough to preview and export a sculpture on a
//! machine without a GPU.

use std::time::Duration;

use anyhow::{Result, ensure};
use image::{Rgba, RgbaImage};

use super::Renderer;
use crate::animation::Pose;
use crate::config::MAX_CAPTURE_DIM;
use crate::geometry::Material;
use crate::mesh::MeshCache;
use crate::scene::{BACKGROUND, CAMERA_FOV_DEG, CAMERA_POSITION, fog_factor};
use crate::session::FrameInput;

const NEAR_PLANE: f32 = 0.1;

pub struct PreviewRenderer {
    canvas: RgbaImage,
    depth: Vec<f32>,
    meshes: MeshCache,
    frames: u64,
}

impl PreviewRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(width > 0 && height > 0, "preview size must be non-zero");
        ensure!(
            width <= MAX_CAPTURE_DIM && height <= MAX_CAPTURE_DIM,
            "preview size {width}x{height} exceeds {MAX_CAPTURE_DIM}"
        );
        Ok(Self {
            canvas: RgbaImage::new(width, height),
            depth: vec![f32::INFINITY; width as usize * height as usize],
            meshes: MeshCache::default(),
            frames: 0,
        })
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    fn clear(&mut self) {
        let [r, g, b] = BACKGROUND;
        for px in self.canvas.pixels_mut() {
            *px = Rgba([r, g, b, 255]);
        }
        self.depth.fill(f32::INFINITY);
    }

    fn splat(&mut self, x: i64, y: i64, radius: i64, depth: f32, color: [u8; 3]) {
        let (w, h) = (self.canvas.width() as i64, self.canvas.height() as i64);
        for py in (y - radius)..=(y + radius) {
            for px in (x - radius)..=(x + radius) {
                if px < 0 || py < 0 || px >= w || py >= h {
                    continue;
                }
                let idx = (py * w + px) as usize;
                if depth < self.depth[idx] {
                    self.depth[idx] = depth;
                    let [r, g, b] = color;
                    self.canvas.put_pixel(px as u32, py as u32, Rgba([r, g, b, 255]));
                }
            }
        }
    }
}

impl Renderer for PreviewRenderer {
    fn draw(&mut self, input: &FrameInput, elapsed: Duration) -> Result<()> {
        self.clear();

        let geometry = &input.geometry;
        let pose = Pose::at(geometry.kind, elapsed);
        let material = geometry.material();
        let (w, h) = (self.canvas.width() as f32, self.canvas.height() as f32);
        let aspect = w / h;
        let focal = 1.0 / (CAMERA_FOV_DEG.to_radians() / 2.0).tan();
        let radius = if input.wireframe { 0 } else { 1 };

        // Project first so the mesh borrow ends before splatting.
        let points: Vec<(i64, i64, f32, [u8; 3])> = self
            .meshes
            .get(geometry)
            .vertices
            .iter()
            .filter_map(|v| {
                let [x, y, z] = pose.transform(v.position);
                let depth = CAMERA_POSITION[2] - z;
                if depth <= NEAR_PLANE {
                    return None;
                }
                let color = shade(&material, geometry, v.uv)?;
                let ndc_x = (x - CAMERA_POSITION[0]) * focal / depth / aspect;
                let ndc_y = (y - CAMERA_POSITION[1]) * focal / depth;
                let sx = ((ndc_x * 0.5 + 0.5) * w) as i64;
                let sy = ((0.5 - ndc_y * 0.5) * h) as i64;
                Some((sx, sy, depth, fogged(color, depth)))
            })
            .collect();

        for (x, y, depth, color) in points {
            self.splat(x, y, radius, depth, color);
        }
        self.frames += 1;
        Ok(())
    }

    fn capture(&self) -> Result<RgbaImage> {
        Ok(self.canvas.clone())
    }
}

fn shade(
    material: &Material,
    geometry: &crate::geometry::GeometryDescriptor,
    uv: [f32; 2],
) -> Option<[f32; 3]> {
    match *material {
        Material::Emissive {
            color,
            emissive_intensity,
            opacity,
        } => {
            let glow = (0.4 + 0.4 * emissive_intensity).min(1.0);
            let bg = BACKGROUND.map(|c| f32::from(c) / 255.0);
            Some([0, 1, 2].map(|i| color[i] * glow * opacity + bg[i] * (1.0 - opacity)))
        }
        Material::Textured { alpha_test, .. } => {
            let [r, g, b, a] = geometry.source_texture.sample_rgba(uv[0], uv[1]);
            if f32::from(a) / 255.0 < alpha_test {
                return None;
            }
            Some([r, g, b].map(|c| f32::from(c) / 255.0))
        }
    }
}

fn fogged(color: [f32; 3], depth: f32) -> [u8; 3] {
    let f = fog_factor(depth);
    let mut out = [0u8; 3];
    for i in 0..3 {
        let bg = f32::from(BACKGROUND[i]) / 255.0;
        let c = color[i] * (1.0 - f) + bg * f;
        out[i] = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterState;
    use crate::session::Session;

    fn lit_pixels(img: &RgbaImage) -> usize {
        img.pixels()
            .filter(|p| p.0[..3] != BACKGROUND[..])
            .count()
    }

    #[test]
    fn demo_knot_is_visible() {
        let session = Session::new(ParameterState::new(20, 1.0, false));
        let mut r = PreviewRenderer::new(160, 90).unwrap();
        r.draw(&session.frame_input(), Duration::from_secs(1)).unwrap();
        let frame = r.capture().unwrap();
        assert_eq!(frame.dimensions(), (160, 90));
        assert!(lit_pixels(&frame) > 0);
        assert_eq!(r.frames_drawn(), 1);
    }

    #[test]
    fn transparent_placeholder_draws_nothing() {
        let mut params = ParameterState::default();
        params.set_active_image(crate::texture::Texture::placeholder());
        let session = Session::new(params);
        let mut r = PreviewRenderer::new(64, 64).unwrap();
        r.draw(&session.frame_input(), Duration::ZERO).unwrap();
        assert_eq!(lit_pixels(&r.capture().unwrap()), 0);
    }

    #[test]
    fn rejects_empty_canvas() {
        assert!(PreviewRenderer::new(0, 10).is_err());
        assert!(PreviewRenderer::new(70_000, 70_000).is_err());
    }
}
