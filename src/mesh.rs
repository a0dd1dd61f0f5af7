//! CPU mesh construction for both geometry kinds.
//!
//! Vertices are plain-old-data so a GPU backend can upload them as-is.

use std::f32::consts::TAU;

use crate::geometry::{
    GeometryDescriptor, GeometryKind, KNOT_P, KNOT_Q, KNOT_RADIUS, KNOT_TUBE, PLANE_SIZE,
};
use crate::texture::Texture;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn from_descriptor(desc: &GeometryDescriptor) -> Self {
        match desc.kind {
            GeometryKind::Demo => torus_knot(
                KNOT_RADIUS,
                KNOT_TUBE,
                desc.segments,
                desc.radial_segments(),
                KNOT_P,
                KNOT_Q,
            ),
            GeometryKind::Displacement => {
                let mut mesh = plane(PLANE_SIZE, PLANE_SIZE, desc.segments, desc.segments);
                displace(&mut mesh, &desc.source_texture, desc.displacement_scale);
                mesh
            }
        }
    }
}

/// Flat grid in the XY plane facing +Z, centred on the origin.
///
/// UV `(0, 1)` is the top-left corner.
pub fn plane(width: f32, height: f32, grid_x: u32, grid_y: u32) -> Mesh {
    let gx = grid_x.max(1);
    let gy = grid_y.max(1);
    let seg_w = width / gx as f32;
    let seg_h = height / gy as f32;

    let mut vertices = Vec::with_capacity(((gx + 1) * (gy + 1)) as usize);
    for iy in 0..=gy {
        let y = iy as f32 * seg_h - height / 2.0;
        for ix in 0..=gx {
            let x = ix as f32 * seg_w - width / 2.0;
            vertices.push(Vertex {
                position: [x, -y, 0.0],
                normal: [0.0, 0.0, 1.0],
                uv: [ix as f32 / gx as f32, 1.0 - iy as f32 / gy as f32],
            });
        }
    }

    let row = gx + 1;
    let mut indices = Vec::with_capacity((gx * gy * 6) as usize);
    for iy in 0..gy {
        for ix in 0..gx {
            let a = ix + row * iy;
            let b = ix + row * (iy + 1);
            let c = ix + 1 + row * (iy + 1);
            let d = ix + 1 + row * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Mesh { vertices, indices }
}

/// (p, q) torus knot swept by a circular tube.
pub fn torus_knot(
    radius: f32,
    tube: f32,
    tubular_segments: u32,
    radial_segments: u32,
    p: u32,
    q: u32,
) -> Mesh {
    let tubular = tubular_segments.max(3);
    let radial = radial_segments.max(3);
    let (p, q) = (p as f32, q as f32);

    let mut vertices = Vec::with_capacity(((tubular + 1) * (radial + 1)) as usize);
    for i in 0..=tubular {
        let u = i as f32 / tubular as f32 * p * TAU;
        let p1 = knot_point(u, p, q, radius);
        let p2 = knot_point(u + 0.01, p, q, radius);

        // Frenet-like frame along the curve.
        let t = sub(p2, p1);
        let n = add(p2, p1);
        let b = normalize(cross(t, n));
        let n = normalize(cross(b, t));

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();
            let position = add(p1, add(scale(n, cx), scale(b, cy)));
            vertices.push(Vertex {
                position,
                normal: normalize(sub(position, p1)),
                uv: [i as f32 / tubular as f32, j as f32 / radial as f32],
            });
        }
    }

    let ring = radial + 1;
    let mut indices = Vec::with_capacity((tubular * radial * 6) as usize);
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = ring * (j - 1) + (i - 1);
            let b = ring * j + (i - 1);
            let c = ring * j + i;
            let d = ring * (j - 1) + i;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Mesh { vertices, indices }
}

fn knot_point(u: f32, p: f32, q: f32, radius: f32) -> [f32; 3] {
    let qu = q / p * u;
    let cs = qu.cos();
    [
        radius * (2.0 + cs) * 0.5 * u.cos(),
        radius * (2.0 + cs) * 0.5 * u.sin(),
        radius * qu.sin() * 0.5,
    ]
}

/// Push every vertex along its normal by the texture's red channel times
/// `amount`.
pub fn displace(mesh: &mut Mesh, texture: &Texture, amount: f32) {
    if amount == 0.0 {
        return;
    }
    for v in &mut mesh.vertices {
        let h = texture.sample_red(v.uv[0], v.uv[1]) * amount;
        v.position = add(v.position, scale(v.normal, h));
    }
}

/// Identity of the mesh a descriptor produces. Wireframe is a material
/// concern and deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MeshKey {
    kind: GeometryKind,
    segments: u32,
    displacement_scale: f32,
    texture_id: u64,
}

impl From<&GeometryDescriptor> for MeshKey {
    fn from(desc: &GeometryDescriptor) -> Self {
        Self {
            kind: desc.kind,
            segments: desc.segments,
            displacement_scale: desc.displacement_scale,
            texture_id: desc.source_texture.id(),
        }
    }
}

/// Rebuilds the mesh only when the descriptor's geometry actually changes.
#[derive(Debug, Default)]
pub struct MeshCache {
    current: Option<(MeshKey, Mesh)>,
    rebuilds: u64,
}

impl MeshCache {
    pub fn get(&mut self, desc: &GeometryDescriptor) -> &Mesh {
        let key = MeshKey::from(desc);
        if self.current.as_ref().is_some_and(|(k, _)| *k != key) {
            self.current = None;
        }
        let rebuilds = &mut self.rebuilds;
        let (_, mesh) = self.current.get_or_insert_with(|| {
            *rebuilds += 1;
            (key, Mesh::from_descriptor(desc))
        });
        mesh
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(a: [f32; 3]) -> [f32; 3] {
    let len = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    if len <= f32::EPSILON {
        return a;
    }
    scale(a, 1.0 / len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::select_geometry;
    use crate::params::ParameterState;
    use image::RgbaImage;

    #[test]
    fn plane_counts_and_extent() {
        let mesh = plane(4.0, 4.0, 10, 10);
        assert_eq!(mesh.vertices.len(), 121);
        assert_eq!(mesh.triangle_count(), 200);
        assert_eq!(mesh.vertices[0].position, [-2.0, 2.0, 0.0]);
        assert_eq!(mesh.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(mesh.vertices[120].position, [2.0, -2.0, 0.0]);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn torus_knot_counts() {
        let mesh = torus_knot(1.0, 0.3, 64, 16, 2, 3);
        assert_eq!(mesh.vertices.len(), 65 * 17);
        assert_eq!(mesh.triangle_count(), 64 * 16 * 2);
        for v in &mesh.vertices {
            let n = v.normal;
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn white_image_lifts_plane_by_scale() {
        let tex = Texture::from_rgba(RgbaImage::from_pixel(8, 8, image::Rgba([255; 4])));
        let mut mesh = plane(4.0, 4.0, 4, 4);
        displace(&mut mesh, &tex, 1.8);
        for v in &mesh.vertices {
            assert!((v.position[2] - 1.8).abs() < 1e-5);
        }
    }

    #[test]
    fn black_image_leaves_plane_flat() {
        let tex = Texture::from_rgba(RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255])));
        let mut mesh = plane(4.0, 4.0, 4, 4);
        displace(&mut mesh, &tex, 3.0);
        assert!(mesh.vertices.iter().all(|v| v.position[2] == 0.0));
    }

    #[test]
    fn demo_descriptor_builds_knot_at_default_quality() {
        let desc = select_geometry(&ParameterState::default());
        let mesh = Mesh::from_descriptor(&desc);
        assert_eq!(mesh.vertices.len(), (243 + 1) * (60 + 1));
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertices.len() * 32);
    }

    #[test]
    fn cache_rebuilds_only_on_geometry_change() {
        let mut params = ParameterState::default();
        let mut cache = MeshCache::default();

        cache.get(&select_geometry(&params));
        cache.get(&select_geometry(&params));
        assert_eq!(cache.rebuilds(), 1);

        params.set_wireframe(true);
        cache.get(&select_geometry(&params));
        assert_eq!(cache.rebuilds(), 1);

        params.set_quality(10);
        cache.get(&select_geometry(&params));
        assert_eq!(cache.rebuilds(), 2);
    }
}
