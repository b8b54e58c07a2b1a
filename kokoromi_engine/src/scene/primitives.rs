/// Procedural geometry and textures for demos and tests.

use glam::{Vec2, Vec3};
use crate::error::Result;
use super::scene::{Mesh, Vertex};
use super::scene_node::ModelData;
use super::texture::{Texture, TEXEL_SIZE};

/// Axis-aligned quad in the XY plane facing +Z (4 vertices, 6 indices)
///
/// Winding is counter-clockwise seen from +Z.
pub fn quad(half_size: f32, color: Vec3, material_index: usize) -> ModelData {
    let normal = Vec3::Z;
    let vertices = vec![
        Vertex::new(Vec3::new(-half_size, -half_size, 0.0), color, Vec2::new(0.0, 1.0), normal),
        Vertex::new(Vec3::new(half_size, -half_size, 0.0), color, Vec2::new(1.0, 1.0), normal),
        Vertex::new(Vec3::new(half_size, half_size, 0.0), color, Vec2::new(1.0, 0.0), normal),
        Vertex::new(Vec3::new(-half_size, half_size, 0.0), color, Vec2::new(0.0, 0.0), normal),
    ];
    let indices = vec![0, 1, 2, 2, 3, 0];

    ModelData {
        vertices,
        indices,
        meshes: vec![Mesh { index_offset: 0, triangle_count: 2, material_index }],
    }
}

/// Two-color checkerboard texture
pub fn checkerboard(name: &str, size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Result<Texture> {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity(size as usize * size as usize * TEXEL_SIZE);
    for y in 0..size {
        for x in 0..size {
            let texel = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
            pixels.extend_from_slice(&texel);
        }
    }
    Texture::from_rgba8(name, size, size, pixels)
}
