/// Scene: the imported world as plain data.
///
/// The scene exclusively owns every model, material, texture, camera and light.
/// The renderer only reads it, plus attaches GPU handles (`gpu`,
/// `descriptor_set`) during scene binding.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use crate::renderer::{DescriptorSetHandle, GpuGeometry};
use super::texture::Texture;

/// Interleaved vertex record consumed by the mesh pipeline
///
/// Shader locations: 0 = position, 1 = color, 2 = uv, 3 = normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, color: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self { position, color, uv, normal }
    }
}

/// Index range of a model drawn with one material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mesh {
    /// First index in the model's index buffer
    pub index_offset: u32,
    pub triangle_count: u32,
    /// Index into `Scene::materials`
    pub material_index: usize,
}

impl Mesh {
    pub fn index_count(&self) -> u32 {
        self.triangle_count * 3
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub world_transform: Mat4,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub meshes: Vec<Mesh>,
    /// Device-local vertex/index buffers, set by scene binding
    pub gpu: Option<GpuGeometry>,
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    /// Index into `Scene::textures`
    pub diffuse_texture: Option<usize>,
    /// Set only for materials with an uploaded diffuse texture
    pub descriptor_set: Option<DescriptorSetHandle>,
}

impl Material {
    pub fn new(name: impl Into<String>, diffuse_texture: Option<usize>) -> Self {
        Self { name: name.into(), diffuse_texture, descriptor_set: None }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    /// Column 3 is the eye position, column 0 the viewing direction
    pub world_transform: Mat4,
    /// Vertical field of view in degrees
    pub field_of_view: f32,
}

/// Light categories; the discriminant is what the shader sees
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    #[default]
    Directional = 0,
    Point = 1,
    Spot = 2,
    Area = 3,
    Unknown = 4,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub world_transform: Mat4,
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    /// Spot cone angles in degrees
    pub inner_angle: f32,
    pub outer_angle: f32,
}

/// Imported scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub models: Vec<Model>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a texture and return its index
    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    /// Add a material and return its index
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }

    /// Material drawn by `mesh`, if the index is in range
    pub fn material_for(&self, mesh: &Mesh) -> Option<&Material> {
        self.materials.get(mesh.material_index)
    }

    /// The camera used for rendering (the first one)
    pub fn active_camera(&self) -> Option<&Camera> {
        self.cameras.first()
    }

    /// Total triangle count over every mesh
    pub fn triangle_count(&self) -> u64 {
        self.models
            .iter()
            .flat_map(|m| m.meshes.iter())
            .map(|mesh| mesh.triangle_count as u64)
            .sum()
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
