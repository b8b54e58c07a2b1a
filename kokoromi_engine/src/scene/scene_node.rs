/// Scene import model: a tree of tagged nodes flattened into a `Scene`.
///
/// Importers (FBX, glTF, procedural builders) produce a `SceneImport`: a node tree
/// whose nodes are either empty transforms, models, cameras or lights, plus the
/// material and texture tables the models refer to. The tree is walked once with
/// a `SceneVisitor`; world transforms are composed on the way down.

use glam::{Mat4, Vec3};
use super::scene::{Camera, Light, LightType, Material, Mesh, Model, Scene, Vertex};
use super::texture::Texture;

/// Geometry payload of a model node
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub meshes: Vec<Mesh>,
}

/// Payload of a light node
#[derive(Debug, Clone)]
pub struct LightData {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
}

/// What a node carries besides its transform
#[derive(Debug, Clone)]
pub enum NodeKind {
    Empty,
    Model(ModelData),
    Camera { field_of_view: f32 },
    Light(LightData),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub local_transform: Mat4,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, local_transform: Mat4, kind: NodeKind) -> Self {
        Self { name: name.into(), local_transform, kind, children: Vec::new() }
    }

    /// Empty grouping node
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, Mat4::IDENTITY, NodeKind::Empty)
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first walk, parents before children
    pub fn walk<V: SceneVisitor>(&self, parent_world: Mat4, visitor: &mut V) {
        let world = parent_world * self.local_transform;
        match &self.kind {
            NodeKind::Empty => {}
            NodeKind::Model(data) => visitor.visit_model(&self.name, world, data),
            NodeKind::Camera { field_of_view } => visitor.visit_camera(&self.name, world, *field_of_view),
            NodeKind::Light(data) => visitor.visit_light(&self.name, world, data),
        }
        for child in &self.children {
            child.walk(world, visitor);
        }
    }
}

/// Receives every non-empty node with its world transform
pub trait SceneVisitor {
    fn visit_model(&mut self, name: &str, world: Mat4, data: &ModelData);
    fn visit_camera(&mut self, name: &str, world: Mat4, field_of_view: f32);
    fn visit_light(&mut self, name: &str, world: Mat4, data: &LightData);
}

/// Everything an importer hands over
#[derive(Debug, Clone)]
pub struct SceneImport {
    pub root: SceneNode,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
}

/// Visitor that appends nodes to the flat scene lists
struct SceneBuilder<'a> {
    scene: &'a mut Scene,
}

impl SceneVisitor for SceneBuilder<'_> {
    fn visit_model(&mut self, name: &str, world: Mat4, data: &ModelData) {
        self.scene.models.push(Model {
            name: name.to_string(),
            world_transform: world,
            vertices: data.vertices.clone(),
            indices: data.indices.clone(),
            meshes: data.meshes.clone(),
            gpu: None,
        });
    }

    fn visit_camera(&mut self, name: &str, world: Mat4, field_of_view: f32) {
        self.scene.cameras.push(Camera {
            name: name.to_string(),
            world_transform: world,
            field_of_view,
        });
    }

    fn visit_light(&mut self, name: &str, world: Mat4, data: &LightData) {
        self.scene.lights.push(Light {
            name: name.to_string(),
            world_transform: world,
            light_type: data.light_type,
            color: data.color,
            intensity: data.intensity,
            inner_angle: data.inner_angle,
            outer_angle: data.outer_angle,
        });
    }
}

impl Scene {
    /// Flatten an imported node tree into a scene
    pub fn from_import(import: SceneImport) -> Self {
        let mut scene = Scene {
            materials: import.materials,
            textures: import.textures,
            ..Scene::default()
        };
        import.root.walk(Mat4::IDENTITY, &mut SceneBuilder { scene: &mut scene });
        scene
    }
}

#[cfg(test)]
#[path = "scene_node_tests.rs"]
mod tests;
