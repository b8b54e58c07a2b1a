//! Scene module
//!
//! Plain-data scene model consumed by the renderer, the tagged-node import
//! model that produces it, and a few procedural helpers.

mod scene;
mod scene_node;
mod texture;
pub mod primitives;

pub use scene::{Camera, Light, LightType, Material, Mesh, Model, Scene, Vertex};
pub use scene_node::{LightData, ModelData, NodeKind, SceneImport, SceneNode, SceneVisitor};
pub use texture::{mip_level_count, Texture, TEXEL_SIZE};
