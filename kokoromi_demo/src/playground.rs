/// Playground scene: textured quad, untextured quad, camera and a point light

use kokoromi_engine::glam::{Mat4, Vec3};
use kokoromi_engine::kokoromi::Result;
use kokoromi_engine::kokoromi::scene::{
    primitives, LightData, LightType, Material, NodeKind, Scene, SceneImport, SceneNode, Texture,
};
use std::path::Path;

const CAMERA_EYE: Vec3 = Vec3::new(0.0, -6.0, 4.0);

/// Camera transform whose first column is the viewing direction toward `target`
fn camera_transform(eye: Vec3, target: Vec3) -> Mat4 {
    let direction = (target - eye).normalize();
    let side = direction.cross(Vec3::Z).normalize();
    let up = side.cross(direction);
    Mat4::from_cols(direction.extend(0.0), up.extend(0.0), side.extend(0.0), eye.extend(1.0))
}

/// Build the scene; `texture` replaces the procedural checkerboard
pub fn build_scene(texture: Option<&Path>) -> Result<Scene> {
    let diffuse = match texture {
        Some(path) => Texture::load(path)?,
        None => primitives::checkerboard("checkerboard", 256, 8, [235, 235, 235, 255], [45, 52, 64, 255])?,
    };

    let root = SceneNode::group("playground")
        .with_child(SceneNode::new(
            "textured_quad",
            Mat4::from_translation(Vec3::new(-1.25, 0.0, 0.0)),
            NodeKind::Model(primitives::quad(1.0, Vec3::ONE, 0)),
        ))
        .with_child(SceneNode::new(
            "plain_quad",
            Mat4::from_translation(Vec3::new(1.25, 0.0, 0.0)),
            NodeKind::Model(primitives::quad(1.0, Vec3::new(0.9, 0.35, 0.2), 1)),
        ))
        .with_child(SceneNode::new(
            "camera",
            camera_transform(CAMERA_EYE, Vec3::ZERO),
            NodeKind::Camera { field_of_view: 45.0 },
        ))
        .with_child(SceneNode::new(
            "lamp",
            Mat4::from_translation(Vec3::new(0.0, -2.0, 3.0)),
            NodeKind::Light(LightData {
                light_type: LightType::Point,
                color: Vec3::new(1.0, 0.95, 0.85),
                intensity: 1.0,
                inner_angle: 0.0,
                outer_angle: 0.0,
            }),
        ));

    Ok(Scene::from_import(SceneImport {
        root,
        materials: vec![Material::new("diffuse", Some(0)), Material::new("plain", None)],
        textures: vec![diffuse],
    }))
}
