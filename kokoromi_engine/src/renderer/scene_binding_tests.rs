use glam::{Mat4, Vec3};
use crate::renderer::mock_backend::MockBackend;
use crate::renderer::scene_binding::{bind_scene, SceneBindingStats};
use crate::scene::{primitives, Material, Model, Scene};

fn quad_model(name: &str, material_index: usize) -> Model {
    let data = primitives::quad(1.0, Vec3::ONE, material_index);
    Model {
        name: name.to_string(),
        world_transform: Mat4::IDENTITY,
        vertices: data.vertices,
        indices: data.indices,
        meshes: data.meshes,
        gpu: None,
    }
}

fn textured_scene() -> Scene {
    let mut scene = Scene::new();
    let texture = scene.add_texture(primitives::checkerboard("checker", 16, 4, [255; 4], [0, 0, 0, 255]).unwrap());
    let textured = scene.add_material(Material::new("textured", Some(texture)));
    let plain = scene.add_material(Material::new("plain", None));
    scene.add_model(quad_model("a", textured));
    scene.add_model(quad_model("b", plain));
    scene
}

#[test]
fn test_bind_scene_uploads_everything() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = textured_scene();

    let stats = bind_scene(&mut backend, &mut scene).unwrap();

    assert_eq!(stats, SceneBindingStats { textures: 1, materials: 1, models: 2 });
    assert_eq!(backend.uploaded_textures, vec![(16, 16, 5, 16 * 16 * 4)]);
    assert_eq!(backend.uploaded_geometry, vec![(4, 6), (4, 6)]);
}

#[test]
fn test_bind_scene_releases_pixels() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = textured_scene();

    bind_scene(&mut backend, &mut scene).unwrap();

    let texture = &scene.textures[0];
    assert!(texture.pixels.is_none());
    assert!(texture.gpu.is_some());
}

#[test]
fn test_material_set_references_uploaded_texture() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = textured_scene();

    bind_scene(&mut backend, &mut scene).unwrap();

    let texture = scene.textures[0].gpu.unwrap();
    assert_eq!(backend.material_sets, vec![texture]);
    assert!(scene.materials[0].descriptor_set.is_some());
}

#[test]
fn test_material_without_texture_has_no_set() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = textured_scene();

    bind_scene(&mut backend, &mut scene).unwrap();

    assert!(scene.materials[1].descriptor_set.is_none());
}

#[test]
fn test_material_with_dangling_texture_index_is_skipped() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = Scene::new();
    scene.add_material(Material::new("broken", Some(7)));

    let stats = bind_scene(&mut backend, &mut scene).unwrap();

    assert_eq!(stats.materials, 0);
    assert!(backend.material_sets.is_empty());
}

#[test]
fn test_geometry_handles_attached_to_models() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = textured_scene();

    bind_scene(&mut backend, &mut scene).unwrap();

    for model in &scene.models {
        let gpu = model.gpu.unwrap();
        assert_eq!(gpu.index_count, 6);
        assert_ne!(gpu.vertex_buffer, gpu.index_buffer);
    }
}

#[test]
fn test_model_without_indices_is_not_uploaded() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = Scene::new();
    scene.add_model(Model { name: "empty".to_string(), ..Default::default() });

    let stats = bind_scene(&mut backend, &mut scene).unwrap();

    assert_eq!(stats.models, 0);
    assert!(scene.models[0].gpu.is_none());
}

#[test]
fn test_binding_twice_uploads_nothing_new() {
    let mut backend = MockBackend::new(800, 600);
    let mut scene = textured_scene();

    bind_scene(&mut backend, &mut scene).unwrap();
    let stats = bind_scene(&mut backend, &mut scene).unwrap();

    assert_eq!(stats, SceneBindingStats::default());
    assert_eq!(backend.uploaded_textures.len(), 1);
    assert_eq!(backend.uploaded_geometry.len(), 2);
}
