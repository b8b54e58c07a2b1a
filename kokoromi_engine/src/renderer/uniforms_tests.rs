use std::mem::{offset_of, size_of};
use glam::{Mat4, Vec3};
use crate::renderer::uniforms::{CameraSetup, LightUniform, PushConstants, UniformBufferObject};
use crate::renderer::{Extent, LightingSettings, MAX_LIGHTS};
use crate::scene::{Camera, Light, LightType, Scene};

fn light(name: &str, position: Vec3, inner: f32, outer: f32) -> Light {
    Light {
        name: name.to_string(),
        world_transform: Mat4::from_translation(position),
        light_type: LightType::Spot,
        color: Vec3::new(1.0, 0.0, 0.0),
        intensity: 3.0,
        inner_angle: inner,
        outer_angle: outer,
    }
}

// ============================================================================
// STD140 LAYOUT
// ============================================================================

#[test]
fn test_light_uniform_layout() {
    assert_eq!(size_of::<LightUniform>(), 64);
    assert_eq!(offset_of!(LightUniform, light_type), 12);
    assert_eq!(offset_of!(LightUniform, direction), 16);
    assert_eq!(offset_of!(LightUniform, color), 32);
    assert_eq!(offset_of!(LightUniform, intensity), 44);
    assert_eq!(offset_of!(LightUniform, inner_angle), 48);
    assert_eq!(offset_of!(LightUniform, outer_angle), 52);
}

#[test]
fn test_uniform_buffer_object_layout() {
    assert_eq!(size_of::<UniformBufferObject>(), 768);
    assert_eq!(offset_of!(UniformBufferObject, projection), 64);
    assert_eq!(offset_of!(UniformBufferObject, camera_position), 128);
    assert_eq!(offset_of!(UniformBufferObject, ambient_light_intensity), 140);
    assert_eq!(offset_of!(UniformBufferObject, ambient_light_color), 144);
    assert_eq!(offset_of!(UniformBufferObject, directional_light_intensity), 156);
    assert_eq!(offset_of!(UniformBufferObject, directional_light_color), 160);
    assert_eq!(offset_of!(UniformBufferObject, directional_light_direction), 176);
    assert_eq!(offset_of!(UniformBufferObject, material_color), 192);
    assert_eq!(offset_of!(UniformBufferObject, material_specular_color), 208);
    assert_eq!(offset_of!(UniformBufferObject, material_roughness), 220);
    assert_eq!(offset_of!(UniformBufferObject, light_count), 224);
    assert_eq!(offset_of!(UniformBufferObject, lights), 240);
}

#[test]
fn test_push_constants_is_one_matrix() {
    assert_eq!(size_of::<PushConstants>(), 64);
}

// ============================================================================
// CAMERA
// ============================================================================

#[test]
fn test_default_camera_orbits_origin() {
    let camera = CameraSetup::from_scene(&Scene::new());
    assert_eq!(camera.eye, Vec3::splat(5.0));
    assert_eq!(camera.target, Vec3::ZERO);
    assert_eq!(camera.direction, Vec3::splat(-5.0));
    assert_eq!(camera.field_of_view, 45.0);
}

#[test]
fn test_scene_camera_uses_translation_and_x_axis() {
    let mut scene = Scene::new();
    scene.cameras.push(Camera {
        name: "main".to_string(),
        world_transform: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        field_of_view: 60.0,
    });

    let camera = CameraSetup::from_scene(&scene);
    assert_eq!(camera.eye, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(camera.direction, Vec3::X);
    assert_eq!(camera.target, Vec3::new(2.0, 2.0, 3.0));
    assert_eq!(camera.field_of_view, 60.0);
}

#[test]
fn test_projection_flips_y() {
    let camera = CameraSetup::default();
    let projection = camera.projection(Extent::new(1280, 720));
    assert!(projection.y_axis.y < 0.0);
    assert!(projection.x_axis.x > 0.0);
}

#[test]
fn test_projection_handles_empty_extent() {
    let projection = CameraSetup::default().projection(Extent::new(0, 0));
    assert!(projection.x_axis.x.is_finite());
}

// ============================================================================
// UBO ASSEMBLY
// ============================================================================

#[test]
fn test_build_copies_lighting_settings() {
    let lighting = LightingSettings::default();
    let ubo = UniformBufferObject::build(&Scene::new(), Extent::new(800, 600), &lighting);

    assert_eq!(ubo.ambient_light_color, lighting.ambient_color);
    assert_eq!(ubo.ambient_light_intensity, 0.3);
    assert_eq!(ubo.directional_light_intensity, 0.7);
    assert_eq!(ubo.material_roughness, 0.5);
    assert_eq!(ubo.camera_position, Vec3::splat(5.0));
    assert_eq!(ubo.directional_light_direction, Vec3::splat(-5.0));
    assert_eq!(ubo.light_count, 0);
}

#[test]
fn test_build_converts_light_angles_to_radians() {
    let mut scene = Scene::new();
    scene.lights.push(light("spot", Vec3::new(4.0, 5.0, 6.0), 90.0, 180.0));

    let ubo = UniformBufferObject::build(&scene, Extent::new(800, 600), &LightingSettings::default());

    assert_eq!(ubo.light_count, 1);
    let l = ubo.lights[0];
    assert_eq!(l.position, Vec3::new(4.0, 5.0, 6.0));
    assert_eq!(l.direction, Vec3::new(0.0, 0.0, -1.0));
    assert_eq!(l.light_type, LightType::Spot as i32);
    assert!((l.inner_angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    assert!((l.outer_angle - std::f32::consts::PI).abs() < 1e-6);
}

#[test]
fn test_build_clamps_light_count() {
    let mut scene = Scene::new();
    for i in 0..(MAX_LIGHTS + 3) {
        scene.lights.push(light(&format!("l{}", i), Vec3::splat(i as f32), 10.0, 20.0));
    }

    let ubo = UniformBufferObject::build(&scene, Extent::new(800, 600), &LightingSettings::default());

    assert_eq!(ubo.light_count, MAX_LIGHTS as i32);
    assert_eq!(ubo.lights[MAX_LIGHTS - 1].position, Vec3::splat((MAX_LIGHTS - 1) as f32));
}

#[test]
fn test_ubo_bytes_length() {
    let ubo = UniformBufferObject::build(&Scene::new(), Extent::new(1, 1), &LightingSettings::default());
    assert_eq!(bytemuck::bytes_of(&ubo).len(), 768);
}
