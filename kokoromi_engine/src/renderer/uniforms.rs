/// Shader-visible data blocks: the per-frame uniform buffer and the per-draw push constant.
///
/// Both structs mirror the GLSL declarations byte for byte (std140 for the
/// uniform block), so they are uploaded with `bytemuck::bytes_of`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use crate::scene::Scene;
use super::backend::Extent;
use super::config::{LightingSettings, MAX_LIGHTS};

/// Near clip plane distance
pub const NEAR_PLANE: f32 = 0.01;

/// Far clip plane distance
pub const FAR_PLANE: f32 = 1000.0;

/// World up axis
pub const UP: Vec3 = Vec3::Z;

/// One light as seen by the fragment shader (64 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position: Vec3,
    pub light_type: i32,
    pub direction: Vec3,
    pub range: f32,
    pub color: Vec3,
    pub intensity: f32,
    /// Radians
    pub inner_angle: f32,
    /// Radians
    pub outer_angle: f32,
    _padding: [f32; 2],
}

/// Per-frame uniform block (std140, 768 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub ambient_light_intensity: f32,
    pub ambient_light_color: Vec3,
    pub directional_light_intensity: f32,
    pub directional_light_color: Vec3,
    _pad0: f32,
    pub directional_light_direction: Vec3,
    _pad1: f32,
    pub material_color: Vec3,
    _pad2: f32,
    pub material_specular_color: Vec3,
    pub material_roughness: f32,
    pub light_count: i32,
    _pad3: [i32; 3],
    pub lights: [LightUniform; MAX_LIGHTS],
    _pad4: [f32; 4],
}

/// Per-draw push constant: the model's world matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PushConstants {
    pub model: Mat4,
}

/// Resolved viewpoint for a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSetup {
    pub eye: Vec3,
    pub target: Vec3,
    /// Not normalized
    pub direction: Vec3,
    /// Degrees
    pub field_of_view: f32,
}

impl Default for CameraSetup {
    fn default() -> Self {
        let eye = Vec3::splat(5.0);
        let target = Vec3::ZERO;
        Self { eye, target, direction: target - eye, field_of_view: 45.0 }
    }
}

impl CameraSetup {
    /// Viewpoint of the scene's first camera, or the default orbit position
    ///
    /// A camera looks along the X axis of its world transform.
    pub fn from_scene(scene: &Scene) -> Self {
        match scene.active_camera() {
            Some(camera) => {
                let eye = camera.world_transform.w_axis.truncate();
                let direction = camera.world_transform.x_axis.truncate();
                Self {
                    eye,
                    target: eye + direction,
                    direction,
                    field_of_view: camera.field_of_view,
                }
            }
            None => Self::default(),
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, UP)
    }

    /// Perspective projection with the Y axis flipped for Vulkan clip space
    pub fn projection(&self, extent: Extent) -> Mat4 {
        let mut projection = Mat4::perspective_rh(
            self.field_of_view.to_radians(),
            extent.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        );
        projection.y_axis.y *= -1.0;
        projection
    }
}

impl UniformBufferObject {
    /// Assemble this frame's uniform block
    ///
    /// The directional light shines along the camera direction. Lights beyond
    /// `MAX_LIGHTS` are ignored.
    pub fn build(scene: &Scene, extent: Extent, lighting: &LightingSettings) -> Self {
        let camera = CameraSetup::from_scene(scene);

        let mut ubo = Self::zeroed();
        ubo.view = camera.view();
        ubo.projection = camera.projection(extent);
        ubo.camera_position = camera.eye;

        ubo.ambient_light_color = lighting.ambient_color;
        ubo.ambient_light_intensity = lighting.ambient_intensity;

        ubo.directional_light_color = lighting.directional_color;
        ubo.directional_light_intensity = lighting.directional_intensity;
        ubo.directional_light_direction = camera.direction;

        ubo.material_color = lighting.material_color;
        ubo.material_specular_color = lighting.material_specular_color;
        ubo.material_roughness = lighting.material_roughness;

        let count = scene.lights.len().min(MAX_LIGHTS);
        ubo.light_count = count as i32;
        for (slot, light) in ubo.lights.iter_mut().zip(scene.lights.iter()) {
            *slot = LightUniform {
                position: light.world_transform.w_axis.truncate(),
                light_type: light.light_type as i32,
                direction: Vec3::NEG_Z,
                range: 0.0,
                color: light.color,
                intensity: light.intensity,
                inner_angle: light.inner_angle.to_radians(),
                outer_angle: light.outer_angle.to_radians(),
                _padding: [0.0; 2],
            };
        }

        ubo
    }
}

#[cfg(test)]
#[path = "uniforms_tests.rs"]
mod tests;
