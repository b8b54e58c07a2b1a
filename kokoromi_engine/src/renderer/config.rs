/// Renderer configuration and runtime-editable frame settings

use std::path::PathBuf;
use glam::Vec3;

/// Number of frame slots recorded/submitted concurrently
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Number of scene lights visible to the shaders
pub const MAX_LIGHTS: usize = 8;

/// Which validation messages reach the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Startup configuration of a renderer backend
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable the validation layers (only effective when the backend was
    /// compiled with validation support)
    pub enable_validation: bool,

    /// Validation message filter
    pub validation_severity: DebugSeverity,

    /// Application name reported to the driver
    pub app_name: String,

    /// Application version reported to the driver
    pub app_version: u32,

    /// Precompiled SPIR-V vertex shader
    pub vertex_shader_path: PathBuf,

    /// Precompiled SPIR-V fragment shader
    pub fragment_shader_path: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            validation_severity: DebugSeverity::ErrorsAndWarnings,
            app_name: "Kokoromi Application".to_string(),
            app_version: 1,
            vertex_shader_path: PathBuf::from("data/shaders/shader.vert.spv"),
            fragment_shader_path: PathBuf::from("data/shaders/shader.frag.spv"),
        }
    }
}

/// Lighting and material parameters shared by every draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingSettings {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub directional_color: Vec3,
    pub directional_intensity: f32,
    pub material_color: Vec3,
    pub material_specular_color: Vec3,
    pub material_roughness: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            ambient_color: Vec3::new(0.13, 0.17, 0.19),
            ambient_intensity: 0.3,
            directional_color: Vec3::new(1.0, 239.0 / 255.0, 230.0 / 255.0),
            directional_intensity: 0.7,
            material_color: Vec3::ONE,
            material_specular_color: Vec3::splat(0.3),
            material_roughness: 0.5,
        }
    }
}

/// Per-frame parameters the application (or its overlay) may edit between frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    /// Color attachment clear value
    pub background_color: [f32; 4],
    pub lighting: LightingSettings,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            background_color: [0.0, 0.0, 0.0, 1.0],
            lighting: LightingSettings::default(),
        }
    }
}
