/// Renderer module - backend traits, frame protocol and scene binding

mod config;
mod backend;
mod command_list;
mod overlay;
mod uniforms;
mod scene_binding;
mod scene_recorder;
mod frame_scheduler;
mod renderer;

#[cfg(test)]
pub(crate) mod mock_backend;

pub use config::{
    DebugSeverity, FrameSettings, LightingSettings, RendererConfig,
    MAX_FRAMES_IN_FLIGHT, MAX_LIGHTS,
};
pub use backend::{
    AcquireOutcome, BufferHandle, DescriptorSetHandle, Extent, FrameBackend,
    GpuGeometry, PresentOutcome, SceneUploader, TextureHandle,
};
pub use command_list::{ClearValue, CommandList, IndexType, ShaderStageFlags};
pub use overlay::Overlay;
pub use uniforms::{
    CameraSetup, LightUniform, PushConstants, UniformBufferObject,
    FAR_PLANE, NEAR_PLANE, UP,
};
pub use scene_binding::{bind_scene, SceneBindingStats};
pub use scene_recorder::{record_scene, DrawStats};
pub use frame_scheduler::{FrameScheduler, FrameTicket, SlotState};
pub use renderer::{FrameStatus, Renderer};
