/*!
# Kokoromi - Vulkan Renderer Backend

Vulkan implementation of the `kokoromi_engine` backend traits.

The crate uses ash for the Vulkan bindings, ash-window for surface creation
and gpu-allocator for memory management. `VulkanRenderer` implements
`FrameBackend` and `SceneUploader`, so it plugs straight into
`kokoromi_engine::kokoromi::Renderer`.

Validation layer support is compiled in with the `vulkan-validation` feature
and switched on at runtime by `RendererConfig::enable_validation`.

```no_run
use kokoromi_engine::kokoromi::Renderer;
use kokoromi_engine::kokoromi::render::RendererConfig;
use kokoromi_engine::kokoromi::scene::Scene;
use kokoromi_renderer_vulkan::kokoromi::VulkanRenderer;

# fn run(window: &winit::window::Window) -> kokoromi_engine::kokoromi::Result<()> {
let backend = VulkanRenderer::new(window, (1280, 720), RendererConfig::default())?;
let mut renderer = Renderer::startup(backend, Scene::default())?;
renderer.frame_update(1.0 / 60.0);
renderer.frame_render()?;
renderer.frame_present()?;
renderer.shutdown()
# }
```
*/

mod debug;
mod vulkan_selection;
mod vulkan_context;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_upload;
mod vulkan_pipeline;
mod vulkan_swapchain;
mod vulkan_frame;
mod vulkan_command_list;
mod vulkan_renderer;

// Main kokoromi namespace module
pub mod kokoromi {
    pub use crate::vulkan_renderer::{OverlayInitInfo, VulkanRenderer};
    pub use crate::vulkan_command_list::CommandList as VulkanCommandList;

    // Validation statistics
    pub use crate::debug::{print_validation_stats_report, validation_stats, ValidationStats};
}
