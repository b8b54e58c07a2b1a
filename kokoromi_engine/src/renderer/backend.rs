/// Backend traits - what the frame protocol and scene binding need from a GPU API.
///
/// GPU objects cross the trait boundary as opaque handles. The backend owns the
/// objects behind them and destroys them when it is dropped.

use crate::error::Result;
use crate::scene::Vertex;
use super::command_list::CommandList;

/// Opaque buffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Opaque texture handle (image + view + sampler)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Opaque descriptor set handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetHandle(pub u64);

/// Device-local geometry of one model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuGeometry {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

/// Drawable surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, 1.0 for an empty extent
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Result of requesting the next swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is available; `suboptimal` is tolerated until present
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface; nothing was acquired
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Per-frame GPU operations, indexed by frame slot
///
/// Every slot owns one command list, one in-flight fence and the
/// image-acquired / render-complete semaphore pair.
pub trait FrameBackend {
    type CommandList: CommandList;

    /// Current swapchain extent
    fn extent(&self) -> Extent;

    /// Uniform buffer holding one `UniformBufferObject` per frame slot
    fn uniform_buffer(&self) -> BufferHandle;

    /// Distance in bytes between two slots' uniform blocks
    fn uniform_stride(&self) -> u64;

    /// Block until the GPU finished the previous submission of `slot`
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;

    /// Request the next swapchain image, signaling `slot`'s image-acquired semaphore
    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome>;

    /// Reset `slot`'s fence so the next submission can signal it
    fn reset_slot(&mut self, slot: usize) -> Result<()>;

    /// Command list of `slot`, targeting the current swapchain
    fn command_list(&mut self, slot: usize) -> Result<&mut Self::CommandList>;

    /// Submit `slot`'s command list: wait image-acquired, signal render-complete and the fence
    fn submit(&mut self, slot: usize) -> Result<()>;

    /// Present `image_index` once `slot`'s render-complete semaphore is signaled
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;

    /// Window client-area size used when the surface does not report one
    fn set_surface_size(&mut self, width: u32, height: u32);

    /// Wait for the device, destroy every swapchain-sized resource and build new ones
    fn recreate_swapchain(&mut self) -> Result<()>;

    /// Block until the device is idle
    fn wait_idle(&mut self) -> Result<()>;
}

/// Load-time upload of scene resources
pub trait SceneUploader {
    /// Upload RGBA8 pixels into a sampled, mipmapped texture
    fn upload_texture(&mut self, width: u32, height: u32, mip_levels: u32, pixels: &[u8]) -> Result<TextureHandle>;

    /// Upload a model's vertices and indices into device-local buffers
    fn upload_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<GpuGeometry>;

    /// Allocate a material descriptor set binding the uniform buffer and `texture`
    fn create_material_set(&mut self, texture: TextureHandle) -> Result<DescriptorSetHandle>;
}
