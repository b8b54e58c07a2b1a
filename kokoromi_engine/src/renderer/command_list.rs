/// CommandList trait - for recording one frame slot's rendering commands

use bitflags::bitflags;
use crate::error::Result;
use super::backend::{BufferHandle, DescriptorSetHandle};

bitflags! {
    /// Shader stages a push-constant range is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0b01;
        const FRAGMENT = 0b10;
        const ALL_GRAPHICS = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Index element size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Command list for recording rendering commands
///
/// One command list exists per frame slot. The mesh pipeline, render pass and
/// framebuffers are owned by the backend; the command list only selects among
/// them (by swapchain image index) and records draw state.
pub trait CommandList: Send + Sync {
    /// Begin recording (one-time submit)
    fn begin(&mut self) -> Result<()>;

    /// End recording
    fn end(&mut self) -> Result<()>;

    /// Write `data` into `buffer` at `offset` from within the command stream
    ///
    /// Must be recorded outside a render pass. The write is made visible to
    /// uniform reads of subsequent draws in the same submission.
    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Begin the mesh render pass on the framebuffer of swapchain image `image_index`
    ///
    /// # Arguments
    ///
    /// * `image_index` - Index returned by the acquire step
    /// * `clear_values` - Color clear followed by depth/stencil clear
    fn begin_render_pass(&mut self, image_index: u32, clear_values: &[ClearValue]) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Bind the mesh graphics pipeline
    fn bind_pipeline(&mut self) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType) -> Result<()>;

    /// Push constants to the pipeline layout
    ///
    /// # Arguments
    ///
    /// * `stages` - Shader stages that will access the push constants
    /// * `offset` - Offset in bytes into push constant range
    /// * `data` - Data to push
    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()>;

    /// Bind a descriptor set at `set_index` of the pipeline layout
    ///
    /// `dynamic_offsets` supplies one offset per dynamic uniform binding of the set.
    fn bind_descriptor_set(
        &mut self,
        set_index: u32,
        set: DescriptorSetHandle,
        dynamic_offsets: &[u32],
    ) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;
}
