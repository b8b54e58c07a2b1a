/// CommandList - Vulkan implementation of the CommandList trait
///
/// Wraps one frame slot's command buffer. Handles coming through the trait
/// are raw Vulkan handles; render pass, framebuffers and pipeline come from
/// the current swapchain generation (`RenderTarget`).

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::kokoromi::render::{
    BufferHandle, ClearValue, CommandList as RendererCommandList, DescriptorSetHandle, IndexType,
    ShaderStageFlags,
};
use kokoromi_engine::engine_err;
use ash::vk;
use ash::vk::Handle;

/// Largest payload `vkCmdUpdateBuffer` accepts
const MAX_INLINE_UPDATE: usize = 65536;

/// Raw handles of one swapchain generation, refreshed after every recreation
#[derive(Debug, Clone, Default)]
pub struct RenderTarget {
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,
    pub extent: vk::Extent2D,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
}

/// Vulkan command list of one frame slot
pub struct CommandList {
    device: ash::Device,
    command_buffer: vk::CommandBuffer,
    target: RenderTarget,
    is_recording: bool,
    in_render_pass: bool,
}

impl CommandList {
    pub fn new(device: ash::Device, command_buffer: vk::CommandBuffer) -> Self {
        Self {
            device,
            command_buffer,
            target: RenderTarget::default(),
            is_recording: false,
            in_render_pass: false,
        }
    }

    /// Get the underlying Vulkan command buffer (for overlays recording directly)
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub(crate) fn set_target(&mut self, target: RenderTarget) {
        self.target = target;
    }

    fn ensure_recording(&self) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(Error::BackendError("Command list not recording".to_string()))
        }
    }
}

fn stage_flags(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStageFlags::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

fn clear_value(value: &ClearValue) -> vk::ClearValue {
    match *value {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

impl RendererCommandList for CommandList {
    /// Start a fresh recording; a recording left unfinished by a failed frame is discarded
    fn begin(&mut self) -> Result<()> {
        self.is_recording = false;
        self.in_render_pass = false;

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Cannot end command list inside a render pass".to_string()));
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to end command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Buffer updates must be recorded outside a render pass".to_string()));
        }
        if data.is_empty() || data.len() % 4 != 0 || offset % 4 != 0 || data.len() > MAX_INLINE_UPDATE {
            return Err(Error::InvalidResource(format!(
                "Inline buffer update of {} bytes at {} is not 4-byte aligned or exceeds {} bytes",
                data.len(),
                offset,
                MAX_INLINE_UPDATE
            )));
        }

        let buffer = vk::Buffer::from_raw(buffer.0);
        unsafe {
            self.device.cmd_update_buffer(self.command_buffer, buffer, offset, data);

            let barrier = vk::BufferMemoryBarrier::default()
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::UNIFORM_READ)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .buffer(buffer)
                .offset(offset)
                .size(data.len() as u64);
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[barrier],
                &[],
            );
        }
        Ok(())
    }

    fn begin_render_pass(&mut self, image_index: u32, clear_values: &[ClearValue]) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass already active".to_string()));
        }
        let framebuffer = *self.target.framebuffers.get(image_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!(
                "Swapchain image {} has no framebuffer ({} available)",
                image_index,
                self.target.framebuffers.len()
            ))
        })?;

        let clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value).collect();
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.target.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.target.extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::BackendError("No active render pass".to_string()));
        }

        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }

        self.in_render_pass = false;
        Ok(())
    }

    fn bind_pipeline(&mut self) -> Result<()> {
        self.ensure_recording()?;
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.target.pipeline,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, offset: u64) -> Result<()> {
        self.ensure_recording()?;
        unsafe {
            self.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk::Buffer::from_raw(buffer.0)],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType) -> Result<()> {
        self.ensure_recording()?;
        let vk_index_type = match index_type {
            IndexType::U16 => vk::IndexType::UINT16,
            IndexType::U32 => vk::IndexType::UINT32,
        };
        unsafe {
            self.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk::Buffer::from_raw(buffer.0),
                offset,
                vk_index_type,
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.ensure_recording()?;
        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                self.target.pipeline_layout,
                stage_flags(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        set_index: u32,
        set: DescriptorSetHandle,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.ensure_recording()?;
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.target.pipeline_layout,
                set_index,
                &[vk::DescriptorSet::from_raw(set.0)],
                dynamic_offsets,
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::BackendError("Draw recorded outside a render pass".to_string()));
        }
        unsafe {
            self.device
                .cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "vulkan_command_list_tests.rs"]
mod tests;
