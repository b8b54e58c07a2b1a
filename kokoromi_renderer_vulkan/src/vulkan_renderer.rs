/// VulkanRenderer - Vulkan implementation of `FrameBackend` and `SceneUploader`
///
/// Owns the device context, the frame ring, the current swapchain generation
/// and every uploaded resource. Handles handed out through the traits are raw
/// Vulkan handles (buffers, descriptor sets) or indices into the texture list.

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::kokoromi::render::{
    AcquireOutcome, BufferHandle, DescriptorSetHandle, Extent, FrameBackend, GpuGeometry,
    PresentOutcome, RendererConfig, SceneUploader, TextureHandle, UniformBufferObject,
    MAX_FRAMES_IN_FLIGHT,
};
use kokoromi_engine::kokoromi::scene::Vertex;
use kokoromi_engine::{engine_debug, engine_err, engine_info};
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::{CommandList, RenderTarget};
use crate::vulkan_context::DeviceContext;
use crate::vulkan_frame::FrameRing;
use crate::vulkan_pipeline::{DescriptorLayouts, DescriptorPool, ShaderBlobs};
use crate::vulkan_selection::align_up;
use crate::vulkan_swapchain::{surface_extent, SwapchainResources};
use crate::vulkan_texture::Texture;
use crate::vulkan_upload::{upload_buffer, upload_texture};

/// What an immediate-mode UI backend needs to initialize against this renderer
///
/// `render_pass` and `image_count` belong to the current swapchain generation.
#[derive(Clone)]
pub struct OverlayInitInfo {
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub queue_family: u32,
    pub queue: vk::Queue,
    pub descriptor_pool: vk::DescriptorPool,
    pub render_pass: vk::RenderPass,
    pub image_count: u32,
}

/// Vulkan renderer backend
///
/// Fields drop top to bottom after `Drop::drop` idled the device; the
/// context goes last.
pub struct VulkanRenderer {
    command_lists: Vec<CommandList>,
    frames: FrameRing,
    swapchain: Option<SwapchainResources>,

    descriptor_pool: DescriptorPool,
    textures: Vec<Texture>,
    geometry_buffers: Vec<Buffer>,

    /// One `UniformBufferObject` per frame slot, `uniform_stride` apart
    uniform_buffer: Buffer,
    uniform_stride: u64,

    layouts: DescriptorLayouts,
    shaders: ShaderBlobs,

    /// Window client size in pixels, used when the surface leaves the extent open
    surface_size: (u32, u32),

    ctx: Arc<DeviceContext>,
}

impl VulkanRenderer {
    /// Create the renderer for `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Window to present to
    /// * `window_size` - Client area size in pixels
    /// * `config` - Validation, application info and shader paths
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        window_size: (u32, u32),
        config: RendererConfig,
    ) -> Result<Self> {
        let shaders = ShaderBlobs::load(&config)?;
        let ctx = DeviceContext::new(window, &config)?;

        let layouts = DescriptorLayouts::new(ctx.clone())?;
        let descriptor_pool = DescriptorPool::new(ctx.clone())?;

        let uniform_stride = align_up(
            std::mem::size_of::<UniformBufferObject>() as u64,
            ctx.properties.limits.min_uniform_buffer_offset_alignment,
        );
        let uniform_buffer = Buffer::new(
            ctx.clone(),
            "uniforms",
            uniform_stride * MAX_FRAMES_IN_FLIGHT as u64,
            vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        )?;

        let frames = FrameRing::new(ctx.clone(), MAX_FRAMES_IN_FLIGHT)?;
        let swapchain = SwapchainResources::new(&ctx, window_size, &shaders, &layouts)?;

        let mut command_lists = Vec::with_capacity(frames.slot_count());
        for slot in 0..frames.slot_count() {
            command_lists.push(CommandList::new(ctx.device.clone(), frames.slot(slot)?.command_buffer));
        }

        let mut renderer = Self {
            command_lists,
            frames,
            swapchain: Some(swapchain),
            descriptor_pool,
            textures: Vec::new(),
            geometry_buffers: Vec::new(),
            uniform_buffer,
            uniform_stride,
            layouts,
            shaders,
            surface_size: window_size,
            ctx,
        };
        renderer.refresh_targets()?;

        engine_info!(
            "kokoromi::vulkan",
            "Vulkan renderer ready: {} frame slots, uniform stride {} bytes",
            MAX_FRAMES_IN_FLIGHT,
            uniform_stride
        );
        Ok(renderer)
    }

    fn swapchain(&self) -> Result<&SwapchainResources> {
        self.swapchain
            .as_ref()
            .ok_or_else(|| Error::BackendError("No swapchain".to_string()))
    }

    /// Point every command list at the current swapchain generation
    fn refresh_targets(&mut self) -> Result<()> {
        let swapchain = self.swapchain()?;
        let target = RenderTarget {
            render_pass: swapchain.pipeline.render_pass,
            framebuffers: swapchain.framebuffers.framebuffers.clone(),
            extent: swapchain.images.extent,
            pipeline: swapchain.pipeline.pipeline,
            pipeline_layout: swapchain.pipeline.layout,
        };
        for command_list in &mut self.command_lists {
            command_list.set_target(target.clone());
        }
        Ok(())
    }

    /// Handles an overlay backend needs for its own initialization
    pub fn overlay_init_info(&self) -> Result<OverlayInitInfo> {
        let swapchain = self.swapchain()?;
        Ok(OverlayInitInfo {
            instance: self.ctx.instance.clone(),
            physical_device: self.ctx.physical_device,
            device: self.ctx.device.clone(),
            queue_family: self.ctx.queue_families.graphics,
            queue: self.ctx.graphics_queue,
            descriptor_pool: self.descriptor_pool.pool,
            render_pass: swapchain.pipeline.render_pass,
            image_count: swapchain.image_count() as u32,
        })
    }

    /// Number of textures uploaded so far
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Color format of the current swapchain images
    pub fn swapchain_format(&self) -> Result<vk::Format> {
        Ok(self.swapchain()?.images.format)
    }
}

impl FrameBackend for VulkanRenderer {
    type CommandList = CommandList;

    fn extent(&self) -> Extent {
        self.swapchain
            .as_ref()
            .map(SwapchainResources::extent)
            .unwrap_or_default()
    }

    fn uniform_buffer(&self) -> BufferHandle {
        BufferHandle(self.uniform_buffer.buffer.as_raw())
    }

    fn uniform_stride(&self) -> u64 {
        self.uniform_stride
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        self.frames.wait(slot)
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        let semaphore = self.frames.slot(slot)?.image_acquired;
        let swapchain = self.swapchain()?.images.swapchain;

        let result = unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(swapchain, u64::MAX, semaphore, vk::Fence::null())
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(engine_err!("kokoromi::vulkan", "Failed to acquire swapchain image: {:?}", e)),
        }
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        self.frames.reset(slot)
    }

    fn command_list(&mut self, slot: usize) -> Result<&mut CommandList> {
        self.command_lists
            .get_mut(slot)
            .ok_or_else(|| Error::InvalidResource(format!("Frame slot {} out of range", slot)))
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        let frame = self.frames.slot(slot)?;

        let wait_semaphores = [frame.image_acquired];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [frame.command_buffer];
        let signal_semaphores = [frame.render_complete];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], frame.in_flight)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to submit frame: {:?}", e))
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        let wait_semaphores = [self.frames.slot(slot)?.render_complete];
        let swapchains = [self.swapchain()?.images.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.ctx
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info)
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(engine_err!("kokoromi::vulkan", "Failed to present: {:?}", e)),
        }
    }

    fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    fn recreate_swapchain(&mut self) -> Result<()> {
        self.ctx.wait_idle()?;

        let extent = surface_extent(&self.ctx, self.surface_size)?;
        if extent.width == 0 || extent.height == 0 {
            // Keep the current generation until the surface has an area again
            engine_debug!("kokoromi::vulkan", "Surface has zero extent, swapchain kept");
            return Ok(());
        }

        self.swapchain = None;
        self.swapchain = Some(SwapchainResources::new(
            &self.ctx,
            self.surface_size,
            &self.shaders,
            &self.layouts,
        )?);
        self.refresh_targets()
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.ctx.wait_idle()
    }
}

impl SceneUploader for VulkanRenderer {
    fn upload_texture(&mut self, width: u32, height: u32, mip_levels: u32, pixels: &[u8]) -> Result<TextureHandle> {
        let texture = upload_texture(&self.ctx, width, height, mip_levels, pixels)?;
        self.textures.push(texture);
        Ok(TextureHandle((self.textures.len() - 1) as u64))
    }

    fn upload_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<GpuGeometry> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(Error::InvalidResource(format!(
                "Geometry needs vertices and indices ({} vertices, {} indices)",
                vertices.len(),
                indices.len()
            )));
        }

        let vertex_buffer = upload_buffer(
            &self.ctx,
            "vertices",
            bytemuck::cast_slice(vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = upload_buffer(
            &self.ctx,
            "indices",
            bytemuck::cast_slice(indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        let geometry = GpuGeometry {
            vertex_buffer: BufferHandle(vertex_buffer.buffer.as_raw()),
            index_buffer: BufferHandle(index_buffer.buffer.as_raw()),
            index_count: indices.len() as u32,
        };
        self.geometry_buffers.push(vertex_buffer);
        self.geometry_buffers.push(index_buffer);

        Ok(geometry)
    }

    fn create_material_set(&mut self, texture: TextureHandle) -> Result<DescriptorSetHandle> {
        let texture = self
            .textures
            .get(texture.0 as usize)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown texture handle {}", texture.0)))?;

        let set = self.descriptor_pool.allocate_material_set(
            self.layouts.material,
            self.uniform_buffer.buffer,
            std::mem::size_of::<UniformBufferObject>() as u64,
            texture.view(),
            texture.sampler(),
        )?;

        Ok(DescriptorSetHandle(set.as_raw()))
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        self.ctx.wait_idle().ok();
    }
}
