/// Swapchain - every resource whose size follows the window
///
/// `SwapchainResources` is rebuilt as a whole: the device is idled, the old
/// generation is dropped, then a new one is created from fresh surface queries.

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::kokoromi::render::Extent;
use kokoromi_engine::{engine_error, engine_err, engine_info};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;
use crate::vulkan_pipeline::{DescriptorLayouts, RenderPipeline, ShaderBlobs};
use crate::vulkan_selection::{
    choose_depth_format, choose_extent, choose_image_count, choose_present_mode, choose_sharing_mode,
    choose_surface_format, DEPTH_FORMAT_CANDIDATES,
};
use crate::vulkan_texture::{GpuImage, ImageDesc};
use crate::vulkan_upload::{one_shot, record_layout_transition};

/// Swapchain extent the surface would get for `window_size` right now
pub(crate) fn surface_extent(ctx: &DeviceContext, window_size: (u32, u32)) -> Result<vk::Extent2D> {
    Ok(choose_extent(&ctx.surface_capabilities()?, window_size))
}

// ===== SWAPCHAIN IMAGES =====

/// Swapchain handle with one color view per image
pub struct SwapchainImages {
    ctx: Arc<DeviceContext>,
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) views: Vec<vk::ImageView>,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
}

impl SwapchainImages {
    pub fn new(ctx: Arc<DeviceContext>, window_size: (u32, u32)) -> Result<Self> {
        let capabilities = ctx.surface_capabilities()?;
        let formats = ctx.surface_formats()?;
        let present_modes = ctx.present_modes()?;

        let surface_format = choose_surface_format(&formats).ok_or_else(|| {
            engine_error!("kokoromi::vulkan", "Surface reports no formats");
            Error::InitializationFailed("Surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&capabilities, window_size);
        let image_count = choose_image_count(&capabilities);
        let (sharing_mode, family_indices) =
            choose_sharing_mode(ctx.queue_families.graphics, ctx.queue_families.present);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(ctx.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        unsafe {
            let swapchain = ctx
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create swapchain: {:?}", e))?;

            let mut images = Self {
                ctx,
                swapchain,
                views: Vec::new(),
                format: surface_format.format,
                extent,
            };

            let swapchain_images = images
                .ctx
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to get swapchain images: {:?}", e))?;

            for image in swapchain_images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = images
                    .ctx
                    .device
                    .create_image_view(&view_info, None)
                    .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create swapchain image view: {:?}", e))?;
                images.views.push(view);
            }

            engine_info!(
                "kokoromi::vulkan",
                "Swapchain {}x{}, {} images, {:?}, {:?}",
                extent.width,
                extent.height,
                images.views.len(),
                surface_format.format,
                present_mode
            );

            Ok(images)
        }
    }
}

impl Drop for SwapchainImages {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.views {
                self.ctx.device.destroy_image_view(view, None);
            }
            self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

// ===== DEPTH =====

/// Depth attachment matching the swapchain extent
pub struct DepthAttachment {
    pub(crate) image: GpuImage,
}

impl DepthAttachment {
    pub fn new(ctx: Arc<DeviceContext>, extent: vk::Extent2D) -> Result<Self> {
        let format = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |format| ctx.format_properties(format))
            .ok_or_else(|| {
                engine_error!("kokoromi::vulkan", "No supported depth format");
                Error::InitializationFailed("No supported depth format".to_string())
            })?;

        let image = GpuImage::new(
            ctx.clone(),
            "depth",
            ImageDesc {
                width: extent.width,
                height: extent.height,
                mip_levels: 1,
                format,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                aspect: vk::ImageAspectFlags::DEPTH,
            },
        )?;

        one_shot(&ctx, |cmd| {
            record_layout_transition(
                &ctx.device,
                cmd,
                image.image,
                format,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                0,
                1,
            )
        })?;

        Ok(Self { image })
    }

    pub(crate) fn format(&self) -> vk::Format {
        self.image.desc.format
    }
}

// ===== FRAMEBUFFERS =====

/// One framebuffer per swapchain image: [color view, shared depth view]
pub struct Framebuffers {
    ctx: Arc<DeviceContext>,
    pub(crate) framebuffers: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    pub fn new(
        ctx: Arc<DeviceContext>,
        render_pass: vk::RenderPass,
        color_views: &[vk::ImageView],
        depth_view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let mut framebuffers = Self {
            ctx,
            framebuffers: Vec::with_capacity(color_views.len()),
        };

        for &color_view in color_views {
            let attachments = [color_view, depth_view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer = unsafe {
                framebuffers
                    .ctx
                    .device
                    .create_framebuffer(&framebuffer_info, None)
                    .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create framebuffer: {:?}", e))?
            };
            framebuffers.framebuffers.push(framebuffer);
        }

        Ok(framebuffers)
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }
}

// ===== GENERATION =====

/// One swapchain generation
///
/// Fields drop top to bottom: framebuffers, depth, pipeline, then the swapchain.
pub struct SwapchainResources {
    pub(crate) framebuffers: Framebuffers,
    pub(crate) depth: DepthAttachment,
    pub(crate) pipeline: RenderPipeline,
    pub(crate) images: SwapchainImages,
}

impl SwapchainResources {
    pub fn new(
        ctx: &Arc<DeviceContext>,
        window_size: (u32, u32),
        shaders: &ShaderBlobs,
        layouts: &DescriptorLayouts,
    ) -> Result<Self> {
        let images = SwapchainImages::new(ctx.clone(), window_size)?;
        let depth = DepthAttachment::new(ctx.clone(), images.extent)?;
        let pipeline = RenderPipeline::new(
            ctx.clone(),
            shaders,
            layouts,
            images.format,
            depth.format(),
            images.extent,
        )?;
        let framebuffers = Framebuffers::new(
            ctx.clone(),
            pipeline.render_pass,
            &images.views,
            depth.image.view,
            images.extent,
        )?;

        Ok(Self { framebuffers, depth, pipeline, images })
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.images.extent.width, self.images.extent.height)
    }

    pub fn image_count(&self) -> usize {
        self.images.views.len()
    }
}
