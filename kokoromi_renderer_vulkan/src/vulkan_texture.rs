/// Texture - device-local images with their view (and sampler for sampled textures)

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::{engine_error, engine_err};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;
use crate::vulkan_selection::find_memory_type;

/// Texel format of every uploaded texture
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Parameters of a 2D device-local image
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
    pub aspect: vk::ImageAspectFlags,
}

/// Image + memory + full-range view
pub struct GpuImage {
    ctx: Arc<DeviceContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    pub(crate) desc: ImageDesc,
}

impl GpuImage {
    pub fn new(ctx: Arc<DeviceContext>, name: &str, desc: ImageDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "Image '{}' has empty extent {}x{}",
                name, desc.width, desc.height
            )));
        }

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(desc.format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(desc.mip_levels)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(desc.usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_info, None).map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create image '{}': {:?}", name, e);
                Error::BackendError(format!("Failed to create image: {:?}", e))
            })?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            if find_memory_type(
                requirements.memory_type_bits,
                &ctx.memory_properties,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            )
            .is_none()
            {
                ctx.device.destroy_image(image, None);
                return Err(engine_err!("kokoromi::vulkan", "No device-local memory type for image '{}'", name));
            }

            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name,
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        engine_error!("kokoromi::vulkan", "Out of memory allocating image '{}': {:?}", name, e);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here on `Drop` releases whatever was created
            let mut gpu_image = Self {
                ctx,
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                desc,
            };

            let (memory, offset) = match gpu_image.allocation.as_ref() {
                Some(allocation) => (allocation.memory(), allocation.offset()),
                None => return Err(Error::OutOfMemory),
            };
            gpu_image
                .ctx
                .device
                .bind_image_memory(image, memory, offset)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to bind image memory: {:?}", e))?;

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(desc.format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: desc.aspect,
                    base_mip_level: 0,
                    level_count: desc.mip_levels,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            gpu_image.view = gpu_image
                .ctx
                .device
                .create_image_view(&view_info, None)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create image view: {:?}", e))?;

            Ok(gpu_image)
        }
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Sampled RGBA8 texture: image, view, sampler
pub struct Texture {
    /// Declared before `image` so the sampler goes first
    sampler: Sampler,
    pub(crate) image: GpuImage,
}

impl Texture {
    /// Allocate an uninitialized texture with `mip_levels` levels
    pub fn new(ctx: Arc<DeviceContext>, width: u32, height: u32, mip_levels: u32) -> Result<Self> {
        let image = GpuImage::new(
            ctx.clone(),
            "texture",
            ImageDesc {
                width,
                height,
                mip_levels,
                format: TEXTURE_FORMAT,
                usage: vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::SAMPLED,
                aspect: vk::ImageAspectFlags::COLOR,
            },
        )?;
        let sampler = Sampler::new(ctx, mip_levels)?;

        Ok(Self { sampler, image })
    }

    pub(crate) fn view(&self) -> vk::ImageView {
        self.image.view
    }

    pub(crate) fn sampler(&self) -> vk::Sampler {
        self.sampler.sampler
    }
}

/// Linear/REPEAT sampler with anisotropy and linear mip filtering
struct Sampler {
    ctx: Arc<DeviceContext>,
    sampler: vk::Sampler,
}

impl Sampler {
    fn new(ctx: Arc<DeviceContext>, mip_levels: u32) -> Result<Self> {
        let max_anisotropy = ctx.properties.limits.max_sampler_anisotropy.min(16.0);

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(mip_levels as f32);

        let sampler = unsafe {
            ctx.device
                .create_sampler(&sampler_info, None)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create sampler: {:?}", e))?
        };

        Ok(Self { ctx, sampler })
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
