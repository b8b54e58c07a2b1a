/// Upload - staging copies into device-local buffers and textures
///
/// Every upload records into a one-shot command buffer from the context's
/// upload pool and waits for the graphics queue to go idle before returning.
/// Uploads happen at load time only.

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::{engine_debug, engine_err};
use ash::vk;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::DeviceContext;
use crate::vulkan_selection::{
    clamp_mip_levels, layout_transition, mip_extent, supports_linear_blit, transition_aspect,
};
use crate::vulkan_texture::{Texture, TEXTURE_FORMAT};

/// Record commands with `record`, submit them and block until the queue is idle
pub(crate) fn one_shot<F>(ctx: &DeviceContext, record: F) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer) -> Result<()>,
{
    let pool = ctx.upload_pool()?;

    unsafe {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = ctx
            .device
            .allocate_command_buffers(&alloc_info)
            .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

        let result = (|| {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            ctx.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

            record(command_buffer)?;

            ctx.device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to end upload command buffer: {:?}", e))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            ctx.device
                .queue_submit(ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to submit upload: {:?}", e))?;
            ctx.device
                .queue_wait_idle(ctx.graphics_queue)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to wait for upload: {:?}", e))
        })();

        ctx.device.free_command_buffers(*pool, &[command_buffer]);
        result
    }
}

/// Host-visible staging buffer holding `data`
fn staging_buffer(ctx: &Arc<DeviceContext>, data: &[u8]) -> Result<Buffer> {
    let staging = Buffer::new(
        ctx.clone(),
        "staging",
        data.len() as u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
    )?;
    staging.write(0, data)?;
    Ok(staging)
}

/// Copy `data` into a new device-local buffer with `usage` (plus TRANSFER_DST)
pub(crate) fn upload_buffer(
    ctx: &Arc<DeviceContext>,
    name: &str,
    data: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<Buffer> {
    let staging = staging_buffer(ctx, data)?;
    let buffer = Buffer::new(
        ctx.clone(),
        name,
        data.len() as u64,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        MemoryLocation::GpuOnly,
    )?;

    one_shot(ctx, |cmd| {
        let region = vk::BufferCopy::default().size(data.len() as u64);
        unsafe {
            ctx.device.cmd_copy_buffer(cmd, staging.buffer, buffer.buffer, &[region]);
        }
        Ok(())
    })?;

    Ok(buffer)
}

/// Record a pipeline barrier moving `level_count` mips of `image` from `old` to `new`
///
/// Only the transitions known to `layout_transition` are accepted.
#[allow(clippy::too_many_arguments)]
pub(crate) fn record_layout_transition(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    format: vk::Format,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
    base_mip_level: u32,
    level_count: u32,
) -> Result<()> {
    let transition = layout_transition(old, new).ok_or_else(|| {
        Error::InvalidResource(format!("Unsupported layout transition {:?} -> {:?}", old, new))
    })?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old)
        .new_layout(new)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: transition_aspect(new, format),
            base_mip_level,
            level_count,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(transition.src_access)
        .dst_access_mask(transition.dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            transition.src_stage,
            transition.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
    Ok(())
}

/// Create a sampled texture from tightly packed RGBA8 `pixels`
///
/// Level 0 is copied from staging; the remaining levels are generated by
/// successive linear blits. Every level ends in SHADER_READ_ONLY_OPTIMAL.
pub(crate) fn upload_texture(
    ctx: &Arc<DeviceContext>,
    width: u32,
    height: u32,
    mip_levels: u32,
    pixels: &[u8],
) -> Result<Texture> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(Error::InvalidResource(format!(
            "Texture {}x{} needs {} bytes of RGBA8, got {}",
            width,
            height,
            expected,
            pixels.len()
        )));
    }
    let mip_levels = clamp_mip_levels(width, height, mip_levels);
    if mip_levels > 1 && !supports_linear_blit(&ctx.format_properties(TEXTURE_FORMAT)) {
        return Err(Error::InvalidResource(format!(
            "{:?} does not support linear blitting",
            TEXTURE_FORMAT
        )));
    }

    let staging = staging_buffer(ctx, pixels)?;
    let texture = Texture::new(ctx.clone(), width, height, mip_levels)?;
    let image = texture.image.image;

    one_shot(ctx, |cmd| {
        record_layout_transition(
            &ctx.device,
            cmd,
            image,
            TEXTURE_FORMAT,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            0,
            mip_levels,
        )?;

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D { width, height, depth: 1 });
        unsafe {
            ctx.device.cmd_copy_buffer_to_image(
                cmd,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        record_mipmaps(&ctx.device, cmd, image, width, height, mip_levels)
    })?;

    engine_debug!(
        "kokoromi::vulkan",
        "Uploaded {}x{} texture with {} mip levels",
        width,
        height,
        mip_levels
    );
    Ok(texture)
}

/// Fill levels 1.. by blitting each level into the next
///
/// Expects every level in TRANSFER_DST_OPTIMAL; leaves every level in
/// SHADER_READ_ONLY_OPTIMAL.
fn record_mipmaps(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    width: u32,
    height: u32,
    mip_levels: u32,
) -> Result<()> {
    for level in 1..mip_levels {
        record_layout_transition(
            device,
            cmd,
            image,
            TEXTURE_FORMAT,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            level - 1,
            1,
        )?;

        let (src_width, src_height) = mip_extent(width, height, level - 1);
        let (dst_width, dst_height) = mip_extent(width, height, level);
        let blit = vk::ImageBlit::default()
            .src_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: src_width as i32, y: src_height as i32, z: 1 },
            ])
            .dst_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            })
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: dst_width as i32, y: dst_height as i32, z: 1 },
            ]);

        unsafe {
            device.cmd_blit_image(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit],
                vk::Filter::LINEAR,
            );
        }

        record_layout_transition(
            device,
            cmd,
            image,
            TEXTURE_FORMAT,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            level - 1,
            1,
        )?;
    }

    // Last level was only ever a blit destination
    record_layout_transition(
        device,
        cmd,
        image,
        TEXTURE_FORMAT,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        mip_levels - 1,
        1,
    )
}
