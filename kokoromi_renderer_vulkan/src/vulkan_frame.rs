/// Frame ring - per-slot command buffer, in-flight fence and semaphore pair

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::{engine_error, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;

/// Synchronization objects and command buffer of one frame slot
pub struct FrameSlot {
    pub(crate) command_buffer: vk::CommandBuffer,
    /// Created signaled so the first wait returns immediately
    pub(crate) in_flight: vk::Fence,
    pub(crate) image_acquired: vk::Semaphore,
    pub(crate) render_complete: vk::Semaphore,
}

/// `slot_count` frame slots sharing one resettable command pool
pub struct FrameRing {
    ctx: Arc<DeviceContext>,
    pool: vk::CommandPool,
    slots: Vec<FrameSlot>,
}

impl FrameRing {
    pub fn new(ctx: Arc<DeviceContext>, slot_count: usize) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.queue_families.graphics)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let pool = ctx.device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create frame command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

            let mut ring = Self {
                ctx,
                pool,
                slots: Vec::with_capacity(slot_count),
            };

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(slot_count as u32);
            let command_buffers = ring
                .ctx
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to allocate frame command buffers: {:?}", e))?;

            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let semaphore_info = vk::SemaphoreCreateInfo::default();

            for command_buffer in command_buffers {
                let device = &ring.ctx.device;
                let in_flight = device
                    .create_fence(&fence_info, None)
                    .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create fence: {:?}", e))?;
                let image_acquired = match device.create_semaphore(&semaphore_info, None) {
                    Ok(semaphore) => semaphore,
                    Err(e) => {
                        device.destroy_fence(in_flight, None);
                        return Err(engine_err!("kokoromi::vulkan", "Failed to create semaphore: {:?}", e));
                    }
                };
                let render_complete = match device.create_semaphore(&semaphore_info, None) {
                    Ok(semaphore) => semaphore,
                    Err(e) => {
                        device.destroy_semaphore(image_acquired, None);
                        device.destroy_fence(in_flight, None);
                        return Err(engine_err!("kokoromi::vulkan", "Failed to create semaphore: {:?}", e));
                    }
                };

                ring.slots.push(FrameSlot {
                    command_buffer,
                    in_flight,
                    image_acquired,
                    render_complete,
                });
            }

            Ok(ring)
        }
    }

    pub fn slot(&self, slot: usize) -> Result<&FrameSlot> {
        self.slots
            .get(slot)
            .ok_or_else(|| Error::InvalidResource(format!("Frame slot {} out of range", slot)))
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Block until `slot`'s last submission completed
    pub fn wait(&self, slot: usize) -> Result<()> {
        let fences = [self.slot(slot)?.in_flight];
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&fences, true, u64::MAX)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to wait for frame fence: {:?}", e))
        }
    }

    pub fn reset(&self, slot: usize) -> Result<()> {
        let fences = [self.slot(slot)?.in_flight];
        unsafe {
            self.ctx
                .device
                .reset_fences(&fences)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to reset frame fence: {:?}", e))
        }
    }
}

impl Drop for FrameRing {
    fn drop(&mut self) {
        unsafe {
            for slot in &self.slots {
                self.ctx.device.destroy_semaphore(slot.render_complete, None);
                self.ctx.device.destroy_semaphore(slot.image_acquired, None);
                self.ctx.device.destroy_fence(slot.in_flight, None);
            }
            // Frees the command buffers as well
            self.ctx.device.destroy_command_pool(self.pool, None);
        }
    }
}
