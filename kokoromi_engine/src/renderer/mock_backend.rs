/// Mock backend for unit tests (no GPU required)
///
/// Records every command-list call and every frame-protocol call so the frame
/// scheduler, scene binding and renderer can be checked end to end.

use std::collections::VecDeque;
use crate::error::Result;
use crate::engine_bail;
use crate::scene::Vertex;
use super::backend::{
    AcquireOutcome, BufferHandle, DescriptorSetHandle, Extent, FrameBackend,
    GpuGeometry, PresentOutcome, SceneUploader, TextureHandle,
};
use super::command_list::{ClearValue, CommandList, IndexType, ShaderStageFlags};
use super::config::MAX_FRAMES_IN_FLIGHT;

// ============================================================================
// Mock Command List
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Begin,
    End,
    UpdateBuffer { buffer: BufferHandle, offset: u64, len: usize },
    BeginRenderPass { image_index: u32, clear_values: Vec<ClearValue> },
    EndRenderPass,
    BindPipeline,
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(BufferHandle, IndexType),
    PushConstants { stages: ShaderStageFlags, offset: u32, data: Vec<u8> },
    BindDescriptorSet { set_index: u32, set: DescriptorSetHandle, dynamic_offsets: Vec<u32> },
    DrawIndexed { index_count: u32, first_index: u32, vertex_offset: i32 },
    /// Emitted by test overlays
    Overlay,
}

#[derive(Debug, Default)]
pub struct MockCommandList {
    pub commands: Vec<MockCommand>,
    pub recording: bool,
    pub in_render_pass: bool,
}

impl MockCommandList {
    pub fn draws(&self) -> Vec<&MockCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, MockCommand::DrawIndexed { .. }))
            .collect()
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        // A re-recorded command buffer starts empty, even after an aborted frame
        self.commands.clear();
        self.in_render_pass = false;
        self.recording = true;
        self.commands.push(MockCommand::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording || self.in_render_pass {
            engine_bail!("kokoromi::mock", "end() outside recording or inside a render pass");
        }
        self.recording = false;
        self.commands.push(MockCommand::End);
        Ok(())
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("kokoromi::mock", "update_buffer() inside a render pass");
        }
        self.commands.push(MockCommand::UpdateBuffer { buffer, offset, len: data.len() });
        Ok(())
    }

    fn begin_render_pass(&mut self, image_index: u32, clear_values: &[ClearValue]) -> Result<()> {
        self.in_render_pass = true;
        self.commands.push(MockCommand::BeginRenderPass {
            image_index,
            clear_values: clear_values.to_vec(),
        });
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.in_render_pass = false;
        self.commands.push(MockCommand::EndRenderPass);
        Ok(())
    }

    fn bind_pipeline(&mut self) -> Result<()> {
        self.commands.push(MockCommand::BindPipeline);
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, _offset: u64) -> Result<()> {
        self.commands.push(MockCommand::BindVertexBuffer(buffer));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, index_type: IndexType) -> Result<()> {
        self.commands.push(MockCommand::BindIndexBuffer(buffer, index_type));
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.commands.push(MockCommand::PushConstants { stages, offset, data: data.to_vec() });
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        set_index: u32,
        set: DescriptorSetHandle,
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        self.commands.push(MockCommand::BindDescriptorSet {
            set_index,
            set,
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        if !self.in_render_pass {
            engine_bail!("kokoromi::mock", "draw_indexed() outside a render pass");
        }
        self.commands.push(MockCommand::DrawIndexed { index_count, first_index, vertex_offset });
        Ok(())
    }
}

// ============================================================================
// Mock Backend
// ============================================================================

/// Frame-protocol call, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCall {
    WaitForSlot(usize),
    Acquire(usize),
    ResetSlot(usize),
    Submit(usize),
    Present(usize, u32),
    Recreate,
    WaitIdle,
}

pub const MOCK_UNIFORM_STRIDE: u64 = 1024;

#[derive(Debug)]
pub struct MockBackend {
    pub extent: Extent,
    pub surface_size: Option<(u32, u32)>,
    pub command_lists: Vec<MockCommandList>,
    pub calls: Vec<FrameCall>,

    /// Scripted acquire results; `Acquired` with a rotating image index once empty
    pub acquire_script: VecDeque<AcquireOutcome>,
    /// Scripted present results; `Presented` once empty
    pub present_script: VecDeque<PresentOutcome>,
    pub image_count: u32,
    next_image: u32,

    /// Slot fence unsignaled (work submitted, not yet waited on)
    pub in_flight: [bool; MAX_FRAMES_IN_FLIGHT],
    pub max_in_flight: usize,
    /// Slot fence has been reset without a matching submit
    pub fence_reset: [bool; MAX_FRAMES_IN_FLIGHT],

    pub recreate_count: u32,
    pub wait_idle_count: u32,

    pub uploaded_textures: Vec<(u32, u32, u32, usize)>,
    pub uploaded_geometry: Vec<(usize, usize)>,
    pub material_sets: Vec<TextureHandle>,
    next_handle: u64,
}

impl MockBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: Extent::new(width, height),
            surface_size: None,
            command_lists: (0..MAX_FRAMES_IN_FLIGHT).map(|_| MockCommandList::default()).collect(),
            calls: Vec::new(),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            image_count: 3,
            next_image: 0,
            in_flight: [false; MAX_FRAMES_IN_FLIGHT],
            max_in_flight: 0,
            fence_reset: [false; MAX_FRAMES_IN_FLIGHT],
            recreate_count: 0,
            wait_idle_count: 0,
            uploaded_textures: Vec::new(),
            uploaded_geometry: Vec::new(),
            material_sets: Vec::new(),
            next_handle: 1,
        }
    }

    pub fn count_calls(&self, predicate: impl Fn(&FrameCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    fn allocate_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl FrameBackend for MockBackend {
    type CommandList = MockCommandList;

    fn extent(&self) -> Extent {
        self.extent
    }

    fn uniform_buffer(&self) -> BufferHandle {
        BufferHandle(0xFFFF)
    }

    fn uniform_stride(&self) -> u64 {
        MOCK_UNIFORM_STRIDE
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        if self.fence_reset[slot] {
            // A real fence wait would never return
            engine_bail!("kokoromi::mock", "Deadlock: waiting on reset fence of slot {}", slot);
        }
        self.calls.push(FrameCall::WaitForSlot(slot));
        self.in_flight[slot] = false;
        Ok(())
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        self.calls.push(FrameCall::Acquire(slot));
        if let Some(outcome) = self.acquire_script.pop_front() {
            return Ok(outcome);
        }
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count;
        Ok(AcquireOutcome::Acquired { image_index, suboptimal: false })
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        self.calls.push(FrameCall::ResetSlot(slot));
        self.fence_reset[slot] = true;
        Ok(())
    }

    fn command_list(&mut self, slot: usize) -> Result<&mut MockCommandList> {
        match self.command_lists.get_mut(slot) {
            Some(cmd) => Ok(cmd),
            None => engine_bail!("kokoromi::mock", "No command list for slot {}", slot),
        }
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        if self.in_flight[slot] {
            engine_bail!("kokoromi::mock", "Slot {} submitted while still in flight", slot);
        }
        self.calls.push(FrameCall::Submit(slot));
        self.in_flight[slot] = true;
        self.fence_reset[slot] = false;
        let count = self.in_flight.iter().filter(|f| **f).count();
        self.max_in_flight = self.max_in_flight.max(count);
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        self.calls.push(FrameCall::Present(slot, image_index));
        Ok(self.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
    }

    fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = Some((width, height));
    }

    fn recreate_swapchain(&mut self) -> Result<()> {
        self.calls.push(FrameCall::Recreate);
        self.recreate_count += 1;
        // Device idle: every submitted slot has completed
        self.in_flight = [false; MAX_FRAMES_IN_FLIGHT];
        if let Some((width, height)) = self.surface_size {
            self.extent = Extent::new(width, height);
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.calls.push(FrameCall::WaitIdle);
        self.wait_idle_count += 1;
        self.in_flight = [false; MAX_FRAMES_IN_FLIGHT];
        Ok(())
    }
}

impl SceneUploader for MockBackend {
    fn upload_texture(&mut self, width: u32, height: u32, mip_levels: u32, pixels: &[u8]) -> Result<TextureHandle> {
        self.uploaded_textures.push((width, height, mip_levels, pixels.len()));
        Ok(TextureHandle(self.allocate_handle()))
    }

    fn upload_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<GpuGeometry> {
        self.uploaded_geometry.push((vertices.len(), indices.len()));
        Ok(GpuGeometry {
            vertex_buffer: BufferHandle(self.allocate_handle()),
            index_buffer: BufferHandle(self.allocate_handle()),
            index_count: indices.len() as u32,
        })
    }

    fn create_material_set(&mut self, texture: TextureHandle) -> Result<DescriptorSetHandle> {
        self.material_sets.push(texture);
        Ok(DescriptorSetHandle(self.allocate_handle()))
    }
}
