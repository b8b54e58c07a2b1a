/// Renderer - owns the backend, the scene and the frame scheduler for the
/// lifetime of the application.
///
/// The host drives it once per tick:
///
/// ```ignore
/// renderer.frame_update(delta_time);
/// renderer.frame_render()?;
/// renderer.frame_present()?;
/// ```

use crate::error::Result;
use crate::scene::Scene;
use crate::{engine_debug, engine_info};
use super::backend::{Extent, FrameBackend, SceneUploader};
use super::command_list::{ClearValue, CommandList};
use super::config::FrameSettings;
use super::frame_scheduler::{FrameScheduler, FrameTicket};
use super::overlay::Overlay;
use super::scene_binding::{bind_scene, SceneBindingStats};
use super::scene_recorder::{record_scene, DrawStats};
use super::uniforms::UniformBufferObject;

/// What `frame_render` did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Commands were recorded and submitted; `frame_present` will present them
    Rendered,
    /// Nothing was submitted (window minimized or swapchain rebuilt on acquire)
    Skipped,
}

pub struct Renderer<B: FrameBackend + SceneUploader> {
    // Declared first: the overlay may reference backend objects
    overlay: Option<Box<dyn Overlay<B::CommandList>>>,
    scheduler: FrameScheduler,
    settings: FrameSettings,
    scene: Scene,
    pending: Option<FrameTicket>,
    minimized: bool,
    binding_stats: SceneBindingStats,
    last_draw_stats: DrawStats,
    backend: B,
}

impl<B: FrameBackend + SceneUploader> Renderer<B> {
    /// Take ownership of `backend` and `scene` and upload the scene's resources
    pub fn startup(mut backend: B, mut scene: Scene) -> Result<Self> {
        let binding_stats = bind_scene(&mut backend, &mut scene)?;

        engine_info!(
            "kokoromi::renderer",
            "Scene bound: {} textures, {} materials, {} models ({} triangles)",
            binding_stats.textures,
            binding_stats.materials,
            binding_stats.models,
            scene.triangle_count()
        );

        Ok(Self {
            overlay: None,
            scheduler: FrameScheduler::new(),
            settings: FrameSettings::default(),
            scene,
            pending: None,
            minimized: false,
            binding_stats,
            last_draw_stats: DrawStats::default(),
            backend,
        })
    }

    /// Install the UI overlay, shutting down any previous one
    pub fn set_overlay(&mut self, overlay: Box<dyn Overlay<B::CommandList>>) {
        if let Some(mut previous) = self.overlay.replace(overlay) {
            previous.shutdown();
        }
    }

    /// Per-tick CPU update; lets the overlay edit the frame settings
    pub fn frame_update(&mut self, delta_time: f32) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.begin_frame(delta_time, &mut self.settings);
        }
    }

    /// Acquire, record and submit one frame
    pub fn frame_render(&mut self) -> Result<FrameStatus> {
        if self.minimized || self.pending.is_some() {
            return Ok(FrameStatus::Skipped);
        }

        let Some(ticket) = self.scheduler.acquire(&mut self.backend)? else {
            return Ok(FrameStatus::Skipped);
        };

        self.last_draw_stats = self.record(ticket)?;
        self.scheduler.submit(&mut self.backend, ticket)?;
        self.pending = Some(ticket);

        Ok(FrameStatus::Rendered)
    }

    /// Present the frame submitted by the last `frame_render`, if any
    pub fn frame_present(&mut self) -> Result<()> {
        if let Some(ticket) = self.pending.take() {
            self.scheduler.present(&mut self.backend, ticket)?;
        }
        Ok(())
    }

    /// Forward a window resize. A zero-sized window suspends rendering.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.minimized = Extent::new(width, height).is_empty();
        if self.minimized {
            engine_debug!("kokoromi::renderer", "Window minimized, rendering suspended");
            return;
        }
        self.backend.set_surface_size(width, height);
        self.scheduler.mark_resized();
    }

    /// Wait for the device and release the overlay; the backend is destroyed on drop
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.shutdown();
        }
        self.backend.wait_idle()
    }

    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut FrameSettings {
        &mut self.settings
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn binding_stats(&self) -> SceneBindingStats {
        self.binding_stats
    }

    /// Draw counters of the last rendered frame
    pub fn last_draw_stats(&self) -> DrawStats {
        self.last_draw_stats
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    fn record(&mut self, ticket: FrameTicket) -> Result<DrawStats> {
        let ubo = UniformBufferObject::build(&self.scene, self.backend.extent(), &self.settings.lighting);
        let uniform_buffer = self.backend.uniform_buffer();
        let uniform_offset = ticket.slot as u64 * self.backend.uniform_stride();
        let clear_values = [
            ClearValue::Color(self.settings.background_color),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ];

        let cmd = self.backend.command_list(ticket.slot)?;
        cmd.begin()?;
        cmd.update_buffer(uniform_buffer, uniform_offset, bytemuck::bytes_of(&ubo))?;

        cmd.begin_render_pass(ticket.image_index, &clear_values)?;
        cmd.bind_pipeline()?;
        let stats = record_scene(cmd, &self.scene, uniform_offset as u32)?;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.record(cmd)?;
        }
        cmd.end_render_pass()?;

        cmd.end()?;
        Ok(stats)
    }
}

impl<B: FrameBackend + SceneUploader> Drop for Renderer<B> {
    fn drop(&mut self) {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.shutdown();
        }
        // Errors cannot propagate out of drop
        self.backend.wait_idle().ok();
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
