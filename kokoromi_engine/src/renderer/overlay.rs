/// Overlay hook - an immediate-mode UI drawn on top of the scene.

use crate::error::Result;
use super::command_list::CommandList;
use super::config::FrameSettings;

/// UI layer driven by the renderer
///
/// `begin_frame` runs once per tick before recording and may edit the frame
/// settings (lighting, background). `record` runs inside the mesh render pass,
/// after the scene draws. `shutdown` runs once, before the backend is destroyed.
pub trait Overlay<C: CommandList + ?Sized> {
    fn begin_frame(&mut self, delta_time: f32, settings: &mut FrameSettings);

    fn record(&mut self, cmd: &mut C) -> Result<()>;

    fn shutdown(&mut self);
}
