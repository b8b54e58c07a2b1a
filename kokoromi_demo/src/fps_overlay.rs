/// Minimal overlay: logs frame statistics once per second

use kokoromi_engine::kokoromi::Result;
use kokoromi_engine::kokoromi::render::{FrameSettings, Overlay};
use kokoromi_engine::engine_info;
use kokoromi_renderer_vulkan::kokoromi::VulkanCommandList;

const REPORT_INTERVAL: f32 = 1.0;

#[derive(Default)]
pub struct FpsOverlay {
    frames: u32,
    elapsed: f32,
}

impl FpsOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one tick; returns the average FPS when a report is due
    fn tick(&mut self, delta_time: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += delta_time;
        if self.elapsed < REPORT_INTERVAL {
            return None;
        }

        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}

impl Overlay<VulkanCommandList> for FpsOverlay {
    fn begin_frame(&mut self, delta_time: f32, _settings: &mut FrameSettings) {
        if let Some(fps) = self.tick(delta_time) {
            engine_info!("kokoromi::demo", "{:.1} fps", fps);
        }
    }

    fn record(&mut self, _cmd: &mut VulkanCommandList) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) {
        engine_info!("kokoromi::demo", "Overlay shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::FpsOverlay;

    #[test]
    fn test_reports_once_per_interval() {
        let mut overlay = FpsOverlay::new();

        for _ in 0..3 {
            assert_eq!(overlay.tick(0.25), None);
        }
        assert_eq!(overlay.tick(0.25), Some(4.0));
        assert_eq!(overlay.tick(0.25), None);
    }
}
