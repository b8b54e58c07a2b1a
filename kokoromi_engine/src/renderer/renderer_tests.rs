use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3};
use crate::error::{Error, Result};
use crate::renderer::mock_backend::{FrameCall, MockBackend, MockCommand, MockCommandList, MOCK_UNIFORM_STRIDE};
use crate::renderer::uniforms::{PushConstants, UniformBufferObject};
use crate::renderer::{
    AcquireOutcome, BufferHandle, ClearValue, FrameSettings, FrameStatus, Overlay, Renderer,
};
use crate::scene::{primitives, Material, Model, Scene};

// ============================================================================
// Helpers
// ============================================================================

fn quad_model(name: &str, material_index: usize, position: Vec3) -> Model {
    let data = primitives::quad(1.0, Vec3::ONE, material_index);
    Model {
        name: name.to_string(),
        world_transform: Mat4::from_translation(position),
        vertices: data.vertices,
        indices: data.indices,
        meshes: data.meshes,
        gpu: None,
    }
}

/// One textured quad and one untextured quad
fn demo_scene() -> Scene {
    let mut scene = Scene::new();
    let texture = scene.add_texture(primitives::checkerboard("checker", 8, 2, [255; 4], [0, 0, 0, 255]).unwrap());
    let textured = scene.add_material(Material::new("textured", Some(texture)));
    let plain = scene.add_material(Material::new("plain", None));
    scene.add_model(quad_model("textured_quad", textured, Vec3::new(2.0, 0.0, 0.0)));
    scene.add_model(quad_model("plain_quad", plain, Vec3::new(-2.0, 0.0, 0.0)));
    scene
}

fn started() -> Renderer<MockBackend> {
    Renderer::startup(MockBackend::new(800, 600), demo_scene()).unwrap()
}

#[derive(Default)]
struct OverlayLog {
    begin_frames: Vec<f32>,
    records: u32,
    shutdowns: u32,
}

/// Overlay that turns the background red and logs every call
struct TestOverlay {
    log: Arc<Mutex<OverlayLog>>,
}

impl Overlay<MockCommandList> for TestOverlay {
    fn begin_frame(&mut self, delta_time: f32, settings: &mut FrameSettings) {
        self.log.lock().unwrap().begin_frames.push(delta_time);
        settings.background_color = [1.0, 0.0, 0.0, 1.0];
    }

    fn record(&mut self, cmd: &mut MockCommandList) -> Result<()> {
        self.log.lock().unwrap().records += 1;
        cmd.commands.push(MockCommand::Overlay);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.log.lock().unwrap().shutdowns += 1;
    }
}

/// Overlay whose first `record` fails mid render pass
struct FailOnceOverlay {
    failed: bool,
}

impl Overlay<MockCommandList> for FailOnceOverlay {
    fn begin_frame(&mut self, _delta_time: f32, _settings: &mut FrameSettings) {}

    fn record(&mut self, _cmd: &mut MockCommandList) -> Result<()> {
        if self.failed {
            return Ok(());
        }
        self.failed = true;
        Err(Error::BackendError("overlay draw failed".to_string()))
    }

    fn shutdown(&mut self) {}
}

fn commands_of_last_frame(renderer: &Renderer<MockBackend>) -> &[MockCommand] {
    let slot = renderer.scheduler().current_slot();
    &renderer.backend().command_lists[slot].commands
}

// ============================================================================
// Startup
// ============================================================================

#[test]
fn test_startup_binds_scene() {
    let renderer = started();

    let stats = renderer.binding_stats();
    assert_eq!(stats.textures, 1);
    assert_eq!(stats.materials, 1);
    assert_eq!(stats.models, 2);
    assert!(renderer.scene().models.iter().all(|m| m.gpu.is_some()));
}

// ============================================================================
// Frame recording
// ============================================================================

#[test]
fn test_textured_quad_draws_exactly_once() {
    let mut renderer = started();

    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Rendered);
    renderer.frame_present().unwrap();

    let commands = commands_of_last_frame(&renderer);
    let draws: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c, MockCommand::DrawIndexed { .. }))
        .collect();
    assert_eq!(draws, vec![&MockCommand::DrawIndexed { index_count: 6, first_index: 0, vertex_offset: 0 }]);

    let set = renderer.scene().materials[0].descriptor_set.unwrap();
    assert!(commands.iter().any(|c| matches!(
        c,
        MockCommand::BindDescriptorSet { set: s, .. } if *s == set
    )));

    let push = PushConstants { model: renderer.scene().models[0].world_transform };
    assert!(commands.iter().any(|c| matches!(
        c,
        MockCommand::PushConstants { data, .. } if data.as_slice() == bytemuck::bytes_of(&push)
    )));

    assert_eq!(renderer.last_draw_stats().draw_calls, 1);
    assert_eq!(renderer.last_draw_stats().skipped_meshes, 1);
}

#[test]
fn test_frame_command_order() {
    let mut renderer = started();

    renderer.frame_render().unwrap();

    let commands = commands_of_last_frame(&renderer);
    assert_eq!(commands.first(), Some(&MockCommand::Begin));
    assert_eq!(commands.last(), Some(&MockCommand::End));
    assert!(matches!(commands[1], MockCommand::UpdateBuffer { .. }));
    assert!(matches!(commands[2], MockCommand::BeginRenderPass { .. }));
    assert_eq!(commands[3], MockCommand::BindPipeline);
    assert_eq!(commands[commands.len() - 2], MockCommand::EndRenderPass);
}

#[test]
fn test_uniform_block_written_at_slot_offset() {
    let mut renderer = started();

    for _ in 0..2 {
        renderer.frame_render().unwrap();
        renderer.frame_present().unwrap();

        let slot = renderer.scheduler().current_slot();
        let expected = MockCommand::UpdateBuffer {
            buffer: BufferHandle(0xFFFF),
            offset: slot as u64 * MOCK_UNIFORM_STRIDE,
            len: std::mem::size_of::<UniformBufferObject>(),
        };
        assert_eq!(commands_of_last_frame(&renderer)[1], expected);

        let offset = (slot as u64 * MOCK_UNIFORM_STRIDE) as u32;
        assert!(commands_of_last_frame(&renderer).iter().any(|c| matches!(
            c,
            MockCommand::BindDescriptorSet { dynamic_offsets, .. } if dynamic_offsets == &vec![offset]
        )));
    }
}

#[test]
fn test_render_pass_clears_background_and_depth() {
    let mut renderer = started();
    renderer.settings_mut().background_color = [0.1, 0.2, 0.3, 1.0];

    renderer.frame_render().unwrap();

    let begin = commands_of_last_frame(&renderer)
        .iter()
        .find(|c| matches!(c, MockCommand::BeginRenderPass { .. }))
        .cloned();
    assert_eq!(
        begin,
        Some(MockCommand::BeginRenderPass {
            image_index: 0,
            clear_values: vec![
                ClearValue::Color([0.1, 0.2, 0.3, 1.0]),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
        })
    );
}

// ============================================================================
// Frame loop
// ============================================================================

#[test]
fn test_many_frames_stay_within_slot_budget() {
    let mut renderer = started();

    for _ in 0..20 {
        renderer.frame_update(0.016);
        renderer.frame_render().unwrap();
        renderer.frame_present().unwrap();
    }

    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Submit(_))), 20);
    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Present(_, _))), 20);
    assert!(renderer.backend().max_in_flight <= 2);
}

#[test]
fn test_out_of_date_acquire_skips_present() {
    let mut backend = MockBackend::new(800, 600);
    backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
    let mut renderer = Renderer::startup(backend, demo_scene()).unwrap();

    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Skipped);
    renderer.frame_present().unwrap();
    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Present(_, _))), 0);
    assert_eq!(renderer.backend().recreate_count, 1);

    // The next tick renders normally
    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Rendered);
}

#[test]
fn test_resize_recreates_after_present() {
    let mut renderer = started();

    renderer.resize(1024, 768);
    renderer.frame_render().unwrap();
    assert_eq!(renderer.backend().recreate_count, 0);

    renderer.frame_present().unwrap();
    assert_eq!(renderer.backend().recreate_count, 1);
    assert_eq!(renderer.backend().extent.width, 1024);
    assert_eq!(renderer.backend().extent.height, 768);
}

#[test]
fn test_minimized_window_skips_frames() {
    let mut renderer = started();

    renderer.resize(0, 600);
    assert!(renderer.is_minimized());
    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Skipped);
    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Acquire(_))), 0);

    renderer.resize(640, 480);
    assert!(!renderer.is_minimized());
    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Rendered);
}

#[test]
fn test_render_twice_without_present_is_skipped() {
    let mut renderer = started();

    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Rendered);
    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Skipped);
    renderer.frame_present().unwrap();
    assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Rendered);
}

// ============================================================================
// Overlay
// ============================================================================

#[test]
fn test_overlay_hooks_called_in_order() {
    let log = Arc::new(Mutex::new(OverlayLog::default()));
    let mut renderer = started();
    renderer.set_overlay(Box::new(TestOverlay { log: log.clone() }));

    renderer.frame_update(0.5);
    renderer.frame_render().unwrap();
    renderer.frame_present().unwrap();

    {
        let log = log.lock().unwrap();
        assert_eq!(log.begin_frames, vec![0.5]);
        assert_eq!(log.records, 1);
        assert_eq!(log.shutdowns, 0);
    }

    // Overlay draws after the scene, inside the render pass
    let commands = commands_of_last_frame(&renderer);
    let overlay_at = commands.iter().position(|c| *c == MockCommand::Overlay).unwrap();
    let draw_at = commands.iter().position(|c| matches!(c, MockCommand::DrawIndexed { .. })).unwrap();
    let end_pass_at = commands.iter().position(|c| *c == MockCommand::EndRenderPass).unwrap();
    assert!(draw_at < overlay_at && overlay_at < end_pass_at);

    // Overlay edited the clear color
    assert_eq!(renderer.settings().background_color, [1.0, 0.0, 0.0, 1.0]);

    drop(renderer);
    assert_eq!(log.lock().unwrap().shutdowns, 1);
}

#[test]
fn test_shutdown_waits_idle_and_stops_overlay() {
    let log = Arc::new(Mutex::new(OverlayLog::default()));
    let mut renderer = started();
    renderer.set_overlay(Box::new(TestOverlay { log: log.clone() }));

    renderer.frame_render().unwrap();
    renderer.frame_present().unwrap();
    renderer.shutdown().unwrap();

    assert_eq!(log.lock().unwrap().shutdowns, 1);
}

#[test]
fn test_replacing_overlay_shuts_down_previous() {
    let first = Arc::new(Mutex::new(OverlayLog::default()));
    let second = Arc::new(Mutex::new(OverlayLog::default()));
    let mut renderer = started();

    renderer.set_overlay(Box::new(TestOverlay { log: first.clone() }));
    renderer.set_overlay(Box::new(TestOverlay { log: second.clone() }));

    assert_eq!(first.lock().unwrap().shutdowns, 1);
    assert_eq!(second.lock().unwrap().shutdowns, 0);
}

#[test]
fn test_failed_overlay_record_does_not_wedge_slot() {
    let mut renderer = started();
    renderer.set_overlay(Box::new(FailOnceOverlay { failed: false }));

    assert!(matches!(renderer.frame_render(), Err(Error::BackendError(_))));
    renderer.frame_present().unwrap();
    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Submit(_))), 0);

    // Both slots, including the one whose recording was abandoned, keep rendering
    for _ in 0..4 {
        assert_eq!(renderer.frame_render().unwrap(), FrameStatus::Rendered);
        renderer.frame_present().unwrap();
    }
    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Submit(_))), 4);
    assert_eq!(renderer.backend().count_calls(|c| matches!(c, FrameCall::Present(_, _))), 4);
}
