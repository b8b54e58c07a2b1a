/// Kokoromi demo - opens a window and renders the playground scene
///
/// Usage: kokoromi_demo [--texture <path>]

mod fps_overlay;
mod playground;

use kokoromi_engine::kokoromi::{Error, Renderer, Result};
use kokoromi_engine::kokoromi::render::{DebugSeverity, FrameStatus, RendererConfig};
use kokoromi_engine::{engine_error, engine_info};
use kokoromi_renderer_vulkan::kokoromi::{print_validation_stats_report, VulkanRenderer};
use std::path::PathBuf;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::fps_overlay::FpsOverlay;

const WINDOW_TITLE: &str = "kokoromi - Playground for Experimentation";
const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;

fn main() {
    let texture_path = match parse_args(std::env::args().skip(1)) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: kokoromi_demo [--texture <path>]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(texture_path) {
        engine_error!("kokoromi::demo", "Fatal: {}", e);
        std::process::exit(1);
    }
}

/// `--texture <path>` is the only option
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>> {
    let mut texture = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--texture" => {
                let path = args
                    .next()
                    .ok_or_else(|| Error::InvalidResource("--texture needs a path".to_string()))?;
                texture = Some(PathBuf::from(path));
            }
            other => return Err(Error::InvalidResource(format!("Unknown argument '{}'", other))),
        }
    }
    Ok(texture)
}

fn run(texture_path: Option<PathBuf>) -> Result<()> {
    let event_loop = EventLoop::new()
        .map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(texture_path);
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::BackendError(format!("Event loop error: {}", e)))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn renderer_config() -> RendererConfig {
    RendererConfig {
        enable_validation: true,
        validation_severity: DebugSeverity::ErrorsAndWarnings,
        app_name: "Kokoromi Demo".to_string(),
        app_version: 1,
        vertex_shader_path: concat!(env!("CARGO_MANIFEST_DIR"), "/data/shaders/shader.vert.spv").into(),
        fragment_shader_path: concat!(env!("CARGO_MANIFEST_DIR"), "/data/shaders/shader.frag.spv").into(),
    }
}

struct App {
    texture_path: Option<PathBuf>,
    /// Declared before `window` so the surface goes before the window
    renderer: Option<Renderer<VulkanRenderer>>,
    window: Option<Window>,
    last_tick: Instant,
    error: Option<Error>,
}

impl App {
    fn new(texture_path: Option<PathBuf>) -> Self {
        Self {
            texture_path,
            renderer: None,
            window: None,
            last_tick: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?;

        let size = window.inner_size();
        let backend = VulkanRenderer::new(&window, (size.width, size.height), renderer_config())?;
        let scene = playground::build_scene(self.texture_path.as_deref())?;

        let mut renderer = Renderer::startup(backend, scene)?;
        renderer.set_overlay(Box::new(FpsOverlay::new()));

        let stats = renderer.binding_stats();
        engine_info!(
            "kokoromi::demo",
            "Scene bound: {} textures, {} materials, {} models",
            stats.textures,
            stats.materials,
            stats.models
        );

        self.renderer = Some(renderer);
        self.window = Some(window);
        self.last_tick = Instant::now();
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else { return Ok(()) };

        let now = Instant::now();
        let delta_time = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        renderer.frame_update(delta_time);
        if renderer.frame_render()? == FrameStatus::Rendered {
            renderer.frame_present()?;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            if let Err(e) = renderer.shutdown() {
                engine_error!("kokoromi::demo", "Shutdown failed: {}", e);
            }
        }
        self.window = None;
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        self.error = Some(error);
        self.shutdown();
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.tick() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
        print_validation_stats_report();
    }
}
