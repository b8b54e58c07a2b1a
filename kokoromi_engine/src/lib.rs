/*!
# Kokoromi Engine

Core types for the Kokoromi renderer.

This crate holds everything that does not need a GPU: the scene data model, the
uniform and push-constant layouts, and the per-frame protocol (acquire, record,
submit, present) written against backend traits. The Vulkan backend lives in
`kokoromi_renderer_vulkan` and implements those traits.

## Architecture

- **FrameBackend**: frame slots, swapchain images, submission and present
- **SceneUploader**: textures, geometry and material descriptor sets
- **CommandList**: command recording for one frame slot
- **FrameScheduler**: double-buffered acquire/record/submit/present state machine
- **Renderer**: owns the backend, the scene and the scheduler for the application's lifetime
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;
pub mod scene;

// Main kokoromi namespace module
pub mod kokoromi {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging registry
    pub use crate::engine::Engine;

    // Renderer facade
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
