/*!
# Neon Engine

Core of the Neon real-time rendering engine: shader processing, pipeline
construction and the device abstraction backends implement.

This crate is backend-agnostic. Backend implementations (Vulkan, ...)
implement the `GraphicsDevice` trait and are handed to a `Renderer`.

## Architecture

- **Shader preprocessor**: splits combined sources on `#type` markers
- **Shader compiler**: GLSL to SPIR-V through a cache of compiled binaries
- **Reflector / cross-compiler**: resource introspection and the
  decompile-then-recompile retargeting path
- **Pipeline builder**: shader objects, pipeline object, shared vertex and
  index buffers
- **Renderer**: device lifecycle, sampler catalogue and teardown

Logging goes through an explicit `Diagnostics` context; there is no global
engine state.
*/

// Internal modules
mod error;
pub mod fs;
pub mod log;
pub mod shader;
pub mod graphics_device;
pub mod renderer;

// Main neon namespace module
pub mod neon {
    // Error types
    pub use crate::error::{Error, Result};

    // Renderer
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, Diagnostics, LogEntry, LogSeverity, Logger};
    }

    // File system collaborator
    pub mod fs {
        pub use crate::fs::*;
    }

    // Shader sub-module
    pub mod shader {
        pub use crate::shader::*;
    }

    // Render sub-module with all device and pipeline types
    pub mod render {
        pub use crate::graphics_device::*;
        pub use crate::renderer::*;
    }
}

// Re-export math library at crate root
pub use glam;
