/// Renderer module - pipeline construction and the device lifecycle

// Module declarations
pub mod renderer;
pub mod pipeline_builder;

// Re-export everything from renderer.rs
pub use renderer::*;

// Re-export from other modules
pub use pipeline_builder::*;
