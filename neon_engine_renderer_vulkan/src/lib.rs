/*!
# Neon Engine - Vulkan Backend

Vulkan implementation of the Neon engine's `GraphicsDevice` trait.

Uses the Ash library for Vulkan bindings, ash-window for surface creation
and gpu-allocator for memory management.

# Example

```no_run
use std::sync::Arc;
use neon_engine::neon::log::Diagnostics;
use neon_engine_renderer_vulkan::VulkanGraphicsDevice;
# fn demo(window: Arc<winit::window::Window>) {
let device = VulkanGraphicsDevice::new(window, Diagnostics::default());
# }
```
*/

mod vulkan;
mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_sampler;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::VulkanGraphicsDevice;

#[cfg(feature = "vulkan-validation")]
pub use debug::ValidationStats;
