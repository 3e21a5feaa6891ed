/// Shader - Vulkan shader module with its stage and layout bindings

use ash::vk;
use neon_engine::neon::render::LayoutBinding;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub(crate) struct Shader {
    ctx: Arc<GpuContext>,
    /// Vulkan shader module
    pub(crate) module: vk::ShaderModule,
    /// Shader stage flags
    pub(crate) stage: vk::ShaderStageFlags,
    /// Entry point name
    pub(crate) entry_point: CString,
    /// Bindings the pipeline layout declares for this stage
    pub(crate) bindings: Vec<LayoutBinding>,
}

impl Shader {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        module: vk::ShaderModule,
        stage: vk::ShaderStageFlags,
        entry_point: CString,
        bindings: Vec<LayoutBinding>,
    ) -> Self {
        Self {
            ctx,
            module,
            stage,
            entry_point,
            bindings,
        }
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}
