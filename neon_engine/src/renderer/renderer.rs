/// Renderer - owns the graphics device and everything created on it
///
/// Lifecycle: `init` creates the device and the sampler catalogue,
/// `create_graphics_pipeline` builds the single pipeline and its shared
/// buffers, `clean` releases everything in dependency order.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandBuffer, Config, GraphicsDevice, GraphicsPipelineCreateInfo, SamplerHandle, SamplerPreset,
};
use crate::log::Diagnostics;
use crate::renderer::pipeline_builder::{BuiltPipeline, PipelineBuilder};
use crate::shader::ShaderScriptProcessor;
use crate::{engine_debug, engine_error, engine_info};

const LOG_SOURCE: &str = "neon::renderer";

pub struct Renderer {
    device: Box<dyn GraphicsDevice>,
    shaders: ShaderScriptProcessor,
    diagnostics: Diagnostics,
    config: Config,
    initialized: bool,
    samplers: BTreeMap<SamplerPreset, SamplerHandle>,
    pipeline: Option<BuiltPipeline>,
}

impl Renderer {
    /// Wrap a device that has not been initialized yet
    pub fn new(device: Box<dyn GraphicsDevice>, shaders: ShaderScriptProcessor, diagnostics: Diagnostics) -> Self {
        Self {
            device,
            shaders,
            diagnostics,
            config: Config::default(),
            initialized: false,
            samplers: BTreeMap::new(),
            pipeline: None,
        }
    }

    /// Initialize the device and create one sampler per preset
    ///
    /// A failure after the device came up leaves it initialized; `clean`
    /// releases whatever was created.
    pub fn init(&mut self, config: &Config) -> Result<()> {
        if self.initialized {
            return Err(Error::InitializationFailed("renderer is already initialized".to_string()));
        }

        self.device.init(config).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "Failed to initialize graphics device: {}", e);
            e
        })?;
        self.initialized = true;
        self.config = config.clone();

        for preset in SamplerPreset::ALL {
            let handle = self.device.create_sampler(&preset.desc()).map_err(|e| {
                engine_error!(self.diagnostics, LOG_SOURCE, "Failed to create sampler {}: {}", preset, e);
                e
            })?;
            self.samplers.insert(preset, handle);
        }

        engine_info!(self.diagnostics, LOG_SOURCE, "Renderer initialized on {} ({} samplers, vsync {})",
            self.device.driver_name(), self.samplers.len(), if config.vsync { "on" } else { "off" });
        Ok(())
    }

    /// Process the named shader program and build the pipeline
    ///
    /// Only one pipeline exists per renderer; a second call fails.
    pub fn create_graphics_pipeline(&mut self, info: &GraphicsPipelineCreateInfo) -> Result<BuiltPipeline> {
        if !self.initialized {
            return Err(Error::PipelineCreation("renderer is not initialized".to_string()));
        }
        if self.pipeline.is_some() {
            return Err(Error::PipelineCreation(format!(
                "cannot create pipeline '{}': a pipeline already exists",
                info.shader_name
            )));
        }

        let processed = self.shaders.process(&info.shader_name)?;
        let shaders = processed.pipeline_shaders()?;
        let built = PipelineBuilder::new(self.device.as_mut(), &self.config, &self.diagnostics).build(info, shaders)?;

        self.pipeline = Some(built);
        Ok(built)
    }

    /// Begin a one-shot command buffer over the pipeline's shared buffers
    pub fn acquire_command_buffer(&mut self) -> Result<CommandBuffer<'_>> {
        if !self.initialized {
            return Err(Error::InvalidResource("renderer is not initialized".to_string()));
        }
        let vertex_buffer = self.pipeline.map(|built| built.vertex_buffer);
        let index_buffer = self.pipeline.map(|built| built.index_buffer);
        CommandBuffer::begin(self.device.as_mut(), vertex_buffer, index_buffer)
    }

    /// Sampler created for `preset`
    pub fn sampler(&self, preset: SamplerPreset) -> Option<SamplerHandle> {
        self.samplers.get(&preset).copied()
    }

    /// The pipeline, once created
    pub fn pipeline(&self) -> Option<&BuiltPipeline> {
        self.pipeline.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn shader_processor(&self) -> &ShaderScriptProcessor {
        &self.shaders
    }

    /// Release everything created on the device, then the device itself
    ///
    /// Order: samplers, vertex buffer, index buffer, pipeline, window claim,
    /// window, device. Calling it again does nothing.
    pub fn clean(&mut self) {
        if !self.initialized {
            return;
        }

        for (preset, handle) in std::mem::take(&mut self.samplers) {
            engine_debug!(self.diagnostics, LOG_SOURCE, "Releasing sampler {}", preset);
            self.device.release_sampler(handle);
        }

        if let Some(built) = self.pipeline.take() {
            self.device.release_buffer(built.vertex_buffer.handle);
            self.device.release_buffer(built.index_buffer.handle);
            self.device.release_pipeline(built.pipeline);
        }

        self.device.release_window_from_device();
        self.device.destroy_window();
        self.device.destroy_device();
        self.initialized = false;

        engine_info!(self.diagnostics, LOG_SOURCE, "Renderer cleaned up");
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.clean();
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
