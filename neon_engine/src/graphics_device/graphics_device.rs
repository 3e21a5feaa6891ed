/// GraphicsDevice trait - backend entry points used by the pipeline builder
/// and the renderer

use slotmap::new_key_type;

use crate::error::Result;
use crate::graphics_device::{
    BufferDesc, PipelineObjectDesc, SamplerDesc, ShaderObjectDesc, TextureFormat,
};

new_key_type! {
    /// Shader object handle
    pub struct ShaderHandle;
    /// Pipeline object handle
    pub struct PipelineHandle;
    /// Buffer handle
    pub struct BufferHandle;
    /// Sampler handle
    pub struct SamplerHandle;
    /// Command buffer handle, valid until submitted or discarded
    pub struct CommandBufferHandle;
}

/// Device and renderer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Synchronize presentation with the display refresh
    pub vsync: bool,
    /// Capacity of the shared vertex buffer, in vertices
    pub max_vertex_buffer_elements: u32,
    /// Capacity of the shared index buffer, in indices
    pub max_index_buffer_elements: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Neon".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            vsync: true,
            max_vertex_buffer_elements: 10000,
            max_index_buffer_elements: 10000,
        }
    }
}

/// Per-stage resource limits of a device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceLimits {
    /// Sampler slots per stage
    pub max_samplers_per_stage: u32,
    /// Uniform buffer slots per stage
    pub max_uniform_buffers_per_stage: u32,
    /// Largest supported anisotropy level
    pub max_sampler_anisotropy: f32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_samplers_per_stage: 16,
            max_uniform_buffers_per_stage: 12,
            max_sampler_anisotropy: 16.0,
        }
    }
}

/// Graphics device trait
///
/// The device exclusively owns every GPU object it creates. Handles are
/// plain keys; releasing an unknown or already released handle is a no-op.
/// Creation calls fail instead of returning null objects.
pub trait GraphicsDevice: Send {
    /// Create the device, claim its window and prepare for resource creation
    fn init(&mut self, config: &Config) -> Result<()>;

    /// Name of the driver in use
    fn driver_name(&self) -> &str;

    /// Resource limits
    fn limits(&self) -> DeviceLimits;

    /// Format of the surface presented to the screen
    ///
    /// Fails when the surface has no usable format.
    fn query_output_color_format(&self) -> Result<TextureFormat>;

    /// Format of the depth attachment pipelines render with
    fn depth_format(&self) -> TextureFormat;

    /// Create a shader object
    fn create_shader(&mut self, desc: &ShaderObjectDesc<'_>) -> Result<ShaderHandle>;

    /// Create a graphics pipeline
    fn create_pipeline(&mut self, desc: &PipelineObjectDesc<'_>) -> Result<PipelineHandle>;

    /// Create a zero-initialized GPU buffer
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle>;

    /// Create a sampler
    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle>;

    /// Begin recording a one-shot command buffer
    fn begin_commands(&mut self) -> Result<CommandBufferHandle>;

    /// Record an upload of `data` into `buffer` at byte `offset`
    fn cmd_upload_buffer(
        &mut self,
        commands: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<()>;

    /// Submit recorded commands and block until the GPU finished them
    ///
    /// The handle is consumed whether or not submission succeeds.
    fn submit_and_wait(&mut self, commands: CommandBufferHandle) -> Result<()>;

    /// Drop recorded commands without submitting them
    fn discard_commands(&mut self, commands: CommandBufferHandle);

    /// Release a shader object
    fn release_shader(&mut self, shader: ShaderHandle);

    /// Release a pipeline
    fn release_pipeline(&mut self, pipeline: PipelineHandle);

    /// Release a buffer
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Release a sampler
    fn release_sampler(&mut self, sampler: SamplerHandle);

    /// Detach the window from the device
    fn release_window_from_device(&mut self);

    /// Destroy the window
    fn destroy_window(&mut self);

    /// Destroy the device
    fn destroy_device(&mut self);
}
