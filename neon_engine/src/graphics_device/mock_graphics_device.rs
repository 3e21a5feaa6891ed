/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Records every call in an ordered event log and keeps buffer contents in
/// memory so tests can inspect uploads. State lives behind an `Arc` so a
/// `MockDeviceObserver` can observe the device after it was boxed and handed
/// to a renderer.

use std::sync::{Arc, Mutex, MutexGuard};
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferDesc, BufferHandle, BufferUsage, CommandBufferHandle, Config, DeviceLimits,
    GraphicsDevice, PipelineHandle, PipelineObjectDesc, PrimitiveType, SamplerDesc,
    SamplerHandle, ShaderHandle, ShaderObjectDesc, TextureFormat,
};
use crate::shader::ShaderStage;

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Init,
    CreateShader { stage: ShaderStage, num_samplers: u32, num_uniform_buffers: u32 },
    CreatePipeline { primitive_type: PrimitiveType, color_format: TextureFormat },
    CreateBuffer { name: String, size: u64, usage: BufferUsage },
    CreateSampler(SamplerDesc),
    BeginCommands,
    UploadBuffer { buffer: BufferHandle, offset: u64, len: usize },
    SubmitAndWait,
    DiscardCommands,
    ReleaseShader(ShaderHandle),
    ReleasePipeline(PipelineHandle),
    ReleaseBuffer(BufferHandle),
    ReleaseSampler(SamplerHandle),
    ReleaseWindowFromDevice,
    DestroyWindow,
    DestroyDevice,
    /// A release call named a handle that is not alive
    InvalidRelease(String),
}

/// Call that the mock should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Init,
    ColorFormat,
    VertexShader,
    FragmentShader,
    Pipeline,
    Buffer(BufferUsage),
    Sampler,
    Submit,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub name: String,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    events: Vec<DeviceEvent>,
    failures: Vec<MockFailure>,
    shaders: SlotMap<ShaderHandle, ShaderStage>,
    pipelines: SlotMap<PipelineHandle, ()>,
    buffers: SlotMap<BufferHandle, MockBuffer>,
    samplers: SlotMap<SamplerHandle, SamplerDesc>,
    commands: SlotMap<CommandBufferHandle, Vec<(BufferHandle, u64, Vec<u8>)>>,
    window_attached: bool,
    window_alive: bool,
    device_alive: bool,
}

impl MockState {
    fn fails(&self, failure: MockFailure) -> bool {
        self.failures.contains(&failure)
    }
}

// ============================================================================
// Device
// ============================================================================

#[derive(Debug, Default)]
pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockState>>,
    limits: DeviceLimits,
}

/// Read access to a mock device's state
#[derive(Debug, Clone)]
pub struct MockDeviceObserver {
    state: Arc<Mutex<MockState>>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        let device = Self::default();
        if let Ok(mut state) = device.state.lock() {
            state.window_alive = true;
        }
        device
    }

    /// Fail the given call from now on
    pub fn fail_on(self, failure: MockFailure) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push(failure);
        }
        self
    }

    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn observer(&self) -> MockDeviceObserver {
        MockDeviceObserver { state: self.state.clone() }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MockDeviceObserver {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every recorded event, in call order
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.state().events.clone()
    }

    /// Contents of the live buffer named `name`
    pub fn buffer_data(&self, name: &str) -> Option<Vec<u8>> {
        self.state()
            .buffers
            .values()
            .find(|buffer| buffer.name == name)
            .map(|buffer| buffer.data.clone())
    }

    pub fn live_shaders(&self) -> usize {
        self.state().shaders.len()
    }

    pub fn live_pipelines(&self) -> usize {
        self.state().pipelines.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state().buffers.len()
    }

    pub fn live_samplers(&self) -> usize {
        self.state().samplers.len()
    }

    pub fn pending_commands(&self) -> usize {
        self.state().commands.len()
    }

    pub fn device_alive(&self) -> bool {
        self.state().device_alive
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn init(&mut self, _config: &Config) -> Result<()> {
        let mut state = self.state();
        state.events.push(DeviceEvent::Init);
        if state.fails(MockFailure::Init) {
            return Err(Error::InitializationFailed("mock init failure".to_string()));
        }
        state.device_alive = true;
        state.window_attached = true;
        Ok(())
    }

    fn driver_name(&self) -> &str {
        "mock"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn query_output_color_format(&self) -> Result<TextureFormat> {
        if self.state().fails(MockFailure::ColorFormat) {
            return Err(Error::PipelineCreation("no swapchain format".to_string()));
        }
        Ok(TextureFormat::B8G8R8A8_UNORM)
    }

    fn depth_format(&self) -> TextureFormat {
        TextureFormat::D32_FLOAT
    }

    fn create_shader(&mut self, desc: &ShaderObjectDesc<'_>) -> Result<ShaderHandle> {
        let mut state = self.state();
        state.events.push(DeviceEvent::CreateShader {
            stage: desc.stage,
            num_samplers: desc.num_samplers,
            num_uniform_buffers: desc.num_uniform_buffers,
        });
        let failure = match desc.stage {
            ShaderStage::Vertex => MockFailure::VertexShader,
            _ => MockFailure::FragmentShader,
        };
        if state.fails(failure) {
            return Err(Error::BackendError(format!("mock {} shader failure", desc.stage)));
        }
        Ok(state.shaders.insert(desc.stage))
    }

    fn create_pipeline(&mut self, desc: &PipelineObjectDesc<'_>) -> Result<PipelineHandle> {
        let mut state = self.state();
        state.events.push(DeviceEvent::CreatePipeline {
            primitive_type: desc.primitive_type,
            color_format: desc.color_target.format,
        });
        if state.fails(MockFailure::Pipeline) {
            return Err(Error::BackendError("mock pipeline failure".to_string()));
        }
        for shader in [desc.vertex_shader, desc.fragment_shader] {
            if !state.shaders.contains_key(shader) {
                return Err(Error::InvalidResource("pipeline uses a dead shader".to_string()));
            }
        }
        Ok(state.pipelines.insert(()))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        let mut state = self.state();
        state.events.push(DeviceEvent::CreateBuffer {
            name: desc.name.clone(),
            size: desc.size,
            usage: desc.usage,
        });
        if state.fails(MockFailure::Buffer(desc.usage)) {
            return Err(Error::OutOfMemory);
        }
        Ok(state.buffers.insert(MockBuffer {
            name: desc.name.clone(),
            usage: desc.usage,
            data: vec![0; desc.size as usize],
        }))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let mut state = self.state();
        state.events.push(DeviceEvent::CreateSampler(*desc));
        if state.fails(MockFailure::Sampler) {
            return Err(Error::BackendError("mock sampler failure".to_string()));
        }
        Ok(state.samplers.insert(*desc))
    }

    fn begin_commands(&mut self) -> Result<CommandBufferHandle> {
        let mut state = self.state();
        state.events.push(DeviceEvent::BeginCommands);
        Ok(state.commands.insert(Vec::new()))
    }

    fn cmd_upload_buffer(
        &mut self,
        commands: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<()> {
        let mut state = self.state();
        state.events.push(DeviceEvent::UploadBuffer { buffer, offset, len: data.len() });
        match state.commands.get_mut(commands) {
            Some(recorded) => {
                recorded.push((buffer, offset, data.to_vec()));
                Ok(())
            }
            None => Err(Error::InvalidResource("unknown command buffer".to_string())),
        }
    }

    fn submit_and_wait(&mut self, commands: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.events.push(DeviceEvent::SubmitAndWait);
        let recorded = state
            .commands
            .remove(commands)
            .ok_or_else(|| Error::InvalidResource("unknown command buffer".to_string()))?;
        if state.fails(MockFailure::Submit) {
            return Err(Error::BackendError("mock submit failure".to_string()));
        }

        for (buffer, offset, data) in recorded {
            let target = state
                .buffers
                .get_mut(buffer)
                .ok_or_else(|| Error::InvalidResource("upload into a dead buffer".to_string()))?;
            let start = offset as usize;
            target.data[start..start + data.len()].copy_from_slice(&data);
        }
        Ok(())
    }

    fn discard_commands(&mut self, commands: CommandBufferHandle) {
        let mut state = self.state();
        state.events.push(DeviceEvent::DiscardCommands);
        state.commands.remove(commands);
    }

    fn release_shader(&mut self, shader: ShaderHandle) {
        let mut state = self.state();
        let event = match state.shaders.remove(shader) {
            Some(_) => DeviceEvent::ReleaseShader(shader),
            None => DeviceEvent::InvalidRelease(format!("{:?}", shader)),
        };
        state.events.push(event);
    }

    fn release_pipeline(&mut self, pipeline: PipelineHandle) {
        let mut state = self.state();
        let event = match state.pipelines.remove(pipeline) {
            Some(_) => DeviceEvent::ReleasePipeline(pipeline),
            None => DeviceEvent::InvalidRelease(format!("{:?}", pipeline)),
        };
        state.events.push(event);
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        let mut state = self.state();
        let event = match state.buffers.remove(buffer) {
            Some(_) => DeviceEvent::ReleaseBuffer(buffer),
            None => DeviceEvent::InvalidRelease(format!("{:?}", buffer)),
        };
        state.events.push(event);
    }

    fn release_sampler(&mut self, sampler: SamplerHandle) {
        let mut state = self.state();
        let event = match state.samplers.remove(sampler) {
            Some(_) => DeviceEvent::ReleaseSampler(sampler),
            None => DeviceEvent::InvalidRelease(format!("{:?}", sampler)),
        };
        state.events.push(event);
    }

    fn release_window_from_device(&mut self) {
        let mut state = self.state();
        let event = if state.window_attached {
            DeviceEvent::ReleaseWindowFromDevice
        } else {
            DeviceEvent::InvalidRelease("window claim".to_string())
        };
        state.window_attached = false;
        state.events.push(event);
    }

    fn destroy_window(&mut self) {
        let mut state = self.state();
        let event = if state.window_alive {
            DeviceEvent::DestroyWindow
        } else {
            DeviceEvent::InvalidRelease("window".to_string())
        };
        state.window_alive = false;
        state.events.push(event);
    }

    fn destroy_device(&mut self) {
        let mut state = self.state();
        let event = if state.device_alive {
            DeviceEvent::DestroyDevice
        } else {
            DeviceEvent::InvalidRelease("device".to_string())
        };
        state.device_alive = false;
        state.events.push(event);
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
