/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// The device claims its window at `init` by creating a surface on it.
/// Every object it creates lives in a slotmap keyed by the engine handle,
/// so releasing a handle twice finds nothing the second time.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use neon_engine::neon::log::Diagnostics;
use neon_engine::neon::render::{
    BufferDesc, BufferHandle, CommandBufferHandle, Config, DeviceLimits, GraphicsDevice, PipelineHandle,
    PipelineObjectDesc, SamplerDesc, SamplerHandle, ShaderHandle, ShaderObjectDesc, TextureFormat,
};
use neon_engine::neon::{Error, Result};
use neon_engine::{engine_debug, engine_err, engine_error, engine_info, engine_trace, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::SlotMap;
use std::ffi::CString;
use std::sync::Arc;
use winit::window::Window;

#[cfg(feature = "vulkan-validation")]
use crate::debug::{DebugMessenger, ValidationStats};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{buffer_usage_to_vk, shader_stage_to_vk, texture_format_from_vk};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_sampler::sampler_create_info;
use crate::vulkan_shader::Shader;

const LOG_SOURCE: &str = "neon::vulkan";
const DRIVER_NAME: &str = "vulkan";

/// Depth formats tried in order of preference
const DEPTH_FORMAT_CANDIDATES: [(vk::Format, TextureFormat); 3] = [
    (vk::Format::D32_SFLOAT, TextureFormat::D32_FLOAT),
    (vk::Format::D24_UNORM_S8_UINT, TextureFormat::D24_UNORM_S8_UINT),
    (vk::Format::D16_UNORM, TextureFormat::D16_UNORM),
];

/// Recorded upload commands and the staging buffers they read from
struct PendingCommands {
    command_buffer: vk::CommandBuffer,
    staging: Vec<Buffer>,
}

/// Everything that exists between `init` and `destroy_device`
struct DeviceState {
    /// Vulkan entry (keeps the loader library alive)
    _entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    /// Window surface, null once the window is released from the device
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    limits: DeviceLimits,
    depth_format: TextureFormat,
    ctx: Arc<GpuContext>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<DebugMessenger>,
}

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    window: Option<Arc<Window>>,
    diagnostics: Diagnostics,
    state: Option<DeviceState>,
    shaders: SlotMap<ShaderHandle, Shader>,
    pipelines: SlotMap<PipelineHandle, Pipeline>,
    buffers: SlotMap<BufferHandle, Buffer>,
    samplers: SlotMap<SamplerHandle, vk::Sampler>,
    pending: SlotMap<CommandBufferHandle, PendingCommands>,
}

impl VulkanGraphicsDevice {
    /// Wrap `window`; nothing touches Vulkan until `init`
    pub fn new(window: Arc<Window>, diagnostics: Diagnostics) -> Self {
        Self {
            window: Some(window),
            diagnostics,
            state: None,
            shaders: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            pending: SlotMap::with_key(),
        }
    }

    /// Whether `init` succeeded and the device was not destroyed since
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Messages reported by the validation layers so far
    #[cfg(feature = "vulkan-validation")]
    pub fn validation_stats(&self) -> ValidationStats {
        self.state
            .as_ref()
            .and_then(|state| state.debug_messenger.as_ref())
            .map(|messenger| messenger.stats())
            .unwrap_or_default()
    }

    fn state(&self) -> Result<&DeviceState> {
        self.state
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("graphics device is not initialized".to_string()))
    }

    fn ctx(&self) -> Result<Arc<GpuContext>> {
        self.state().map(|state| Arc::clone(&state.ctx))
    }

    fn init_failed(&self, message: String) -> Error {
        engine_error!(self.diagnostics, LOG_SOURCE, "{}", message);
        Error::InitializationFailed(message)
    }

    unsafe fn create_instance(&self, entry: &ash::Entry, window: &Window, config: &Config, validation: bool) -> Result<ash::Instance> {
        let app_name = CString::new(config.app_name.as_str())
            .map_err(|_| self.init_failed(format!("Invalid application name '{}'", config.app_name)))?;
        let (major, minor, patch) = config.app_version;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(c"Neon")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let display_handle = window
            .display_handle()
            .map_err(|e| self.init_failed(format!("Failed to get display handle: {}", e)))?;
        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| self.init_failed(format!("Failed to get required extensions: {}", e)))?
            .to_vec();

        let layer_names = if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        entry
            .create_instance(&create_info, None)
            .map_err(|e| self.init_failed(format!("Failed to create Vulkan instance: {:?}", e)))
    }

    /// First GPU with a graphics queue family that can present to `surface`,
    /// discrete GPUs first
    unsafe fn pick_physical_device(
        &self,
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32)> {
        let mut physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| self.init_failed(format!("Failed to enumerate physical devices: {:?}", e)))?;

        physical_devices.sort_by_key(|&physical_device| {
            let properties = instance.get_physical_device_properties(physical_device);
            properties.device_type != vk::PhysicalDeviceType::DISCRETE_GPU
        });

        physical_devices
            .into_iter()
            .find_map(|physical_device| {
                instance
                    .get_physical_device_queue_family_properties(physical_device)
                    .iter()
                    .enumerate()
                    .find(|(index, family)| {
                        family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                            && surface_loader
                                .get_physical_device_surface_support(physical_device, *index as u32, surface)
                                .unwrap_or(false)
                    })
                    .map(|(index, _)| (physical_device, index as u32))
            })
            .ok_or_else(|| self.init_failed("No Vulkan GPU can render to this window".to_string()))
    }

    unsafe fn create_context(
        &self,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        graphics_family_index: u32,
    ) -> Result<GpuContext> {
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(graphics_family_index)
            .queue_priorities(&queue_priorities)];

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let supported = instance.get_physical_device_features(physical_device);
        let device_features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        let device = instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| self.init_failed(format!("Failed to create logical device: {:?}", e)))?;

        let graphics_queue = device.get_device_queue(graphics_family_index, 0);

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                device.destroy_device(None);
                return Err(self.init_failed(format!("Failed to create GPU allocator: {:?}", e)));
            }
        };

        let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let upload_command_pool = match device.create_command_pool(&upload_pool_create_info, None) {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                device.destroy_device(None);
                return Err(self.init_failed(format!("Failed to create upload command pool: {:?}", e)));
            }
        };

        Ok(GpuContext::new(
            device,
            allocator,
            graphics_queue,
            graphics_family_index,
            upload_command_pool,
        ))
    }

    unsafe fn device_limits(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> DeviceLimits {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        let limits = properties.limits;

        DeviceLimits {
            max_samplers_per_stage: limits.max_per_stage_descriptor_samplers,
            max_uniform_buffers_per_stage: limits.max_per_stage_descriptor_uniform_buffers,
            max_sampler_anisotropy: if features.sampler_anisotropy == vk::TRUE {
                limits.max_sampler_anisotropy
            } else {
                1.0
            },
        }
    }

    unsafe fn pick_depth_format(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Option<TextureFormat> {
        DEPTH_FORMAT_CANDIDATES.iter().find_map(|&(vk_format, format)| {
            let properties = instance.get_physical_device_format_properties(physical_device, vk_format);
            properties
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
                .then_some(format)
        })
    }

    unsafe fn create_state(&self, window: &Window, config: &Config) -> Result<DeviceState> {
        let entry = ash::Entry::load().map_err(|e| self.init_failed(format!("Failed to load Vulkan library: {:?}", e)))?;

        let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
        if config.enable_validation && !validation {
            engine_warn!(self.diagnostics, LOG_SOURCE,
                "Validation requested but the vulkan-validation feature is disabled");
        }

        let instance = self.create_instance(&entry, window, config, validation)?;

        #[cfg(feature = "vulkan-validation")]
        let debug_messenger = if validation {
            match DebugMessenger::new(&entry, &instance, self.diagnostics.clone()) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    instance.destroy_instance(None);
                    return Err(self.init_failed(e.to_string()));
                }
            }
        } else {
            None
        };

        // Tear down the instance-level objects created so far
        #[cfg(feature = "vulkan-validation")]
        let abort = |messenger: Option<DebugMessenger>| {
            if let Some(messenger) = messenger {
                messenger.destroy();
            }
            instance.destroy_instance(None);
        };
        #[cfg(not(feature = "vulkan-validation"))]
        let abort = |_: Option<()>| instance.destroy_instance(None);
        #[cfg(not(feature = "vulkan-validation"))]
        let debug_messenger: Option<()> = None;

        let handles = window
            .display_handle()
            .and_then(|display| window.window_handle().map(|handle| (display, handle)));
        let (display_handle, window_handle) = match handles {
            Ok(handles) => handles,
            Err(e) => {
                abort(debug_messenger);
                return Err(self.init_failed(format!("Failed to get window handles: {}", e)));
            }
        };

        let surface = match ash_window::create_surface(
            &entry,
            &instance,
            display_handle.as_raw(),
            window_handle.as_raw(),
            None,
        ) {
            Ok(surface) => surface,
            Err(e) => {
                abort(debug_messenger);
                return Err(self.init_failed(format!("Failed to create surface: {:?}", e)));
            }
        };
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let picked = self
            .pick_physical_device(&instance, &surface_loader, surface)
            .and_then(|(physical_device, family)| {
                self.create_context(&instance, physical_device, family)
                    .map(|ctx| (physical_device, ctx))
            });
        let (physical_device, mut ctx) = match picked {
            Ok(picked) => picked,
            Err(e) => {
                surface_loader.destroy_surface(surface, None);
                abort(debug_messenger);
                return Err(e);
            }
        };

        let depth_format = match Self::pick_depth_format(&instance, physical_device) {
            Some(format) => format,
            None => {
                ctx.destroy();
                surface_loader.destroy_surface(surface, None);
                abort(debug_messenger);
                return Err(self.init_failed("GPU supports no depth attachment format".to_string()));
            }
        };

        let limits = Self::device_limits(&instance, physical_device);
        let properties = instance.get_physical_device_properties(physical_device);
        let gpu_name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown GPU".to_string());
        engine_info!(self.diagnostics, LOG_SOURCE, "Vulkan device created on {} (queue family {}, depth {:?})",
            gpu_name, ctx.graphics_queue_family, depth_format);

        Ok(DeviceState {
            _entry: entry,
            instance,
            surface_loader,
            surface,
            physical_device,
            limits,
            depth_format,
            ctx: Arc::new(ctx),
            #[cfg(feature = "vulkan-validation")]
            debug_messenger,
        })
    }

    unsafe fn free_command_buffer(ctx: &GpuContext, command_buffer: vk::CommandBuffer) {
        ctx.device.free_command_buffers(ctx.upload_command_pool, &[command_buffer]);
    }

    unsafe fn submit_pending(&self, ctx: &GpuContext, pending: &PendingCommands) -> Result<()> {
        // Make the copies visible to vertex fetch and index reads
        let barrier = vk::MemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::VERTEX_ATTRIBUTE_READ | vk::AccessFlags::INDEX_READ);
        ctx.device.cmd_pipeline_barrier(
            pending.command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::VERTEX_INPUT,
            vk::DependencyFlags::empty(),
            &[barrier],
            &[],
            &[],
        );

        ctx.device
            .end_command_buffer(pending.command_buffer)
            .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to end upload command buffer: {:?}", e))?;

        let fence = ctx
            .device
            .create_fence(&vk::FenceCreateInfo::default(), None)
            .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to create upload fence: {:?}", e))?;

        let command_buffers = [pending.command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        let result = ctx
            .device
            .queue_submit(ctx.graphics_queue, &[submit_info], fence)
            .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to submit upload commands: {:?}", e))
            .and_then(|_| {
                ctx.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to wait for upload completion: {:?}", e))
            });

        ctx.device.destroy_fence(fence, None);
        result
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn init(&mut self, config: &Config) -> Result<()> {
        if self.state.is_some() {
            return Err(self.init_failed("Vulkan device is already initialized".to_string()));
        }
        let window = match &self.window {
            Some(window) => Arc::clone(window),
            None => return Err(self.init_failed("Window was destroyed before device init".to_string())),
        };

        let state = unsafe { self.create_state(&window, config)? };
        self.state = Some(state);
        Ok(())
    }

    fn driver_name(&self) -> &str {
        DRIVER_NAME
    }

    fn limits(&self) -> DeviceLimits {
        self.state.as_ref().map(|state| state.limits).unwrap_or_default()
    }

    fn query_output_color_format(&self) -> Result<TextureFormat> {
        let state = self.state()?;
        if state.surface == vk::SurfaceKHR::null() {
            return Err(Error::InvalidResource("window was released from the device".to_string()));
        }

        let formats = unsafe {
            state
                .surface_loader
                .get_physical_device_surface_formats(state.physical_device, state.surface)
        }
        .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to query surface formats: {:?}", e))?;

        let preferred = formats
            .iter()
            .find(|format| format.format == vk::Format::B8G8R8A8_UNORM)
            .or_else(|| formats.iter().find(|format| texture_format_from_vk(format.format).is_some()));

        preferred
            .and_then(|format| texture_format_from_vk(format.format))
            .ok_or_else(|| engine_err!(self.diagnostics, LOG_SOURCE, "Surface offers no supported color format"))
    }

    fn depth_format(&self) -> TextureFormat {
        self.state
            .as_ref()
            .map_or(TextureFormat::D32_FLOAT, |state| state.depth_format)
    }

    fn create_shader(&mut self, desc: &ShaderObjectDesc<'_>) -> Result<ShaderHandle> {
        let ctx = self.ctx()?;
        let stage = shader_stage_to_vk(desc.stage)?;
        if desc.code.is_empty() {
            return Err(engine_err!(self.diagnostics, LOG_SOURCE, "Empty SPIR-V for {} shader", desc.stage));
        }
        let entry_point = CString::new(desc.entry_point)
            .map_err(|_| Error::InvalidResource(format!("Invalid entry point '{}'", desc.entry_point)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(desc.code);
        let module = unsafe { ctx.device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to create {} shader module: {:?}", desc.stage, e))?;

        engine_trace!(self.diagnostics, LOG_SOURCE, "Created {} shader ({} samplers as {:?}, {} uniform buffers)",
            desc.stage, desc.num_samplers, desc.sampler_binding, desc.num_uniform_buffers);

        Ok(self.shaders.insert(Shader::new(ctx, module, stage, entry_point, desc.layout_bindings())))
    }

    fn create_pipeline(&mut self, desc: &PipelineObjectDesc<'_>) -> Result<PipelineHandle> {
        let ctx = self.ctx()?;
        let depth_format = self.depth_format();
        let (vertex_shader, fragment_shader) = match (
            self.shaders.get(desc.vertex_shader),
            self.shaders.get(desc.fragment_shader),
        ) {
            (Some(vertex), Some(fragment)) => (vertex, fragment),
            _ => return Err(Error::InvalidResource("pipeline references a released shader".to_string())),
        };

        let pipeline = Pipeline::new(
            ctx,
            desc,
            vertex_shader,
            fragment_shader,
            desc.color_target.format,
            depth_format,
        )
        .map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "{}", e);
            e
        })?;

        Ok(self.pipelines.insert(pipeline))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        let ctx = self.ctx()?;
        let buffer = Buffer::new(ctx, &desc.name, desc.size, buffer_usage_to_vk(desc.usage)).map_err(|e| {
            match &e {
                Error::OutOfMemory => {
                    let size_mb = desc.size as f64 / (1024.0 * 1024.0);
                    engine_error!(self.diagnostics, LOG_SOURCE, "Out of GPU memory for buffer '{}' (required: {:.2} MB)",
                        desc.name, size_mb);
                }
                other => engine_error!(self.diagnostics, LOG_SOURCE, "{}", other),
            }
            e
        })?;

        engine_debug!(self.diagnostics, LOG_SOURCE, "Created buffer '{}' ({} bytes)", desc.name, desc.size);
        Ok(self.buffers.insert(buffer))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let state = self.state()?;
        let create_info = sampler_create_info(desc, state.limits.max_sampler_anisotropy);

        let sampler = unsafe { state.ctx.device.create_sampler(&create_info, None) }
            .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to create sampler: {:?}", e))?;

        Ok(self.samplers.insert(sampler))
    }

    fn begin_commands(&mut self) -> Result<CommandBufferHandle> {
        let ctx = self.ctx()?;

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(ctx.upload_command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        unsafe {
            let command_buffer = ctx
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!(self.diagnostics, LOG_SOURCE, "Failed to allocate upload command buffer: {:?}", e))?
                .into_iter()
                .next()
                .ok_or_else(|| engine_err!(self.diagnostics, LOG_SOURCE, "Driver allocated no command buffer"))?;

            let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            if let Err(e) = ctx.device.begin_command_buffer(command_buffer, &begin_info) {
                Self::free_command_buffer(&ctx, command_buffer);
                return Err(engine_err!(self.diagnostics, LOG_SOURCE, "Failed to begin upload command buffer: {:?}", e));
            }

            Ok(self.pending.insert(PendingCommands {
                command_buffer,
                staging: Vec::new(),
            }))
        }
    }

    fn cmd_upload_buffer(
        &mut self,
        commands: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<()> {
        let ctx = self.ctx()?;
        let target = self
            .buffers
            .get(buffer)
            .ok_or_else(|| Error::InvalidResource("upload into a released buffer".to_string()))?;
        let pending = self
            .pending
            .get_mut(commands)
            .ok_or_else(|| Error::InvalidResource("upload into a consumed command buffer".to_string()))?;

        if data.is_empty() {
            return Ok(());
        }
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > target.size) {
            return Err(Error::InvalidResource(format!(
                "upload of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                target.size
            )));
        }

        let staging = Buffer::staging(ctx.clone(), data)?;
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: offset,
            size: data.len() as u64,
        };
        unsafe {
            ctx.device
                .cmd_copy_buffer(pending.command_buffer, staging.buffer, target.buffer, &[region]);
        }
        pending.staging.push(staging);
        Ok(())
    }

    fn submit_and_wait(&mut self, commands: CommandBufferHandle) -> Result<()> {
        let pending = self
            .pending
            .remove(commands)
            .ok_or_else(|| Error::InvalidResource("command buffer already consumed".to_string()))?;
        let ctx = self.ctx()?;

        unsafe {
            let result = self.submit_pending(&ctx, &pending);
            Self::free_command_buffer(&ctx, pending.command_buffer);
            result
        }
    }

    fn discard_commands(&mut self, commands: CommandBufferHandle) {
        if let (Some(pending), Some(state)) = (self.pending.remove(commands), self.state.as_ref()) {
            unsafe { Self::free_command_buffer(&state.ctx, pending.command_buffer) };
        }
    }

    fn release_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(shader);
    }

    fn release_pipeline(&mut self, pipeline: PipelineHandle) {
        self.pipelines.remove(pipeline);
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(buffer);
    }

    fn release_sampler(&mut self, sampler: SamplerHandle) {
        if let (Some(sampler), Some(state)) = (self.samplers.remove(sampler), self.state.as_ref()) {
            unsafe { state.ctx.device.destroy_sampler(sampler, None) };
        }
    }

    fn release_window_from_device(&mut self) {
        if let Some(state) = self.state.as_mut() {
            if state.surface != vk::SurfaceKHR::null() {
                unsafe {
                    state.ctx.device.device_wait_idle().ok();
                    state.surface_loader.destroy_surface(state.surface, None);
                }
                state.surface = vk::SurfaceKHR::null();
                engine_debug!(self.diagnostics, LOG_SOURCE, "Window released from device");
            }
        }
    }

    fn destroy_window(&mut self) {
        if self.window.take().is_some() {
            engine_debug!(self.diagnostics, LOG_SOURCE, "Window destroyed");
        }
    }

    fn destroy_device(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };

        unsafe {
            state.ctx.device.device_wait_idle().ok();

            for (_, pending) in self.pending.drain() {
                Self::free_command_buffer(&state.ctx, pending.command_buffer);
            }
            for (_, sampler) in self.samplers.drain() {
                state.ctx.device.destroy_sampler(sampler, None);
            }
            // Dropping the objects releases their GPU memory and handles
            self.pipelines.clear();
            self.shaders.clear();
            self.buffers.clear();

            match Arc::get_mut(&mut state.ctx) {
                Some(ctx) => ctx.destroy(),
                None => engine_error!(self.diagnostics, LOG_SOURCE,
                    "GPU context still shared at device destruction; leaking logical device"),
            }

            if state.surface != vk::SurfaceKHR::null() {
                state.surface_loader.destroy_surface(state.surface, None);
            }

            #[cfg(feature = "vulkan-validation")]
            if let Some(messenger) = state.debug_messenger.take() {
                let stats = messenger.stats();
                if stats.errors > 0 || stats.warnings > 0 {
                    engine_warn!(self.diagnostics, LOG_SOURCE, "Validation reported {} errors and {} warnings",
                        stats.errors, stats.warnings);
                }
                messenger.destroy();
            }

            state.instance.destroy_instance(None);
        }

        engine_info!(self.diagnostics, LOG_SOURCE, "Vulkan device destroyed");
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        self.destroy_device();
    }
}
