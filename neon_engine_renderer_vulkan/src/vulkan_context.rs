/// GpuContext - device state shared by every Vulkan object
///
/// Objects keep an `Arc<GpuContext>` so they can destroy themselves on
/// drop. Instance, surface and device destruction belong to
/// `VulkanGraphicsDevice`, which only tears the context down once it holds
/// the last reference.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

pub(crate) struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue, also used for uploads
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Command pool for one-shot upload command buffers
    /// (TRANSIENT + RESET_COMMAND_BUFFER)
    pub upload_command_pool: vk::CommandPool,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            graphics_queue_family,
            upload_command_pool,
        }
    }

    /// Destroy the upload pool and the allocator, then the device
    ///
    /// # Safety
    ///
    /// Every object created on the device must already be destroyed and the
    /// context must not be used afterwards.
    pub unsafe fn destroy(&mut self) {
        self.device.device_wait_idle().ok();
        self.device.destroy_command_pool(self.upload_command_pool, None);
        self.upload_command_pool = vk::CommandPool::null();
        ManuallyDrop::drop(&mut self.allocator);
        self.device.destroy_device(None);
    }
}
