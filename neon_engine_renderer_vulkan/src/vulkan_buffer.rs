/// Buffer - host-visible Vulkan buffer with its gpu-allocator allocation

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use neon_engine::neon::{Error, Result};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub(crate) struct Buffer {
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Buffer size in bytes
    pub(crate) size: u64,
}

impl Buffer {
    /// Create a CpuToGpu buffer of `size` bytes, zero-filled
    pub(crate) fn new(ctx: Arc<GpuContext>, name: &str, size: u64, usage: vk::BufferUsageFlags) -> Result<Self> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_create_info, None).map_err(|e| {
                Error::BackendError(format!("Failed to create buffer '{}' of {} bytes: {:?}", name, size, e))
            })?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = {
                let mut allocator = match ctx.allocator.lock() {
                    Ok(allocator) => allocator,
                    Err(_) => {
                        ctx.device.destroy_buffer(buffer, None);
                        return Err(Error::BackendError("GPU allocator lock poisoned".to_string()));
                    }
                };
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(Error::OutOfMemory);
                }
            };

            // From here on Drop releases both the allocation and the buffer
            let mut created = Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size,
            };

            created
                .ctx
                .device
                .bind_buffer_memory(buffer, created.memory(), created.memory_offset())
                .map_err(|e| Error::BackendError(format!("Failed to bind memory of buffer '{}': {:?}", name, e)))?;

            created.mapped_mut()?.fill(0);
            Ok(created)
        }
    }

    /// Staging source holding a copy of `data`
    pub(crate) fn staging(ctx: Arc<GpuContext>, data: &[u8]) -> Result<Self> {
        let mut staging = Self::new(ctx, "staging", data.len() as u64, vk::BufferUsageFlags::TRANSFER_SRC)?;
        staging.mapped_mut()?[..data.len()].copy_from_slice(data);
        Ok(staging)
    }

    fn memory(&self) -> vk::DeviceMemory {
        self.allocation
            .as_ref()
            .map_or(vk::DeviceMemory::null(), |allocation| unsafe { allocation.memory() })
    }

    fn memory_offset(&self) -> u64 {
        self.allocation.as_ref().map_or(0, |allocation| allocation.offset())
    }

    /// Host view of the buffer memory
    fn mapped_mut(&mut self) -> Result<&mut [u8]> {
        let size = self.size as usize;
        self.allocation
            .as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .map(|slice| &mut slice[..size])
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
