/// Buffer - Vulkan implementation of the device Buffer trait

use parallax_cull::parallax::Result;
use parallax_cull::parallax::device::{Buffer as DeviceBuffer, BufferUsage};
use parallax_cull::{cull_bail, cull_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_device::DeviceShared;

const TARGET: &str = "parallax::VulkanDevice";

/// Vulkan buffer implementation
///
/// Host access goes through the persistently mapped allocation;
/// `MAP_READ`/`MAP_WRITE` buffers live in host-visible memory.
pub struct Buffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Device-wide registry; the buffer deregisters itself on drop
    shared: Arc<DeviceShared>,
    id: u64,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
}

impl Buffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        shared: Arc<DeviceShared>,
        id: u64,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        usage: BufferUsage,
    ) -> Self {
        Self {
            ctx,
            shared,
            id,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        }
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        let Some(allocation) = &self.allocation else {
            return Err(cull_err!(TARGET, "buffer has no GPU allocation"));
        };
        match allocation.mapped_ptr() {
            Some(ptr) => Ok(ptr.as_ptr() as *mut u8),
            None => Err(cull_err!(TARGET, "buffer memory is not CPU-accessible")),
        }
    }
}

impl DeviceBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.usage.contains(BufferUsage::MAP_WRITE) {
            cull_bail!(TARGET, "update on a buffer created without MAP_WRITE");
        }
        if offset + data.len() as u64 > self.size {
            cull_bail!(TARGET,
                "update of {} bytes at offset {} exceeds buffer size {}",
                data.len(), offset, self.size);
        }

        let mapped_ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.offset(offset as isize),
                data.len(),
            );
        }
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        if !self.usage.contains(BufferUsage::MAP_READ) {
            cull_bail!(TARGET, "read on a buffer created without MAP_READ");
        }
        if offset + out.len() as u64 > self.size {
            cull_bail!(TARGET,
                "read of {} bytes at offset {} exceeds buffer size {}",
                out.len(), offset, self.size);
        }

        let mapped_ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                mapped_ptr.offset(offset as isize),
                out.as_mut_ptr(),
                out.len(),
            );
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.shared.live.lock().unwrap().remove(&self.id);

        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
