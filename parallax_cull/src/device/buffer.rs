/// Buffer trait and buffer descriptor

use bitflags::bitflags;

use crate::error::Result;

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        /// Storage buffer (read/write for compute kernels)
        const STORAGE = 0x01;
        /// Uniform buffer (read-only structured data)
        const UNIFORM = 0x02;
        /// CPU can read the buffer contents back after `wait_idle`
        const MAP_READ = 0x04;
        /// CPU can write into the buffer via `update`
        const MAP_WRITE = 0x08;
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Update buffer data
    ///
    /// Requires the MAP_WRITE usage flag.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read buffer data back to the CPU
    ///
    /// Requires the MAP_READ usage flag. Contents written by kernels are
    /// only defined after a completed `wait_idle` on the owning device.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `out` - Destination slice, filled entirely
    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage flags the buffer was created with
    fn usage(&self) -> BufferUsage;
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
