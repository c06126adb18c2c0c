/// ComputeDevice trait - main compute factory interface

use std::sync::Arc;

use crate::error::Result;
use crate::device::{
    Buffer, BufferDesc, Kernel, KernelDesc, CommandList,
    BindingGroup, BindingResource,
};

// ============================================================================
// Configuration and statistics
// ============================================================================

/// Compute device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Worker threads for the software backend (0 = one per core)
    pub worker_threads: usize,
    /// Optional allocation budget in bytes; create_buffer fails with
    /// OutOfMemory once live buffer bytes would exceed it
    pub memory_budget: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Parallax Application".to_string(),
            worker_threads: 0,
            memory_budget: None,
        }
    }
}

/// Compute device statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeDeviceStats {
    /// Buffers currently alive
    pub live_buffers: u32,
    /// Bytes held by live buffers
    pub live_buffer_bytes: u64,
    /// Command list submissions since creation
    pub submits: u64,
    /// Kernel dispatches executed since creation
    pub dispatches: u64,
}

// ============================================================================
// ComputeDevice trait
// ============================================================================

/// Main compute device trait
///
/// This is the central factory interface for creating compute resources.
/// Implemented by backend-specific devices (e.g., VulkanDevice, SoftwareDevice).
pub trait ComputeDevice: Send + Sync {
    /// Create a buffer
    ///
    /// # Arguments
    ///
    /// * `desc` - Buffer descriptor
    ///
    /// # Returns
    ///
    /// A shared pointer to the created buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a compute kernel
    ///
    /// # Arguments
    ///
    /// * `desc` - Kernel descriptor
    ///
    /// # Returns
    ///
    /// A shared pointer to the created kernel
    fn create_kernel(&mut self, desc: KernelDesc) -> Result<Arc<dyn Kernel>>;

    /// Create a binding group for a kernel's set 0
    ///
    /// Resources are matched positionally against the kernel's binding
    /// slots; count and type mismatches are rejected.
    ///
    /// # Arguments
    ///
    /// * `kernel` - Kernel whose layout the group is created for
    /// * `resources` - One resource per binding slot, in binding order
    fn create_binding_group(
        &self,
        kernel: &Arc<dyn Kernel>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Create a command list for recording compute commands
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit recorded command lists for execution
    ///
    /// # Arguments
    ///
    /// * `commands` - Command lists, executed in order
    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()>;

    /// Wait for all submitted work to complete
    ///
    /// Buffer readback is only defined after this returns Ok.
    fn wait_idle(&self) -> Result<()>;

    /// Get statistics about the device
    fn stats(&self) -> ComputeDeviceStats;
}
