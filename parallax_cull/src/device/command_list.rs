/// CommandList trait - for recording compute commands

use std::sync::Arc;
use crate::error::Result;
use crate::device::{Kernel, Buffer, BindingGroup};

/// Command list for recording compute commands
///
/// Commands are recorded and later submitted to the device via
/// ComputeDevice::submit(). Recording order is execution order.
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Bind a compute kernel
    ///
    /// Subsequent push_constants and dispatch calls apply to this kernel.
    ///
    /// # Arguments
    ///
    /// * `kernel` - Kernel to bind
    fn bind_kernel(&mut self, kernel: &Arc<dyn Kernel>) -> Result<()>;

    /// Bind a binding group to the bound kernel
    ///
    /// Binding groups are immutable sets of GPU resource bindings.
    /// This method binds a binding group at the given set index.
    ///
    /// # Arguments
    ///
    /// * `set_index` - Set index (culling kernels use set 0)
    /// * `binding_group` - The binding group to bind
    fn bind_binding_group(
        &mut self,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()>;

    /// Push constants to the bound kernel
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset in bytes into the push constant range
    /// * `data` - Data to push
    fn push_constants(&mut self, offset: u32, data: &[u8]) -> Result<()>;

    /// Dispatch the bound kernel
    ///
    /// # Arguments
    ///
    /// * `group_count_x` - Number of workgroups in X
    /// * `group_count_y` - Number of workgroups in Y
    /// * `group_count_z` - Number of workgroups in Z
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()>;

    /// Barrier making kernel writes to `buffer` visible to later commands
    /// in this list and to the host after `wait_idle`.
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer written by a preceding dispatch
    fn buffer_barrier(&mut self, buffer: &Arc<dyn Buffer>) -> Result<()>;
}
