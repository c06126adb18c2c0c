/// BindingGroup - Vulkan implementation of the device BindingGroup trait

use parallax_cull::parallax::device::{BindingGroup as DeviceBindingGroup, Buffer as DeviceBuffer};
use ash::vk;
use std::sync::Arc;

/// Vulkan binding group implementation
///
/// Wraps a VkDescriptorSet handle. The descriptor set itself is managed
/// by the descriptor pool and will be freed when the pool is destroyed.
/// Immutable after creation — create a new BindingGroup to change resources.
pub struct BindingGroup {
    /// Vulkan descriptor set handle
    pub(crate) descriptor_set: vk::DescriptorSet,
    /// Set index this binding group was created for
    pub(crate) set_index: u32,
    /// Bound buffers in binding order; the Arcs keep them alive for as
    /// long as the group exists
    _buffers: Vec<Arc<dyn DeviceBuffer>>,
}

impl BindingGroup {
    pub(crate) fn new(
        descriptor_set: vk::DescriptorSet,
        set_index: u32,
        buffers: Vec<Arc<dyn DeviceBuffer>>,
    ) -> Self {
        Self {
            descriptor_set,
            set_index,
            _buffers: buffers,
        }
    }
}

impl DeviceBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        // Descriptor sets are automatically freed when the descriptor pool is destroyed.
        // No explicit cleanup needed here.
    }
}
