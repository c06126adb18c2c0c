/// Kernel - Vulkan implementation of the device Kernel trait

use parallax_cull::parallax::device::{BindingSlotDesc, Kernel as DeviceKernel};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan compute kernel implementation
///
/// Owns the compute pipeline, its layout, and the set-0 descriptor set
/// layout. The shader module is destroyed right after pipeline creation;
/// only the pipeline state lives on.
pub struct Kernel {
    /// Shared GPU context (for cleanup)
    ctx: Arc<GpuContext>,
    /// Compute pipeline with the workgroup size baked in
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (descriptor set layout + push constant range)
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// Descriptor set layout for binding group allocation
    pub(crate) descriptor_set_layout: vk::DescriptorSetLayout,
    /// Binding slots from the descriptor, kept for binding group validation
    pub(crate) bindings: Vec<BindingSlotDesc>,
    pub(crate) push_constant_size: u32,
    name: String,
    local_size: u32,
}

impl Kernel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        descriptor_set_layout: vk::DescriptorSetLayout,
        bindings: Vec<BindingSlotDesc>,
        push_constant_size: u32,
        name: String,
        local_size: u32,
    ) -> Self {
        Self {
            ctx,
            pipeline,
            pipeline_layout,
            descriptor_set_layout,
            bindings,
            push_constant_size,
            name,
            local_size,
        }
    }
}

impl DeviceKernel for Kernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_size(&self) -> u32 {
        self.local_size
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx.device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}
