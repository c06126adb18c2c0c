/// CommandList - Vulkan implementation of the device CommandList trait

use parallax_cull::parallax::{Result, Error};
use parallax_cull::parallax::device::{
    CommandList as DeviceCommandList,
    Kernel as DeviceKernel,
    Buffer as DeviceBuffer,
    BindingGroup as DeviceBindingGroup,
};
use parallax_cull::cull_error;
use ash::vk;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_kernel::Kernel;

const TARGET: &str = "parallax::VulkanDevice";

/// Vulkan command list implementation
///
/// Records compute commands for later submission to the GPU. All bound
/// resources must originate from the same VulkanDevice.
pub struct CommandList {
    /// Vulkan device
    device: Arc<ash::Device>,
    /// Command pool for allocating command buffers
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    pub(crate) is_recording: bool,
    /// Layout and push constant range of the bound kernel
    bound_kernel: Option<(vk::PipelineLayout, u32)>,
    /// Whether a binding group was bound since the last bind_kernel
    group_bound: bool,
    /// Dispatches recorded since begin(), drained into device stats at submit
    pub(crate) dispatch_count: u64,
}

impl CommandList {
    /// Create a new command list with its own command pool
    pub(crate) fn new(device: Arc<ash::Device>, compute_queue_family: u32) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(compute_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to create command pool: {:?}", e);
                    Error::BackendError(format!("Failed to create command pool: {:?}", e))
                })?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = device.allocate_command_buffers(&command_buffer_allocate_info)
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to allocate command buffer: {:?}", e);
                    Error::BackendError(format!("Failed to allocate command buffers: {:?}", e))
                })?;

            Ok(Self {
                device,
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                bound_kernel: None,
                group_bound: false,
                dispatch_count: 0,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

impl DeviceCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device
                .reset_command_buffer(
                    self.command_buffer,
                    vk::CommandBufferResetFlags::empty(),
                )
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;

            self.is_recording = true;
            self.bound_kernel = None;
            self.group_bound = false;
            self.dispatch_count = 0;

            Ok(())
        }
    }

    fn end(&mut self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;

            self.is_recording = false;

            Ok(())
        }
    }

    fn bind_kernel(&mut self, kernel: &Arc<dyn DeviceKernel>) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }

        unsafe {
            // Downcast to Vulkan type
            let vk_kernel = kernel.as_ref() as *const dyn DeviceKernel as *const Kernel;
            let vk_kernel = &*vk_kernel;

            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                vk_kernel.pipeline,
            );

            // Save layout and push constant range for later commands
            self.bound_kernel = Some((vk_kernel.pipeline_layout, vk_kernel.push_constant_size));
            self.group_bound = false;

            Ok(())
        }
    }

    fn bind_binding_group(
        &mut self,
        set_index: u32,
        binding_group: &Arc<dyn DeviceBindingGroup>,
    ) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }

        let (layout, _) = self.bound_kernel.ok_or_else(|| {
            Error::BackendError("No kernel bound for binding group".to_string())
        })?;

        unsafe {
            // Downcast to Vulkan type
            let vk_group = binding_group.as_ref() as *const dyn DeviceBindingGroup as *const BindingGroup;
            let vk_group = &*vk_group;

            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                layout,
                set_index, // first_set
                &[vk_group.descriptor_set],
                &[], // dynamic_offsets
            );

            self.group_bound = true;

            Ok(())
        }
    }

    fn push_constants(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }

        let (layout, range_size) = self.bound_kernel.ok_or_else(|| {
            Error::BackendError("No kernel bound for push constants".to_string())
        })?;

        if offset as usize + data.len() > range_size as usize {
            return Err(Error::BackendError(format!(
                "Push constant range [{}, {}) exceeds kernel range of {} bytes",
                offset,
                offset as usize + data.len(),
                range_size
            )));
        }

        unsafe {
            self.device.cmd_push_constants(
                self.command_buffer,
                layout,
                vk::ShaderStageFlags::COMPUTE,
                offset,
                data,
            );

            Ok(())
        }
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }

        if self.bound_kernel.is_none() {
            return Err(Error::BackendError("No kernel bound for dispatch".to_string()));
        }

        if !self.group_bound {
            return Err(Error::BackendError("No binding group bound for dispatch".to_string()));
        }

        unsafe {
            self.device.cmd_dispatch(
                self.command_buffer,
                group_count_x,
                group_count_y,
                group_count_z,
            );

            self.dispatch_count += 1;

            Ok(())
        }
    }

    fn buffer_barrier(&mut self, buffer: &Arc<dyn DeviceBuffer>) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }

        unsafe {
            // Downcast to Vulkan type
            let vk_buffer = buffer.as_ref() as *const dyn DeviceBuffer as *const Buffer;
            let vk_buffer = &*vk_buffer;

            // Make shader writes visible to later dispatches and to the
            // host once the submit fence has signaled
            let barrier = vk::BufferMemoryBarrier::default()
                .src_access_mask(vk::AccessFlags::SHADER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ | vk::AccessFlags::HOST_READ)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .buffer(vk_buffer.buffer)
                .offset(0)
                .size(vk::WHOLE_SIZE);

            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                vk::PipelineStageFlags::COMPUTE_SHADER,
                vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::HOST,
                vk::DependencyFlags::empty(),
                &[],
                &[barrier],
                &[],
            );

            Ok(())
        }
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Command buffer is freed together with its pool
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
