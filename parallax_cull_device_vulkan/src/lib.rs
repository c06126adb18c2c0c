/*!
# Parallax - Vulkan Compute Backend

Vulkan implementation of the parallax_cull compute device traits.

This crate provides a headless Vulkan backend built on the Ash bindings
and gpu-allocator for memory management. It consumes SPIR-V kernels; the
built-in kernel codes of the software device are rejected here.

```no_run
use std::sync::{Arc, Mutex};
use parallax_cull::parallax::device::{ComputeDevice, DeviceConfig};
use parallax_cull_device_vulkan::VulkanDevice;

let device = VulkanDevice::new(DeviceConfig::default())?;
let device: Arc<Mutex<dyn ComputeDevice>> = Arc::new(Mutex::new(device));
# Ok::<(), parallax_cull::parallax::Error>(())
```
*/

mod debug;
mod vulkan_binding_group;
mod vulkan_buffer;
mod vulkan_command_list;
mod vulkan_context;
mod vulkan_device;
mod vulkan_kernel;

pub use vulkan_device::VulkanDevice;

// Re-export validation layer statistics
pub use debug::{validation_stats, ValidationStats};
