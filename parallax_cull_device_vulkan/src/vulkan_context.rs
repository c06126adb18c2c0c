/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything a resource needs to destroy itself:
/// - Device for Vulkan API calls
/// - Allocator for memory management

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

/// Shared GPU context for all Vulkan resources.
///
/// This struct is shared (via `Arc`) by all GPU resources (buffers,
/// kernels) to avoid duplicating device/allocator references in each
/// resource.
///
/// Note: Device and instance destruction is handled by VulkanDevice::drop()
/// to avoid issues with drop ordering and callback exceptions on Windows.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Vulkan instance (kept for reference, destroyed by VulkanDevice)
    #[allow(dead_code)]
    instance: ash::Instance,

    /// Debug utils loader (for validation layers)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        instance: ash::Instance,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            instance,
            debug_utils_loader,
            debug_messenger,
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // NOTE: Device and instance destruction is handled by VulkanDevice::drop()
        // to avoid issues with drop ordering and callback exceptions on Windows.
        // This Drop impl intentionally does nothing.
    }
}
