#![allow(dead_code)]
//! GPU test utilities - Shared Vulkan device for integration tests
//!
//! This module provides a global VulkanDevice instance shared across all
//! GPU tests. One instance/device pair per process keeps validation layer
//! output readable and matches real-world usage (1 device per app).

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use parallax_cull::parallax::device::{ComputeDevice, DeviceConfig, KernelCode};
use parallax_cull::parallax::KernelSet;
use parallax_cull_device_vulkan::VulkanDevice;

/// Global VulkanDevice instance (initialized once)
static GPU_DEVICE: OnceLock<Arc<Mutex<VulkanDevice>>> = OnceLock::new();

/// Get the shared VulkanDevice for GPU tests
///
/// Lazily initializes the device on first call, with validation enabled
/// so `parallax_cull_device_vulkan::validation_stats()` counts layer
/// messages across the whole test run.
pub fn get_test_device() -> Arc<Mutex<dyn ComputeDevice>> {
    GPU_DEVICE
        .get_or_init(|| {
            let device = VulkanDevice::new(DeviceConfig {
                enable_validation: true,
                app_name: "Parallax GPU Tests".to_string(),
                ..DeviceConfig::default()
            })
            .expect("Failed to create VulkanDevice for tests");

            Arc::new(Mutex::new(device))
        })
        .clone()
}

/// Load a compiled culling kernel from the Vulkan backend's shader directory.
pub fn load_spirv(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../parallax_cull_device_vulkan/shaders")
        .join(format!("{}.spv", name));

    std::fs::read(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to read {} ({}); compile the kernels first, \
             see parallax_cull_device_vulkan/shaders/README.md",
            path.display(),
            e
        )
    })
}

/// Kernel set pointing at the compiled SPIR-V culling kernels.
pub fn spirv_kernels() -> KernelSet {
    KernelSet {
        reduce_bounds: KernelCode::SpirV(load_spirv("reduce_bounds")),
        fold_bounds: KernelCode::SpirV(load_spirv("fold_bounds")),
        test_visibility: KernelCode::SpirV(load_spirv("test_visibility")),
    }
}
