use super::*;

// ============================================================================
// usage_to_vk
// ============================================================================

#[test]
fn test_usage_to_vk_storage() {
    assert_eq!(
        VulkanDevice::usage_to_vk(BufferUsage::STORAGE),
        vk::BufferUsageFlags::STORAGE_BUFFER
    );
}

#[test]
fn test_usage_to_vk_uniform() {
    assert_eq!(
        VulkanDevice::usage_to_vk(BufferUsage::UNIFORM),
        vk::BufferUsageFlags::UNIFORM_BUFFER
    );
}

#[test]
fn test_usage_to_vk_combined() {
    assert_eq!(
        VulkanDevice::usage_to_vk(BufferUsage::STORAGE | BufferUsage::UNIFORM),
        vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::UNIFORM_BUFFER
    );
}

#[test]
fn test_usage_to_vk_map_flags_do_not_add_vk_usage() {
    // Host access flags select the memory location, not the buffer usage
    assert_eq!(
        VulkanDevice::usage_to_vk(BufferUsage::STORAGE | BufferUsage::MAP_READ | BufferUsage::MAP_WRITE),
        vk::BufferUsageFlags::STORAGE_BUFFER
    );
}

// ============================================================================
// memory_location_for
// ============================================================================

#[test]
fn test_memory_location_device_only() {
    assert_eq!(
        VulkanDevice::memory_location_for(BufferUsage::STORAGE),
        MemoryLocation::GpuOnly
    );
}

#[test]
fn test_memory_location_map_write() {
    assert_eq!(
        VulkanDevice::memory_location_for(BufferUsage::STORAGE | BufferUsage::MAP_WRITE),
        MemoryLocation::CpuToGpu
    );
    assert_eq!(
        VulkanDevice::memory_location_for(BufferUsage::UNIFORM | BufferUsage::MAP_WRITE),
        MemoryLocation::CpuToGpu
    );
}

#[test]
fn test_memory_location_map_read() {
    assert_eq!(
        VulkanDevice::memory_location_for(BufferUsage::STORAGE | BufferUsage::MAP_READ),
        MemoryLocation::GpuToCpu
    );
}

#[test]
fn test_memory_location_map_read_wins_over_map_write() {
    // Readback wins: GpuToCpu memory is host-visible for writes too
    assert_eq!(
        VulkanDevice::memory_location_for(
            BufferUsage::STORAGE | BufferUsage::MAP_READ | BufferUsage::MAP_WRITE
        ),
        MemoryLocation::GpuToCpu
    );
}

// ============================================================================
// binding_type_to_vk
// ============================================================================

#[test]
fn test_binding_type_to_vk() {
    assert_eq!(
        VulkanDevice::binding_type_to_vk(BindingType::UniformBuffer),
        vk::DescriptorType::UNIFORM_BUFFER
    );
    assert_eq!(
        VulkanDevice::binding_type_to_vk(BindingType::StorageBuffer),
        vk::DescriptorType::STORAGE_BUFFER
    );
}
