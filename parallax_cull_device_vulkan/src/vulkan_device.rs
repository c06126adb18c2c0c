/// VulkanDevice - Vulkan implementation of the ComputeDevice trait

use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use rustc_hash::FxHashMap;

use parallax_cull::parallax::{Error, Result};
use parallax_cull::parallax::device::{
    Buffer as DeviceBuffer, BufferDesc, BufferUsage,
    Kernel as DeviceKernel, KernelDesc, KernelCode,
    CommandList as DeviceCommandList,
    BindingGroup as DeviceBindingGroup, BindingResource, BindingType,
    ComputeDevice, ComputeDeviceStats, DeviceConfig,
};
use parallax_cull::{cull_bail, cull_err, cull_error, cull_info, cull_warn};

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_kernel::Kernel;

const TARGET: &str = "parallax::VulkanDevice";

// ============================================================================
// Shared device state
// ============================================================================

/// State shared between the device and its buffers.
///
/// Buffers deregister themselves on drop, so `live` always reflects the
/// buffers currently alive regardless of who holds them.
pub(crate) struct DeviceShared {
    /// Live buffers: id -> size in bytes
    pub(crate) live: Mutex<FxHashMap<u64, u64>>,
    pub(crate) submits: AtomicU64,
    pub(crate) dispatches: AtomicU64,
}

// ============================================================================
// Downcast helpers
// ============================================================================

// Resources passed back into the device must originate from it; these
// casts mirror how the software backend recovers its concrete types.

fn as_vulkan_kernel(kernel: &Arc<dyn DeviceKernel>) -> &Kernel {
    let ptr = kernel.as_ref() as *const dyn DeviceKernel as *const Kernel;
    unsafe { &*ptr }
}

fn as_vulkan_buffer(buffer: &Arc<dyn DeviceBuffer>) -> &Buffer {
    let ptr = buffer.as_ref() as *const dyn DeviceBuffer as *const Buffer;
    unsafe { &*ptr }
}

// ============================================================================
// VulkanDevice
// ============================================================================

/// Vulkan compute device
///
/// Headless backend: no window, no swapchain, one compute queue. Submits
/// are serialized through a single fence and readback is defined after
/// `wait_idle` returns. Resources created from this device must be
/// dropped before the device itself.
pub struct VulkanDevice {
    /// Vulkan entry point (kept alive for the loaded function pointers)
    _entry: ash::Entry,
    /// Vulkan instance
    instance: ash::Instance,
    /// Logical device
    device: Arc<ash::Device>,
    /// Compute queue
    compute_queue: vk::Queue,
    /// Compute queue family index
    compute_queue_family: u32,
    /// GPU memory allocator
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,
    /// Submit fence, created signaled; each submit waits out the previous one
    submit_fence: vk::Fence,
    /// Descriptor pools (a new pool is appended when the last is exhausted)
    descriptor_pools: Mutex<Vec<vk::DescriptorPool>>,
    /// Shared GPU context handed to created resources
    gpu_context: Arc<GpuContext>,
    /// Registry and counters shared with buffers
    shared: Arc<DeviceShared>,
    /// Next buffer id
    next_buffer_id: AtomicU64,
    /// Optional allocation budget in bytes
    memory_budget: Option<u64>,
}

impl VulkanDevice {
    /// Create a descriptor pool with fixed capacity (1024 sets).
    /// Called during init and when the current pool is exhausted.
    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 1024,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(1024);

        unsafe {
            device.create_descriptor_pool(&info, None)
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to create descriptor pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
                })
        }
    }

    /// Create a new Vulkan compute device
    ///
    /// Picks the first physical device with a compute-capable queue
    /// family. With `config.enable_validation` the Khronos validation
    /// layer is loaded and its messages are routed through the engine
    /// logger; counts are available via [`crate::validation_stats`].
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let app_name = CString::new(config.app_name.as_str())
            .map_err(|_| {
                Error::InitializationFailed("Application name contains a NUL byte".to_string())
            })?;

        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load()
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            // Application Info
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Parallax")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Headless compute needs no window extensions, only debug utils
            // when validation is enabled
            let extension_names = if config.enable_validation {
                vec![ash::ext::debug_utils::NAME.as_ptr()]
            } else {
                vec![]
            };

            // Validation layers
            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            // Setup debug messenger if validation is enabled
            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                // Arm the callback and reset validation counters
                crate::debug::enable_callbacks();

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| {
                        cull_error!(TARGET, "Failed to create debug messenger: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                    })?;

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            // Pick Physical Device
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let physical_device = physical_devices
                .into_iter()
                .next()
                .ok_or_else(|| {
                    cull_error!(TARGET, "No Vulkan-capable GPU found");
                    Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
                })?;

            // Find a compute queue family
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let compute_family_index = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::COMPUTE))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| {
                    cull_error!(TARGET, "No compute queue family found");
                    Error::InitializationFailed("No compute queue family found".to_string())
                })?;

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(compute_family_index)
                    .queue_priorities(&queue_priorities),
            ];

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos);

            let device = Arc::new(
                instance
                    .create_device(physical_device, &device_create_info, None)
                    .map_err(|e| {
                        cull_error!(TARGET, "Failed to create logical device: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                    })?,
            );

            let compute_queue = device.get_device_queue(compute_family_index, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: (*device).clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                cull_error!(TARGET, "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Create submit fence, signaled so the first submit does not wait
            let fence_create_info = vk::FenceCreateInfo::default()
                .flags(vk::FenceCreateFlags::SIGNALED);

            let submit_fence = device.create_fence(&fence_create_info, None)
                .map_err(|e| {
                    cull_error!(TARGET, "Failed to create submit fence: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?;

            // Create initial descriptor pool for binding group allocation
            let descriptor_pool = Self::create_descriptor_pool(&device)?;

            // Create shared GPU context for all resources
            // GpuContext holds device, instance, and debug handles;
            // destruction stays with VulkanDevice::drop()
            let allocator_arc = Arc::new(Mutex::new(allocator));
            let gpu_context = Arc::new(GpuContext::new(
                (*device).clone(),
                Arc::clone(&allocator_arc),
                instance.clone(),
                debug_utils_loader,
                debug_messenger,
            ));

            let props = instance.get_physical_device_properties(physical_device);
            let device_name = CStr::from_ptr(props.device_name.as_ptr())
                .to_string_lossy()
                .into_owned();

            cull_info!(TARGET,
                "Vulkan compute device created ({}, compute queue family {})",
                device_name, compute_family_index);

            Ok(Self {
                _entry: entry,
                instance,
                device,
                compute_queue,
                compute_queue_family: compute_family_index,
                allocator: ManuallyDrop::new(allocator_arc),
                submit_fence,
                descriptor_pools: Mutex::new(vec![descriptor_pool]),
                gpu_context,
                shared: Arc::new(DeviceShared {
                    live: Mutex::new(FxHashMap::default()),
                    submits: AtomicU64::new(0),
                    dispatches: AtomicU64::new(0),
                }),
                next_buffer_id: AtomicU64::new(1),
                memory_budget: config.memory_budget,
            })
        }
    }

    /// Convert BufferUsage to Vulkan buffer usage flags
    fn usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
        let mut vk_flags = vk::BufferUsageFlags::empty();
        if usage.contains(BufferUsage::STORAGE) { vk_flags |= vk::BufferUsageFlags::STORAGE_BUFFER; }
        if usage.contains(BufferUsage::UNIFORM) { vk_flags |= vk::BufferUsageFlags::UNIFORM_BUFFER; }
        vk_flags
    }

    /// Pick the memory location for a buffer from its host access flags
    fn memory_location_for(usage: BufferUsage) -> MemoryLocation {
        if usage.contains(BufferUsage::MAP_READ) {
            MemoryLocation::GpuToCpu
        } else if usage.contains(BufferUsage::MAP_WRITE) {
            MemoryLocation::CpuToGpu
        } else {
            MemoryLocation::GpuOnly
        }
    }

    /// Convert BindingType to Vulkan descriptor type
    fn binding_type_to_vk(binding_type: BindingType) -> vk::DescriptorType {
        match binding_type {
            BindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            BindingType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        }
    }

    /// Check a kernel descriptor against the SPIR-V module's own interface.
    ///
    /// Reflection runs before any Vulkan object is created, so a mismatch
    /// costs nothing to unwind. Only set 0 buffer descriptors are allowed.
    fn validate_kernel_reflection(desc: &KernelDesc, code: &[u32]) -> Result<()> {
        let entry_points = spirq::ReflectConfig::new()
            .spv(code)
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| cull_err!(TARGET,
                "kernel '{}': SPIR-V reflection failed: {:?}", desc.name, e))?;

        let mut reflected: Vec<(u32, BindingType)> = Vec::new();
        let mut push_constant_bytes: u32 = 0;

        for entry_point in &entry_points {
            for var in entry_point.vars.iter() {
                match var {
                    spirq::var::Variable::Descriptor { desc_bind, desc_ty, .. } => {
                        use spirq::ty::DescriptorType;
                        let binding_type = match desc_ty {
                            DescriptorType::UniformBuffer() => BindingType::UniformBuffer,
                            DescriptorType::StorageBuffer(..) => BindingType::StorageBuffer,
                            other => {
                                cull_bail!(TARGET,
                                    "kernel '{}' uses unsupported descriptor type: {:?}",
                                    desc.name, other);
                            }
                        };
                        if desc_bind.set() != 0 {
                            cull_bail!(TARGET,
                                "kernel '{}' binds set {}, only set 0 is supported",
                                desc.name, desc_bind.set());
                        }
                        reflected.push((desc_bind.bind(), binding_type));
                    }
                    spirq::var::Variable::PushConstant { ty, .. } => {
                        push_constant_bytes = ty.nbyte().unwrap_or(0) as u32;
                    }
                    _ => {}
                }
            }
        }

        reflected.sort_by_key(|(binding, _)| *binding);

        if reflected.len() != desc.bindings.len() {
            cull_bail!(TARGET,
                "kernel '{}' declares {} bindings, SPIR-V module has {}",
                desc.name, desc.bindings.len(), reflected.len());
        }
        for (slot, (binding, binding_type)) in desc.bindings.iter().zip(&reflected) {
            if slot.binding != *binding || slot.binding_type != *binding_type {
                cull_bail!(TARGET,
                    "kernel '{}' declares binding {} as {:?}, SPIR-V module has binding {} as {:?}",
                    desc.name, slot.binding, slot.binding_type, binding, binding_type);
            }
        }
        if push_constant_bytes != desc.push_constant_size {
            cull_bail!(TARGET,
                "kernel '{}' declares {} push constant bytes, SPIR-V module has {}",
                desc.name, desc.push_constant_size, push_constant_bytes);
        }

        Ok(())
    }
}

impl ComputeDevice for VulkanDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn DeviceBuffer>> {
        if desc.size == 0 {
            cull_bail!(TARGET, "create_buffer with size 0");
        }
        if desc.size % 4 != 0 {
            cull_bail!(TARGET,
                "buffer size {} is not a multiple of 4 bytes", desc.size);
        }
        if !desc.usage.contains(BufferUsage::STORAGE) && !desc.usage.contains(BufferUsage::UNIFORM) {
            cull_bail!(TARGET, "create_buffer: usage must include STORAGE or UNIFORM");
        }

        if let Some(budget) = self.memory_budget {
            let live = self.shared.live.lock().unwrap();
            let in_use: u64 = live.values().sum();
            if in_use + desc.size > budget {
                cull_error!(TARGET,
                    "Out of device memory for buffer (requested: {} bytes, in use: {} of {} bytes)",
                    desc.size, in_use, budget);
                return Err(Error::OutOfMemory);
            }
        }

        unsafe {
            // Create buffer
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(Self::usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| cull_err!(TARGET,
                    "Failed to create buffer of size {} bytes: {:?}", desc.size, e))?;

            // Allocate memory
            let requirements = self.device.get_buffer_memory_requirements(buffer);

            let allocation = self.allocator.lock().unwrap().allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                name: "buffer",
                requirements,
                location: Self::memory_location_for(desc.usage),
                linear: true,
                allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|_e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                cull_error!(TARGET, "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                Error::OutOfMemory
            })?;

            // Bind memory
            self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| cull_err!(TARGET, "Failed to bind buffer memory: {:?}", e))?;

            let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
            self.shared.live.lock().unwrap().insert(id, desc.size);

            Ok(Arc::new(Buffer::new(
                Arc::clone(&self.gpu_context),
                Arc::clone(&self.shared),
                id,
                buffer,
                allocation,
                desc.size,
                desc.usage,
            )))
        }
    }

    fn create_kernel(&mut self, desc: KernelDesc) -> Result<Arc<dyn DeviceKernel>> {
        let code = match &desc.code {
            KernelCode::SpirV(bytes) => bytes,
            KernelCode::Builtin(builtin) => {
                cull_bail!(TARGET,
                    "kernel '{}' requests builtin {:?}; the Vulkan device only runs SPIR-V",
                    desc.name, builtin);
            }
        };

        if desc.local_size == 0 {
            cull_bail!(TARGET, "kernel '{}' has local_size 0", desc.name);
        }
        for (index, slot) in desc.bindings.iter().enumerate() {
            if slot.binding != index as u32 {
                cull_bail!(TARGET,
                    "kernel '{}' bindings must be dense from 0 (slot {} has binding {})",
                    desc.name, index, slot.binding);
            }
        }
        if code.is_empty() || code.len() % 4 != 0 {
            cull_bail!(TARGET,
                "kernel '{}' SPIR-V is not a whole number of words (size: {} bytes)",
                desc.name, code.len());
        }
        let Ok(entry_point) = CString::new(desc.entry_point.as_str()) else {
            cull_bail!(TARGET,
                "kernel '{}' entry point contains a NUL byte", desc.name);
        };

        unsafe {
            // Convert to u32 slice for SPIR-V
            let code_u32 = std::slice::from_raw_parts(
                code.as_ptr() as *const u32,
                code.len() / 4,
            );

            Self::validate_kernel_reflection(&desc, code_u32)?;

            let create_info = vk::ShaderModuleCreateInfo::default()
                .code(code_u32);

            let module = self.device.create_shader_module(&create_info, None)
                .map_err(|e| cull_err!(TARGET,
                    "kernel '{}': failed to create shader module: {:?}", desc.name, e))?;

            // Descriptor set layout for set 0
            let layout_bindings: Vec<vk::DescriptorSetLayoutBinding> = desc.bindings
                .iter()
                .map(|slot| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(slot.binding)
                        .descriptor_type(Self::binding_type_to_vk(slot.binding_type))
                        .descriptor_count(1)
                        .stage_flags(vk::ShaderStageFlags::COMPUTE)
                })
                .collect();

            let layout_create = vk::DescriptorSetLayoutCreateInfo::default()
                .bindings(&layout_bindings);

            let descriptor_set_layout = match self.device.create_descriptor_set_layout(&layout_create, None) {
                Ok(layout) => layout,
                Err(e) => {
                    self.device.destroy_shader_module(module, None);
                    return Err(cull_err!(TARGET,
                        "kernel '{}': failed to create descriptor set layout: {:?}", desc.name, e));
                }
            };

            // Pipeline layout with the optional push constant range
            let set_layouts = [descriptor_set_layout];
            let push_constant_ranges = [vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::COMPUTE,
                offset: 0,
                size: desc.push_constant_size,
            }];

            let mut layout_create_info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(&set_layouts);
            if desc.push_constant_size > 0 {
                layout_create_info = layout_create_info.push_constant_ranges(&push_constant_ranges);
            }

            let pipeline_layout = match self.device.create_pipeline_layout(&layout_create_info, None) {
                Ok(layout) => layout,
                Err(e) => {
                    self.device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                    self.device.destroy_shader_module(module, None);
                    return Err(cull_err!(TARGET,
                        "kernel '{}': failed to create pipeline layout: {:?}", desc.name, e));
                }
            };

            // Workgroup size enters through specialization constant 0
            let spec_data = desc.local_size.to_ne_bytes();
            let spec_entries = [vk::SpecializationMapEntry {
                constant_id: 0,
                offset: 0,
                size: 4,
            }];
            let spec_info = vk::SpecializationInfo::default()
                .map_entries(&spec_entries)
                .data(&spec_data);

            let stage = vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::COMPUTE)
                .module(module)
                .name(&entry_point)
                .specialization_info(&spec_info);

            let pipeline_create_info = vk::ComputePipelineCreateInfo::default()
                .stage(stage)
                .layout(pipeline_layout);

            let pipelines = self.device.create_compute_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            );

            // The module is baked into the pipeline; destroy it either way
            self.device.destroy_shader_module(module, None);

            let pipeline = match pipelines {
                Ok(pipelines) => pipelines[0],
                Err(e) => {
                    self.device.destroy_pipeline_layout(pipeline_layout, None);
                    self.device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                    return Err(cull_err!(TARGET,
                        "kernel '{}': failed to create compute pipeline: {:?}", desc.name, e.1));
                }
            };

            Ok(Arc::new(Kernel::new(
                Arc::clone(&self.gpu_context),
                pipeline,
                pipeline_layout,
                descriptor_set_layout,
                desc.bindings,
                desc.push_constant_size,
                desc.name,
                desc.local_size,
            )))
        }
    }

    fn create_binding_group(
        &self,
        kernel: &Arc<dyn DeviceKernel>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn DeviceBindingGroup>> {
        let vk_kernel = as_vulkan_kernel(kernel);

        if resources.len() != vk_kernel.bindings.len() {
            cull_bail!(TARGET,
                "create_binding_group: kernel '{}' takes {} resources, got {}",
                vk_kernel.name(), vk_kernel.bindings.len(), resources.len());
        }
        for (slot, resource) in vk_kernel.bindings.iter().zip(resources) {
            if resource.binding_type() != slot.binding_type {
                cull_bail!(TARGET,
                    "create_binding_group: kernel '{}' binding {} expects {:?}, got {:?}",
                    vk_kernel.name(), slot.binding, slot.binding_type, resource.binding_type());
            }
        }

        unsafe {
            // Allocate descriptor set from pool (grow dynamically if exhausted)
            let layouts = [vk_kernel.descriptor_set_layout];
            let descriptor_sets = {
                let mut pools = self.descriptor_pools.lock().unwrap();
                let current_pool = *pools.last().unwrap();
                let allocate_info = vk::DescriptorSetAllocateInfo::default()
                    .descriptor_pool(current_pool)
                    .set_layouts(&layouts);

                match self.device.allocate_descriptor_sets(&allocate_info) {
                    Ok(sets) => sets,
                    Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) => {
                        let new_pool = Self::create_descriptor_pool(&self.device)?;
                        pools.push(new_pool);
                        cull_info!(TARGET,
                            "Descriptor pool exhausted, created new pool (total: {})",
                            pools.len()
                        );
                        let retry_info = vk::DescriptorSetAllocateInfo::default()
                            .descriptor_pool(new_pool)
                            .set_layouts(&layouts);
                        self.device.allocate_descriptor_sets(&retry_info)
                            .map_err(|e| cull_err!(TARGET,
                                "Failed to allocate descriptor set after pool growth: {:?}", e))?
                    }
                    Err(e) => return Err(cull_err!(TARGET,
                        "Failed to allocate descriptor set: {:?}", e)),
                }
            };

            let descriptor_set = descriptor_sets[0];

            // Buffer infos must stay alive until update_descriptor_sets,
            // so build them all before taking pointers into the Vec
            let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::with_capacity(resources.len());
            for resource in resources {
                let vk_buffer = as_vulkan_buffer(resource.buffer());
                buffer_infos.push(
                    vk::DescriptorBufferInfo::default()
                        .buffer(vk_buffer.buffer)
                        .offset(0)
                        .range(vk::WHOLE_SIZE)
                );
            }

            let mut writes: Vec<vk::WriteDescriptorSet> = Vec::with_capacity(resources.len());
            for (index, (slot, resource)) in vk_kernel.bindings.iter().zip(resources).enumerate() {
                writes.push(
                    vk::WriteDescriptorSet::default()
                        .dst_set(descriptor_set)
                        .dst_binding(slot.binding)
                        .dst_array_element(0)
                        .descriptor_type(Self::binding_type_to_vk(resource.binding_type()))
                        .buffer_info(std::slice::from_ref(&buffer_infos[index]))
                );
            }

            self.device.update_descriptor_sets(&writes, &[]);

            Ok(Arc::new(BindingGroup::new(
                descriptor_set,
                0,
                resources
                    .iter()
                    .map(|resource| Arc::clone(resource.buffer()))
                    .collect(),
            )))
        }
    }

    fn create_command_list(&self) -> Result<Box<dyn DeviceCommandList>> {
        let cmd_list = CommandList::new(
            Arc::clone(&self.device),
            self.compute_queue_family,
        )?;
        Ok(Box::new(cmd_list))
    }

    fn submit(&self, commands: &[&dyn DeviceCommandList]) -> Result<()> {
        unsafe {
            // Wait for the previous submit
            self.device
                .wait_for_fences(&[self.submit_fence], true, u64::MAX)
                .map_err(|e| cull_err!(TARGET, "submit: failed to wait for fence: {:?}", e))?;

            // Reset fence
            self.device
                .reset_fences(&[self.submit_fence])
                .map_err(|e| cull_err!(TARGET, "submit: failed to reset fence: {:?}", e))?;

            // Collect command buffers
            let mut command_buffers = Vec::with_capacity(commands.len());
            let mut dispatches: u64 = 0;
            for cmd in commands {
                let vk_cmd = *cmd as *const dyn DeviceCommandList as *const CommandList;
                let vk_cmd = &*vk_cmd;
                if vk_cmd.is_recording {
                    cull_bail!(TARGET, "command list submitted while still recording");
                }
                command_buffers.push(vk_cmd.command_buffer());
                dispatches += vk_cmd.dispatch_count;
            }

            // Submit
            let submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers);

            self.device
                .queue_submit(self.compute_queue, &[submit_info], self.submit_fence)
                .map_err(|e| cull_err!(TARGET, "submit: failed to submit queue: {:?}", e))?;

            self.shared.submits.fetch_add(1, Ordering::Relaxed);
            self.shared.dispatches.fetch_add(dispatches, Ordering::Relaxed);

            Ok(())
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| cull_err!(TARGET, "Failed to wait idle: {:?}", e))
        }
    }

    fn stats(&self) -> ComputeDeviceStats {
        let live = self.shared.live.lock().unwrap();
        ComputeDeviceStats {
            live_buffers: live.len() as u32,
            live_buffer_bytes: live.values().sum(),
            submits: self.shared.submits.load(Ordering::Relaxed),
            dispatches: self.shared.dispatches.load(Ordering::Relaxed),
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.device.device_wait_idle().ok();

            {
                let live = self.shared.live.lock().unwrap();
                if !live.is_empty() {
                    let bytes: u64 = live.values().sum();
                    cull_warn!(TARGET,
                        "Vulkan device dropped with {} live buffers ({} bytes)",
                        live.len(), bytes);
                }
            }

            // 1. Destroy VulkanDevice-owned Vulkan objects
            self.device.destroy_fence(self.submit_fence, None);
            for &pool in self.descriptor_pools.get_mut().unwrap().iter() {
                self.device.destroy_descriptor_pool(pool, None);
            }

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device.
            //    First drop VulkanDevice's Arc, then GpuContext's ManuallyDrop Arc.
            ManuallyDrop::drop(&mut self.allocator);
            if let Some(ctx) = Arc::get_mut(&mut self.gpu_context) {
                ManuallyDrop::drop(&mut ctx.allocator);
            }

            // 3. Stop routing messages into the debug callback during destruction
            crate::debug::disable_callbacks();

            // 4. Destroy debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) = (
                &self.gpu_context.debug_utils_loader,
                &self.gpu_context.debug_messenger,
            ) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 5. Destroy device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
