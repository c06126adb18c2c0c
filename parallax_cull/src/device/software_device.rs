/// Software compute device - runs the built-in kernels on a thread pool
///
/// Implements the full ComputeDevice contract against host memory, so the
/// culling pipeline can run unchanged without a GPU. Kernels execute with
/// the same buffer layouts and push constant ABI as the SPIR-V versions,
/// one workgroup per rayon task.
///
/// Unlike a real GPU, the software device bounds-checks every kernel
/// access and rejects aliased output bindings instead of corrupting
/// memory. Results are bit-identical for any worker thread count because
/// each chunk is scanned sequentially and min/max folds are exact.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec3, Vec4};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::device::{
    Buffer, BufferDesc, BufferUsage,
    Kernel, KernelDesc, KernelCode, BuiltinKernel,
    CommandList,
    BindingGroup, BindingResource, BindingType,
    ComputeDevice, ComputeDeviceStats, DeviceConfig,
};
use crate::{cull_bail, cull_error, cull_info, cull_warn};

const TARGET: &str = "parallax::SoftwareDevice";

// ============================================================================
// Shared device state
// ============================================================================

/// State shared between the device and its buffers.
///
/// Buffers deregister themselves on drop, so `live` always reflects the
/// buffers currently alive regardless of who holds them.
struct DeviceShared {
    /// Live buffers: id -> size in bytes
    live: Mutex<FxHashMap<u64, u64>>,
    submits: AtomicU64,
    dispatches: AtomicU64,
}

// ============================================================================
// SoftwareBuffer
// ============================================================================

/// Host-memory buffer.
///
/// Contents are stored as u32 words so kernel access never depends on
/// the alignment of caller byte slices.
pub struct SoftwareBuffer {
    id: u64,
    words: Mutex<Vec<u32>>,
    size: u64,
    usage: BufferUsage,
    shared: Arc<DeviceShared>,
}

impl Buffer for SoftwareBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.usage.contains(BufferUsage::MAP_WRITE) {
            cull_bail!(TARGET, "update on a buffer created without MAP_WRITE");
        }
        if offset % 4 != 0 || data.len() % 4 != 0 {
            cull_bail!(TARGET,
                "update must be 4-byte aligned (offset: {}, len: {})", offset, data.len());
        }
        if offset + data.len() as u64 > self.size {
            cull_bail!(TARGET,
                "update of {} bytes at offset {} exceeds buffer size {}",
                data.len(), offset, self.size);
        }

        let mut words = self.words.lock().unwrap();
        let base = (offset / 4) as usize;
        for (i, chunk) in data.chunks_exact(4).enumerate() {
            words[base + i] = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        if !self.usage.contains(BufferUsage::MAP_READ) {
            cull_bail!(TARGET, "read on a buffer created without MAP_READ");
        }
        if offset % 4 != 0 || out.len() % 4 != 0 {
            cull_bail!(TARGET,
                "read must be 4-byte aligned (offset: {}, len: {})", offset, out.len());
        }
        if offset + out.len() as u64 > self.size {
            cull_bail!(TARGET,
                "read of {} bytes at offset {} exceeds buffer size {}",
                out.len(), offset, self.size);
        }

        let words = self.words.lock().unwrap();
        let base = (offset / 4) as usize;
        for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
            chunk.copy_from_slice(&words[base + i].to_ne_bytes());
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for SoftwareBuffer {
    fn drop(&mut self) {
        self.shared.live.lock().unwrap().remove(&self.id);
    }
}

// ============================================================================
// SoftwareKernel
// ============================================================================

pub struct SoftwareKernel {
    name: String,
    builtin: BuiltinKernel,
    push_constant_size: u32,
    local_size: u32,
}

impl Kernel for SoftwareKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_size(&self) -> u32 {
        self.local_size
    }
}

/// Binding layout and push constant size each built-in kernel expects.
fn builtin_layout(builtin: BuiltinKernel) -> (&'static [BindingType], u32) {
    use BindingType::{StorageBuffer, UniformBuffer};
    match builtin {
        // positions, partial_min, partial_max; push: vertex_count, chunk_size
        BuiltinKernel::ReduceBounds => (&[StorageBuffer, StorageBuffer, StorageBuffer], 8),
        // partial_min, partial_max, out_min, out_max; push: partial_count, output_index
        BuiltinKernel::FoldBounds => (
            &[StorageBuffer, StorageBuffer, StorageBuffer, StorageBuffer],
            8,
        ),
        // world_min, world_max, planes, flags; push: object_count
        BuiltinKernel::TestVisibility => (
            &[StorageBuffer, StorageBuffer, UniformBuffer, StorageBuffer],
            4,
        ),
    }
}

// ============================================================================
// SoftwareBindingGroup
// ============================================================================

pub struct SoftwareBindingGroup {
    set_index: u32,
    /// Bound buffers in binding order; Arcs keep them alive
    buffers: Vec<Arc<dyn Buffer>>,
}

impl BindingGroup for SoftwareBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

// ============================================================================
// SoftwareCommandList
// ============================================================================

enum Command {
    BindKernel(Arc<dyn Kernel>),
    BindBindingGroup(Arc<dyn BindingGroup>),
    PushConstants(u32, Vec<u8>),
    Dispatch(u32, u32, u32),
    BufferBarrier,
}

/// Command list that records typed commands for later host execution.
pub struct SoftwareCommandList {
    commands: Vec<Command>,
    is_recording: bool,
    bound_kernel: Option<Arc<dyn Kernel>>,
    bound_group: Option<Arc<dyn BindingGroup>>,
}

impl SoftwareCommandList {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
            is_recording: false,
            bound_kernel: None,
            bound_group: None,
        }
    }
}

impl CommandList for SoftwareCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            cull_bail!(TARGET, "begin called while already recording");
        }
        self.commands.clear();
        self.bound_kernel = None;
        self.bound_group = None;
        self.is_recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.is_recording {
            cull_bail!(TARGET, "end called without begin");
        }
        self.is_recording = false;
        Ok(())
    }

    fn bind_kernel(&mut self, kernel: &Arc<dyn Kernel>) -> Result<()> {
        if !self.is_recording {
            cull_bail!(TARGET, "bind_kernel outside begin/end");
        }
        self.bound_kernel = Some(Arc::clone(kernel));
        self.commands.push(Command::BindKernel(Arc::clone(kernel)));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        if !self.is_recording {
            cull_bail!(TARGET, "bind_binding_group outside begin/end");
        }
        if set_index != 0 {
            cull_bail!(TARGET, "compute kernels only use set 0 (got set {})", set_index);
        }
        self.bound_group = Some(Arc::clone(binding_group));
        self.commands
            .push(Command::BindBindingGroup(Arc::clone(binding_group)));
        Ok(())
    }

    fn push_constants(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        if !self.is_recording {
            cull_bail!(TARGET, "push_constants outside begin/end");
        }
        let kernel = match &self.bound_kernel {
            Some(kernel) => kernel,
            None => cull_bail!(TARGET, "push_constants without a bound kernel"),
        };
        let kernel = as_software_kernel(kernel);
        if offset as usize + data.len() > kernel.push_constant_size as usize {
            cull_bail!(TARGET,
                "push_constants range [{}, {}) exceeds kernel '{}' push constant size {}",
                offset, offset as usize + data.len(), kernel.name, kernel.push_constant_size);
        }
        self.commands.push(Command::PushConstants(offset, data.to_vec()));
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        if !self.is_recording {
            cull_bail!(TARGET, "dispatch outside begin/end");
        }
        if self.bound_kernel.is_none() {
            cull_bail!(TARGET, "dispatch without a bound kernel");
        }
        if self.bound_group.is_none() {
            cull_bail!(TARGET, "dispatch without a bound binding group");
        }
        self.commands
            .push(Command::Dispatch(group_count_x, group_count_y, group_count_z));
        Ok(())
    }

    fn buffer_barrier(&mut self, _buffer: &Arc<dyn Buffer>) -> Result<()> {
        if !self.is_recording {
            cull_bail!(TARGET, "buffer_barrier outside begin/end");
        }
        // Host execution is sequential; record for command stream symmetry.
        self.commands.push(Command::BufferBarrier);
        Ok(())
    }
}

// ============================================================================
// Downcast helpers
// ============================================================================

// Resources passed back into the device must originate from it; these
// casts mirror how the GPU backends recover their concrete types.

fn as_software_buffer(buffer: &Arc<dyn Buffer>) -> &SoftwareBuffer {
    let ptr = buffer.as_ref() as *const dyn Buffer as *const SoftwareBuffer;
    unsafe { &*ptr }
}

fn as_software_kernel(kernel: &Arc<dyn Kernel>) -> &SoftwareKernel {
    let ptr = kernel.as_ref() as *const dyn Kernel as *const SoftwareKernel;
    unsafe { &*ptr }
}

fn as_software_binding_group(group: &Arc<dyn BindingGroup>) -> &SoftwareBindingGroup {
    let ptr = group.as_ref() as *const dyn BindingGroup as *const SoftwareBindingGroup;
    unsafe { &*ptr }
}

fn ensure_distinct(a: &SoftwareBuffer, b: &SoftwareBuffer, what: &str) -> Result<()> {
    if std::ptr::eq(a, b) {
        cull_bail!(TARGET, "{} must be distinct buffers", what);
    }
    Ok(())
}

fn push_u32(push: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes([push[offset], push[offset + 1], push[offset + 2], push[offset + 3]])
}

fn read_vec3(words: &[u32], base: usize) -> Vec3 {
    Vec3::new(
        f32::from_bits(words[base]),
        f32::from_bits(words[base + 1]),
        f32::from_bits(words[base + 2]),
    )
}

fn write_vec3(words: &mut [u32], base: usize, v: Vec3) {
    words[base] = v.x.to_bits();
    words[base + 1] = v.y.to_bits();
    words[base + 2] = v.z.to_bits();
    words[base + 3] = 0.0f32.to_bits();
}

// ============================================================================
// SoftwareDevice
// ============================================================================

pub struct SoftwareDevice {
    pool: rayon::ThreadPool,
    shared: Arc<DeviceShared>,
    next_buffer_id: AtomicU64,
    memory_budget: Option<u64>,
}

impl SoftwareDevice {
    /// Create a software device.
    ///
    /// `config.worker_threads` sizes the private thread pool (0 = one per
    /// core). `config.memory_budget` caps total live buffer bytes.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .build()
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to build worker thread pool: {}", e))
            })?;

        cull_info!(TARGET,
            "Software compute device created ({} worker threads)",
            pool.current_num_threads());

        Ok(Self {
            pool,
            shared: Arc::new(DeviceShared {
                live: Mutex::new(FxHashMap::default()),
                submits: AtomicU64::new(0),
                dispatches: AtomicU64::new(0),
            }),
            next_buffer_id: AtomicU64::new(1),
            memory_budget: config.memory_budget,
        })
    }

    fn execute_list(&self, list: &SoftwareCommandList) -> Result<()> {
        if list.is_recording {
            cull_bail!(TARGET, "command list submitted while still recording");
        }

        let mut kernel: Option<&SoftwareKernel> = None;
        let mut group: Option<&SoftwareBindingGroup> = None;
        let mut push: Vec<u8> = Vec::new();

        for command in &list.commands {
            match command {
                Command::BindKernel(k) => {
                    let k = as_software_kernel(k);
                    push = vec![0u8; k.push_constant_size as usize];
                    kernel = Some(k);
                }
                Command::BindBindingGroup(g) => {
                    group = Some(as_software_binding_group(g));
                }
                Command::PushConstants(offset, data) => {
                    let offset = *offset as usize;
                    push[offset..offset + data.len()].copy_from_slice(data);
                }
                Command::Dispatch(gx, gy, gz) => {
                    // Record-time validation guarantees both are bound.
                    let (Some(kernel), Some(group)) = (kernel, group) else {
                        cull_bail!(TARGET, "dispatch recorded without kernel and binding group");
                    };
                    if *gy != 1 || *gz != 1 {
                        cull_bail!(TARGET,
                            "kernel '{}' dispatched with group counts ({}, {}, {}); built-in kernels are one-dimensional",
                            kernel.name, gx, gy, gz);
                    }
                    self.run_builtin(kernel, group, &push, *gx)?;
                    self.shared.dispatches.fetch_add(1, Ordering::Relaxed);
                }
                Command::BufferBarrier => {}
            }
        }
        Ok(())
    }

    fn run_builtin(
        &self,
        kernel: &SoftwareKernel,
        group: &SoftwareBindingGroup,
        push: &[u8],
        groups: u32,
    ) -> Result<()> {
        let (expected, _) = builtin_layout(kernel.builtin);
        if group.buffers.len() != expected.len() {
            cull_bail!(TARGET,
                "kernel '{}' dispatched with {} bound buffers, expected {}",
                kernel.name, group.buffers.len(), expected.len());
        }

        match kernel.builtin {
            BuiltinKernel::ReduceBounds => self.run_reduce_bounds(kernel, group, push, groups),
            BuiltinKernel::FoldBounds => self.run_fold_bounds(kernel, group, push),
            BuiltinKernel::TestVisibility => self.run_test_visibility(kernel, group, push, groups),
        }
    }

    /// One workgroup scans one chunk of `chunk_size` vertices and writes
    /// its min/max into the partial buffers at its group index.
    fn run_reduce_bounds(
        &self,
        kernel: &SoftwareKernel,
        group: &SoftwareBindingGroup,
        push: &[u8],
        groups: u32,
    ) -> Result<()> {
        let vertex_count = push_u32(push, 0);
        let chunk_size = push_u32(push, 4);
        if chunk_size == 0 {
            cull_bail!(TARGET, "kernel '{}' dispatched with chunk_size 0", kernel.name);
        }

        let positions = as_software_buffer(&group.buffers[0]);
        let partial_min = as_software_buffer(&group.buffers[1]);
        let partial_max = as_software_buffer(&group.buffers[2]);
        ensure_distinct(partial_min, partial_max, "partial_min and partial_max")?;
        ensure_distinct(positions, partial_min, "positions and partial_min")?;
        ensure_distinct(positions, partial_max, "positions and partial_max")?;

        if (groups as u64) * (chunk_size as u64) < vertex_count as u64 {
            cull_bail!(TARGET,
                "kernel '{}': {} groups of {} vertices do not cover {} vertices",
                kernel.name, groups, chunk_size, vertex_count);
        }
        if positions.size < vertex_count as u64 * 16 {
            cull_bail!(TARGET,
                "kernel '{}': positions buffer ({} bytes) too small for {} vertices",
                kernel.name, positions.size, vertex_count);
        }
        if partial_min.size < groups as u64 * 16 || partial_max.size < groups as u64 * 16 {
            cull_bail!(TARGET,
                "kernel '{}': partial buffers too small for {} groups",
                kernel.name, groups);
        }

        let results: Vec<(Vec3, Vec3)> = {
            let guard = positions.words.lock().unwrap();
            let words: &[u32] = &guard;
            self.pool.install(|| {
                (0..groups as usize)
                    .into_par_iter()
                    .map(|gx| {
                        let start = gx * chunk_size as usize;
                        let end = usize::min(start + chunk_size as usize, vertex_count as usize);
                        let mut mn = Vec3::INFINITY;
                        let mut mx = Vec3::NEG_INFINITY;
                        for i in start..end {
                            let p = read_vec3(words, i * 4);
                            mn = mn.min(p);
                            mx = mx.max(p);
                        }
                        (mn, mx)
                    })
                    .collect()
            })
        };

        {
            let mut words = partial_min.words.lock().unwrap();
            for (gx, (mn, _)) in results.iter().enumerate() {
                write_vec3(&mut words, gx * 4, *mn);
            }
        }
        {
            let mut words = partial_max.words.lock().unwrap();
            for (gx, (_, mx)) in results.iter().enumerate() {
                write_vec3(&mut words, gx * 4, *mx);
            }
        }
        Ok(())
    }

    /// Single-group fold of `partial_count` partials into the output
    /// bounds at `output_index`.
    fn run_fold_bounds(
        &self,
        kernel: &SoftwareKernel,
        group: &SoftwareBindingGroup,
        push: &[u8],
    ) -> Result<()> {
        let partial_count = push_u32(push, 0);
        let output_index = push_u32(push, 4);

        let partial_min = as_software_buffer(&group.buffers[0]);
        let partial_max = as_software_buffer(&group.buffers[1]);
        let out_min = as_software_buffer(&group.buffers[2]);
        let out_max = as_software_buffer(&group.buffers[3]);
        ensure_distinct(out_min, out_max, "out_min and out_max")?;

        if partial_min.size < partial_count as u64 * 16
            || partial_max.size < partial_count as u64 * 16
        {
            cull_bail!(TARGET,
                "kernel '{}': partial buffers too small for {} partials",
                kernel.name, partial_count);
        }
        let out_end = (output_index as u64 + 1) * 16;
        if out_min.size < out_end || out_max.size < out_end {
            cull_bail!(TARGET,
                "kernel '{}': output buffers too small for output index {}",
                kernel.name, output_index);
        }

        let mut mn = Vec3::INFINITY;
        let mut mx = Vec3::NEG_INFINITY;
        {
            let words = partial_min.words.lock().unwrap();
            for i in 0..partial_count as usize {
                mn = mn.min(read_vec3(&words, i * 4));
            }
        }
        {
            let words = partial_max.words.lock().unwrap();
            for i in 0..partial_count as usize {
                mx = mx.max(read_vec3(&words, i * 4));
            }
        }

        write_vec3(
            &mut out_min.words.lock().unwrap(),
            output_index as usize * 4,
            mn,
        );
        write_vec3(
            &mut out_max.words.lock().unwrap(),
            output_index as usize * 4,
            mx,
        );
        Ok(())
    }

    /// Six-plane positive-vertex test; one thread per object, every flag
    /// in [0, object_count) written exactly once.
    fn run_test_visibility(
        &self,
        kernel: &SoftwareKernel,
        group: &SoftwareBindingGroup,
        push: &[u8],
        groups: u32,
    ) -> Result<()> {
        let object_count = push_u32(push, 0);

        let world_min = as_software_buffer(&group.buffers[0]);
        let world_max = as_software_buffer(&group.buffers[1]);
        let planes_buffer = as_software_buffer(&group.buffers[2]);
        let flags = as_software_buffer(&group.buffers[3]);
        ensure_distinct(world_min, world_max, "world_min and world_max")?;
        ensure_distinct(flags, world_min, "flags and world_min")?;
        ensure_distinct(flags, world_max, "flags and world_max")?;

        if (groups as u64) * (kernel.local_size as u64) < object_count as u64 {
            cull_bail!(TARGET,
                "kernel '{}': {} groups of {} threads do not cover {} objects",
                kernel.name, groups, kernel.local_size, object_count);
        }
        if world_min.size < object_count as u64 * 16 || world_max.size < object_count as u64 * 16 {
            cull_bail!(TARGET,
                "kernel '{}': bounds buffers too small for {} objects",
                kernel.name, object_count);
        }
        if planes_buffer.size < 96 {
            cull_bail!(TARGET,
                "kernel '{}': plane buffer holds {} bytes, 6 planes need 96",
                kernel.name, planes_buffer.size);
        }
        if flags.size < object_count as u64 * 4 {
            cull_bail!(TARGET,
                "kernel '{}': flag buffer too small for {} objects",
                kernel.name, object_count);
        }

        let mut planes = [Vec4::ZERO; 6];
        {
            let words = planes_buffer.words.lock().unwrap();
            for (i, plane) in planes.iter_mut().enumerate() {
                *plane = Vec4::new(
                    f32::from_bits(words[i * 4]),
                    f32::from_bits(words[i * 4 + 1]),
                    f32::from_bits(words[i * 4 + 2]),
                    f32::from_bits(words[i * 4 + 3]),
                );
            }
        }

        let results: Vec<u32> = {
            let min_guard = world_min.words.lock().unwrap();
            let max_guard = world_max.words.lock().unwrap();
            let min_words: &[u32] = &min_guard;
            let max_words: &[u32] = &max_guard;
            self.pool.install(|| {
                (0..object_count as usize)
                    .into_par_iter()
                    .map(|i| {
                        let mn = read_vec3(min_words, i * 4);
                        let mx = read_vec3(max_words, i * 4);

                        let mut visible = true;
                        for plane in &planes {
                            let normal = Vec3::new(plane.x, plane.y, plane.z);
                            let p_vertex = Vec3::new(
                                if normal.x >= 0.0 { mx.x } else { mn.x },
                                if normal.y >= 0.0 { mx.y } else { mn.y },
                                if normal.z >= 0.0 { mx.z } else { mn.z },
                            );
                            if normal.dot(p_vertex) + plane.w < 0.0 {
                                visible = false;
                                break;
                            }
                        }
                        if visible { 1 } else { 0 }
                    })
                    .collect()
            })
        };

        let mut words = flags.words.lock().unwrap();
        words[..object_count as usize].copy_from_slice(&results);
        Ok(())
    }
}

impl ComputeDevice for SoftwareDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            cull_bail!(TARGET, "create_buffer with size 0");
        }
        if desc.size % 4 != 0 {
            cull_bail!(TARGET,
                "buffer size {} is not a multiple of 4 bytes", desc.size);
        }

        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut live = self.shared.live.lock().unwrap();
            if let Some(budget) = self.memory_budget {
                let in_use: u64 = live.values().sum();
                if in_use + desc.size > budget {
                    cull_error!(TARGET,
                        "Out of device memory for buffer (requested: {} bytes, in use: {} of {} bytes)",
                        desc.size, in_use, budget);
                    return Err(Error::OutOfMemory);
                }
            }
            live.insert(id, desc.size);
        }

        Ok(Arc::new(SoftwareBuffer {
            id,
            words: Mutex::new(vec![0u32; (desc.size / 4) as usize]),
            size: desc.size,
            usage: desc.usage,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn create_kernel(&mut self, desc: KernelDesc) -> Result<Arc<dyn Kernel>> {
        let builtin = match desc.code {
            KernelCode::Builtin(builtin) => builtin,
            KernelCode::SpirV(_) => {
                cull_bail!(TARGET,
                    "kernel '{}' supplies SPIR-V; the software device only runs built-in kernels",
                    desc.name);
            }
        };

        let (expected_bindings, expected_push) = builtin_layout(builtin);
        if desc.bindings.len() != expected_bindings.len() {
            cull_bail!(TARGET,
                "kernel '{}' declares {} bindings, {:?} has {}",
                desc.name, desc.bindings.len(), builtin, expected_bindings.len());
        }
        for (slot, expected_type) in desc.bindings.iter().zip(expected_bindings) {
            if slot.binding_type != *expected_type {
                cull_bail!(TARGET,
                    "kernel '{}' binding {} is {:?}, {:?} expects {:?}",
                    desc.name, slot.binding, slot.binding_type, builtin, expected_type);
            }
        }
        for (index, slot) in desc.bindings.iter().enumerate() {
            if slot.binding != index as u32 {
                cull_bail!(TARGET,
                    "kernel '{}' bindings must be dense from 0 (slot {} has binding {})",
                    desc.name, index, slot.binding);
            }
        }
        if desc.push_constant_size != expected_push {
            cull_bail!(TARGET,
                "kernel '{}' declares {} push constant bytes, {:?} expects {}",
                desc.name, desc.push_constant_size, builtin, expected_push);
        }
        if desc.local_size == 0 {
            cull_bail!(TARGET, "kernel '{}' has local_size 0", desc.name);
        }

        Ok(Arc::new(SoftwareKernel {
            name: desc.name,
            builtin,
            push_constant_size: desc.push_constant_size,
            local_size: desc.local_size,
        }))
    }

    fn create_binding_group(
        &self,
        kernel: &Arc<dyn Kernel>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        let kernel = as_software_kernel(kernel);
        let (expected, _) = builtin_layout(kernel.builtin);

        if resources.len() != expected.len() {
            cull_bail!(TARGET,
                "create_binding_group: kernel '{}' takes {} resources, got {}",
                kernel.name, expected.len(), resources.len());
        }
        for (index, (resource, expected_type)) in resources.iter().zip(expected).enumerate() {
            if resource.binding_type() != *expected_type {
                cull_bail!(TARGET,
                    "create_binding_group: kernel '{}' binding {} expects {:?}, got {:?}",
                    kernel.name, index, expected_type, resource.binding_type());
            }
        }

        Ok(Arc::new(SoftwareBindingGroup {
            set_index: 0,
            buffers: resources
                .iter()
                .map(|resource| Arc::clone(resource.buffer()))
                .collect(),
        }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(SoftwareCommandList::new()))
    }

    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()> {
        for command_list in commands {
            let list = *command_list as *const dyn CommandList as *const SoftwareCommandList;
            let list = unsafe { &*list };
            self.execute_list(list)?;
        }
        self.shared.submits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        // submit executes synchronously; nothing outstanding
        Ok(())
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

impl Drop for SoftwareDevice {
    fn drop(&mut self) {
        let live = self.shared.live.lock().unwrap();
        if !live.is_empty() {
            let bytes: u64 = live.values().sum();
            cull_warn!(TARGET,
                "Software device dropped with {} live buffers ({} bytes)",
                live.len(), bytes);
        }
    }
}

#[cfg(test)]
#[path = "software_device_tests.rs"]
mod tests;
