/// Kernel interface shared by every compute backend.
///
/// The three culling kernels have a fixed ABI: binding slots, push
/// constant layout, and workgroup sizing. The descriptors built here are
/// the single source of truth — the GLSL sources shipped with the Vulkan
/// backend compile to exactly this interface, and the software device
/// implements it natively.
///
/// Storage layout: bounds and positions are tightly packed vec4 (16-byte
/// stride, w unused), flags are packed u32.

use crate::device::{BindingSlotDesc, BindingType, KernelCode, KernelDesc};

/// Threads per workgroup for reduce_bounds and fold_bounds
/// (specialization constant 0).
pub const REDUCE_LOCAL_SIZE: u32 = 64;

/// Stride of one vec4 element in the storage layout.
pub(crate) const VEC4_STRIDE: u64 = 16;

/// Plane buffer size: six vec4 planes.
pub(crate) const PLANE_BUFFER_SIZE: u64 = 96;

fn storage(binding: u32) -> BindingSlotDesc {
    BindingSlotDesc { binding, binding_type: BindingType::StorageBuffer }
}

fn uniform(binding: u32) -> BindingSlotDesc {
    BindingSlotDesc { binding, binding_type: BindingType::UniformBuffer }
}

/// Per-chunk min/max reduction over one object's vertices.
///
/// Bindings: 0 = positions (vec4, read), 1 = partial_min (vec4, write),
/// 2 = partial_max (vec4, write).
/// Push constants: vertex_count u32, chunk_size u32.
/// Dispatch: ceil(vertex_count / chunk_size) groups; group g scans the
/// chunk [g * chunk_size, min((g + 1) * chunk_size, vertex_count)).
pub fn reduce_bounds_desc(code: KernelCode) -> KernelDesc {
    KernelDesc {
        name: "reduce_bounds".to_string(),
        code,
        entry_point: "main".to_string(),
        bindings: vec![storage(0), storage(1), storage(2)],
        push_constant_size: 8,
        local_size: REDUCE_LOCAL_SIZE,
    }
}

/// Fold of per-chunk partials into one object bound.
///
/// Bindings: 0 = partial_min (read), 1 = partial_max (read),
/// 2 = out_min (write), 3 = out_max (write).
/// Push constants: partial_count u32, output_index u32.
/// Dispatch: exactly one group; writes out_min/out_max[output_index].
pub fn fold_bounds_desc(code: KernelCode) -> KernelDesc {
    KernelDesc {
        name: "fold_bounds".to_string(),
        code,
        entry_point: "main".to_string(),
        bindings: vec![storage(0), storage(1), storage(2), storage(3)],
        push_constant_size: 8,
        local_size: REDUCE_LOCAL_SIZE,
    }
}

/// Six-plane positive-vertex test over the world bounds.
///
/// Bindings: 0 = world_min (read), 1 = world_max (read),
/// 2 = planes (uniform, 6 x vec4), 3 = flags (u32, write).
/// Push constants: object_count u32.
/// Dispatch: ceil(object_count / test_group_size) groups, one thread per
/// object; every flag in [0, object_count) is written each dispatch.
pub fn test_visibility_desc(code: KernelCode, test_group_size: u32) -> KernelDesc {
    KernelDesc {
        name: "test_visibility".to_string(),
        code,
        entry_point: "main".to_string(),
        bindings: vec![storage(0), storage(1), uniform(2), storage(3)],
        push_constant_size: 4,
        local_size: test_group_size,
    }
}
