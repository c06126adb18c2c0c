/// Kernel trait and kernel descriptor

use crate::device::binding_group::BindingSlotDesc;

/// Kernels with a native implementation in the software device.
///
/// The Vulkan backend rejects `Builtin` code; it only consumes SPIR-V.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKernel {
    /// Per-chunk min/max reduction over vertex positions
    ReduceBounds,
    /// Fold of per-chunk partial bounds into one object bound
    FoldBounds,
    /// Six-plane visibility test over object bounds
    TestVisibility,
}

/// Kernel code source
#[derive(Clone)]
pub enum KernelCode {
    /// One of the built-in kernels (software device only)
    Builtin(BuiltinKernel),
    /// SPIR-V module bytes (Vulkan device only)
    SpirV(Vec<u8>),
}

impl std::fmt::Debug for KernelCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelCode::Builtin(kernel) => write!(f, "Builtin({:?})", kernel),
            KernelCode::SpirV(bytes) => write!(f, "SpirV({} bytes)", bytes.len()),
        }
    }
}

/// Descriptor for creating a compute kernel
#[derive(Debug, Clone)]
pub struct KernelDesc {
    /// Kernel name, used in logs and error messages
    pub name: String,
    /// Kernel code
    pub code: KernelCode,
    /// Entry point name (SPIR-V modules)
    pub entry_point: String,
    /// Binding slots of set 0, in binding order
    pub bindings: Vec<BindingSlotDesc>,
    /// Push constant range size in bytes (0 = no push constants)
    pub push_constant_size: u32,
    /// Threads per workgroup, applied through specialization constant 0
    pub local_size: u32,
}

/// Compute kernel trait
///
/// Implemented by backend-specific kernel types. A kernel owns its
/// pipeline state and binding layout; it is destroyed when dropped.
pub trait Kernel: Send + Sync {
    /// Kernel name from the descriptor
    fn name(&self) -> &str;

    /// Threads per workgroup
    fn local_size(&self) -> u32;
}

/// Number of workgroups needed so that `groups * items_per_group >= item_count`.
///
/// Returns 0 for an empty range; callers skip the dispatch entirely in
/// that case.
pub fn dispatch_group_count(item_count: u32, items_per_group: u32) -> u32 {
    debug_assert!(items_per_group > 0);
    item_count.div_ceil(items_per_group)
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
