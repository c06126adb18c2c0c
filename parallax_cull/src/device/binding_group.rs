/// BindingGroup trait and binding descriptors
///
/// A BindingGroup is an immutable set of GPU buffer bindings. It is
/// Parallax's abstraction over GPU descriptor sets, inspired by WebGPU's
/// GPUBindGroup.
///
/// Key properties:
/// - Immutable after creation (no race conditions)
/// - Layout deduced from the Kernel (user never manipulates layouts directly)
/// - Pool managed internally by the device

use std::sync::Arc;
use crate::device::buffer::Buffer;

// ============================================================================
// Binding types and layout description
// ============================================================================

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Storage buffer (read/write for compute kernels)
    StorageBuffer,
}

/// Description of a single binding slot within a kernel's binding set
#[derive(Debug, Clone)]
pub struct BindingSlotDesc {
    /// Binding number (corresponds to `layout(binding = N)` in GLSL)
    pub binding: u32,
    /// Type of resource at this binding
    pub binding_type: BindingType,
}

// ============================================================================
// Binding resources (concrete data passed at creation time)
// ============================================================================

/// A concrete resource to bind into a BindingGroup
///
/// The group clones the Arc, so bound buffers stay alive for as long as
/// the group does, even if the caller drops its own handle.
pub enum BindingResource<'a> {
    /// Uniform buffer binding
    UniformBuffer(&'a Arc<dyn Buffer>),
    /// Storage buffer binding
    StorageBuffer(&'a Arc<dyn Buffer>),
}

impl BindingResource<'_> {
    /// The binding type this resource satisfies
    pub fn binding_type(&self) -> BindingType {
        match self {
            BindingResource::UniformBuffer(_) => BindingType::UniformBuffer,
            BindingResource::StorageBuffer(_) => BindingType::StorageBuffer,
        }
    }

    /// The bound buffer
    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        match self {
            BindingResource::UniformBuffer(buffer) => buffer,
            BindingResource::StorageBuffer(buffer) => buffer,
        }
    }
}

// ============================================================================
// BindingGroup trait
// ============================================================================

/// An immutable set of GPU resource bindings.
///
/// The layout and pool are managed internally by the device.
/// Once created, a BindingGroup cannot be modified — create a new one
/// to change resources.
pub trait BindingGroup: Send + Sync {
    /// Returns the set index this BindingGroup was created for
    fn set_index(&self) -> u32;
}
