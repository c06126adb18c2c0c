use super::*;
use crate::device::binding_group::BindingType;

// ============================================================================
// dispatch_group_count
// ============================================================================

#[test]
fn test_dispatch_group_count_exact_multiple() {
    assert_eq!(dispatch_group_count(256, 64), 4);
    assert_eq!(dispatch_group_count(64, 64), 1);
}

#[test]
fn test_dispatch_group_count_with_remainder() {
    assert_eq!(dispatch_group_count(257, 64), 5);
    assert_eq!(dispatch_group_count(1, 64), 1);
    assert_eq!(dispatch_group_count(63, 64), 1);
    assert_eq!(dispatch_group_count(65, 64), 2);
}

#[test]
fn test_dispatch_group_count_zero_items() {
    assert_eq!(dispatch_group_count(0, 64), 0);
}

#[test]
fn test_dispatch_group_count_large_counts() {
    // 1M vertices in chunks of 256
    assert_eq!(dispatch_group_count(1_000_000, 256), 3907);
    assert!(3907 * 256 >= 1_000_000);
    assert!(3906 * 256 < 1_000_000);
}

// ============================================================================
// KernelDesc / KernelCode
// ============================================================================

#[test]
fn test_kernel_desc_construction() {
    let desc = KernelDesc {
        name: "reduce_bounds".to_string(),
        code: KernelCode::Builtin(BuiltinKernel::ReduceBounds),
        entry_point: "main".to_string(),
        bindings: vec![
            BindingSlotDesc { binding: 0, binding_type: BindingType::StorageBuffer },
            BindingSlotDesc { binding: 1, binding_type: BindingType::StorageBuffer },
            BindingSlotDesc { binding: 2, binding_type: BindingType::StorageBuffer },
        ],
        push_constant_size: 8,
        local_size: 64,
    };

    assert_eq!(desc.bindings.len(), 3);
    assert_eq!(desc.local_size, 64);
}

#[test]
fn test_kernel_code_debug_hides_spirv_bytes() {
    let code = KernelCode::SpirV(vec![0u8; 1024]);
    let printed = format!("{:?}", code);

    assert!(printed.contains("1024 bytes"));
    assert!(printed.len() < 64, "debug output should not dump the module");
}

#[test]
fn test_builtin_kernel_equality() {
    assert_eq!(BuiltinKernel::ReduceBounds, BuiltinKernel::ReduceBounds);
    assert_ne!(BuiltinKernel::ReduceBounds, BuiltinKernel::FoldBounds);
    assert_ne!(BuiltinKernel::FoldBounds, BuiltinKernel::TestVisibility);
}
