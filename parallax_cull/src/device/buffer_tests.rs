use super::*;

// ============================================================================
// BufferUsage flags
// ============================================================================

#[test]
fn test_usage_contains_self() {
    assert!(BufferUsage::STORAGE.contains(BufferUsage::STORAGE));
    assert!(BufferUsage::UNIFORM.contains(BufferUsage::UNIFORM));
    assert!(BufferUsage::MAP_READ.contains(BufferUsage::MAP_READ));
    assert!(BufferUsage::MAP_WRITE.contains(BufferUsage::MAP_WRITE));
}

#[test]
fn test_usage_combination() {
    let usage = BufferUsage::STORAGE | BufferUsage::MAP_READ;

    assert!(usage.contains(BufferUsage::STORAGE));
    assert!(usage.contains(BufferUsage::MAP_READ));
    assert!(!usage.contains(BufferUsage::UNIFORM));
    assert!(!usage.contains(BufferUsage::MAP_WRITE));
}

#[test]
fn test_usage_contains_combined_flags() {
    let usage = BufferUsage::STORAGE | BufferUsage::MAP_READ | BufferUsage::MAP_WRITE;

    assert!(usage.contains(BufferUsage::STORAGE | BufferUsage::MAP_READ));
    assert!(!usage.contains(BufferUsage::STORAGE | BufferUsage::UNIFORM));
}

#[test]
fn test_usage_bits_are_distinct() {
    let all = [
        BufferUsage::STORAGE,
        BufferUsage::UNIFORM,
        BufferUsage::MAP_READ,
        BufferUsage::MAP_WRITE,
    ];

    for (i, a) in all.iter().enumerate() {
        for (j, b) in all.iter().enumerate() {
            if i != j {
                assert_eq!(a.bits() & b.bits(), 0, "flags must not overlap");
            }
        }
    }
}

// ============================================================================
// BufferDesc
// ============================================================================

#[test]
fn test_buffer_desc() {
    let desc = BufferDesc {
        size: 4096,
        usage: BufferUsage::STORAGE | BufferUsage::MAP_WRITE,
    };

    assert_eq!(desc.size, 4096);
    assert!(desc.usage.contains(BufferUsage::STORAGE));
    assert!(desc.usage.contains(BufferUsage::MAP_WRITE));
}
