//! Dynamic arena tests
//!
//! Tests for:
//! - Alignment and non-overlap of multi-section allocations
//! - Replay after free-all without fresh system allocation
//! - free-all-except ordering and byte preservation
//! - Layout validation failures

use prism::DynamicArena;
use prism::errors::Error;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Alignment and layout
// ============================================================================

#[test]
fn header_and_data_regions_are_aligned_and_disjoint() {
    let arena = DynamicArena::new();
    let mut rng = SmallRng::seed_from_u64(2024);

    for _ in 0..2000 {
        let header_align = 1usize << rng.random_range(0..7);
        let header_size = header_align * rng.random_range(1..9usize);
        let data_align = 1usize << rng.random_range(0..7);
        let data_size = data_align * rng.random_range(1..9usize);

        let raw = arena
            .alloc_raw(header_size, header_align, data_size, data_align)
            .unwrap();

        let header = raw.primary.as_ptr() as usize;
        let data = raw.data.unwrap().as_ptr() as usize;
        assert_eq!(header % header_align, 0, "header misaligned");
        assert_eq!(data % data_align, 0, "data misaligned");
        assert!(data >= header + header_size, "regions overlap");
    }
}

#[test]
fn replay_with_compatible_sizes_allocates_nothing_new() {
    let mut arena = DynamicArena::new();
    let mut rng = SmallRng::seed_from_u64(7);

    let mut sizes = Vec::new();
    for _ in 0..2000 {
        let header_align = 1usize << rng.random_range(0..6);
        let header_size = header_align * rng.random_range(1..8usize);
        let data_align = 1usize << rng.random_range(0..6);
        let data_size = data_align * rng.random_range(0..8usize);
        sizes.push((header_size, header_align, data_size, data_align));
        arena
            .alloc_raw(header_size, header_align, data_size, data_align)
            .unwrap();
    }

    let blocks_after_first_pass = arena.block_count();
    arena.free_all();

    // Replay with smaller-or-equal layouts in the same order: every
    // allocation must be served from the existing blocks.
    for (header_size, header_align, data_size, data_align) in sizes {
        let raw = arena
            .alloc_raw(header_size, header_align, data_size, data_align)
            .unwrap();
        assert_eq!(raw.primary.as_ptr() as usize % header_align, 0);
        if data_size > 0 {
            assert_eq!(raw.data.unwrap().as_ptr() as usize % data_align, 0);
        }
    }

    assert_eq!(arena.block_count(), blocks_after_first_pass);
}

// ============================================================================
// free-all-except
// ============================================================================

#[test]
fn free_all_except_keeps_one_block_alive_across_reset() {
    let mut arena = DynamicArena::new();

    arena.alloc_raw(64, 8, 0, 1).unwrap();
    let kept = arena.alloc_raw(32, 8, 0, 1).unwrap();
    arena.alloc_raw(128, 8, 0, 1).unwrap();

    let payload: [u8; 32] = core::array::from_fn(|i| i as u8 ^ 0x5A);
    // SAFETY: the region is 32 bytes, freshly allocated.
    unsafe {
        kept.primary
            .as_ptr()
            .copy_from_nonoverlapping(payload.as_ptr(), 32);
    }

    arena.free_all_except(kept.token).unwrap();

    // Churn through the remaining blocks; the kept block must be skipped.
    for _ in 0..8 {
        arena.alloc_raw(64, 8, 0, 1).unwrap();
    }

    let mut readback = [0u8; 32];
    // SAFETY: the kept block survives until the next free_all.
    unsafe {
        kept.primary
            .as_ptr()
            .copy_to_nonoverlapping(readback.as_mut_ptr(), 32);
    }
    assert_eq!(readback, payload);

    // After a plain reset, the kept block is the first handed out again.
    arena.free_all();
    let first = arena.alloc_raw(16, 8, 0, 1).unwrap();
    assert_eq!(first.token, kept.token);
}

#[test]
fn free_all_except_rejects_foreign_tokens() {
    let mut a = DynamicArena::new();
    let other = DynamicArena::new();
    a.alloc_raw(8, 8, 0, 1).unwrap();
    let foreign = other.alloc_raw(8, 8, 0, 1).unwrap();
    assert_eq!(
        a.free_all_except(foreign.token).unwrap_err(),
        Error::InvalidArgument(1)
    );
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn misaligned_layouts_fail_with_combination_errors() {
    let arena = DynamicArena::new();
    // Non power-of-two header alignment.
    assert_eq!(
        arena.alloc_raw(12, 6, 0, 1).unwrap_err(),
        Error::InvalidArgumentCombination(1)
    );
    // Header size not a multiple of its alignment.
    assert_eq!(
        arena.alloc_raw(12, 8, 0, 1).unwrap_err(),
        Error::InvalidArgumentCombination(2)
    );
    // Data size not a multiple of its alignment.
    assert_eq!(
        arena.alloc_raw(16, 8, 12, 8).unwrap_err(),
        Error::InvalidArgumentCombination(4)
    );
}

#[test]
fn typed_references_track_their_values() {
    let arena = DynamicArena::new();
    let values: Vec<&u64> = (0..64).map(|i| arena.alloc(i * 3).unwrap()).collect();
    for (i, value) in values.iter().enumerate() {
        assert_eq!(**value, i as u64 * 3);
    }
}
