//! Dynamic arena allocator
//!
//! A resettable pool for the short-lived object graphs the shading pipeline
//! builds millions of times per frame. The pool owns an ordered sequence of
//! heterogeneous blocks and a cursor pointing at the next block to hand out.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   DynamicArena                       │
//! │                                                      │
//! │  blocks: [B0][B1][B2][B3] …   ←── ordered, owned     │
//! │  cursor: ^ next block to reuse                       │
//! │                                                      │
//! │  alloc_raw()  → reuse / grow / append  (&self)       │
//! │  alloc::<T>() → typed, lifetime-bound  (&self)       │
//! │  free_all()              (&mut self, cursor → head)  │
//! │  free_all_except(token)  (&mut self, keep one block) │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory strategy
//!
//! - Blocks are **never** returned to the system during normal operation;
//!   `free_all` only rewinds the cursor, so a reset-and-replay sequence of
//!   compatible allocations performs no fresh system allocation.
//! - A block too small for the allocation that lands on it is grown in
//!   place in the sequence; the previous contents are **discarded**, not
//!   copied. Callers never rely on the old bytes.
//! - Every allocation is a single contiguous block carrying one primary
//!   region and up to one optional data region, each with its own size and
//!   alignment, placed left-to-right with minimal padding. This is how a
//!   shading lobe shares one allocation with its variant state.
//!
//! # Safety model
//!
//! `alloc` hands out `&T` tied to the `&self` borrow, while `free_all` and
//! `free_all_except` require `&mut self`; the borrow checker therefore
//! guarantees no reference outlives a reset. The arena never runs drop glue
//! (`T: Copy`), and it is `Send` but not `Sync`: a ray context is owned by
//! one thread at a time.

use std::alloc::{Layout, alloc, dealloc};
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use crate::errors::{Error, Result};

// ─── Public types ─────────────────────────────────────────────────────────────

/// Identifies one block of a [`DynamicArena`] across resets.
///
/// Obtained from [`RawAllocation::token`] and consumed by
/// [`DynamicArena::free_all_except`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockToken(NonNull<u8>);

/// The regions of a single raw arena allocation.
pub struct RawAllocation {
    /// Token naming the backing block.
    pub token: BlockToken,
    /// Pointer to the primary region.
    pub primary: NonNull<u8>,
    /// Pointer to the optional data region.
    pub data: Option<NonNull<u8>>,
}

// ─── Internal types ───────────────────────────────────────────────────────────

struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Block {
    fn new(layout: Layout) -> Result<Self> {
        debug_assert!(layout.size() > 0);
        // SAFETY: size is non-zero.
        let raw = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            return Err(Error::AllocationFailed);
        };
        Ok(Self { ptr, layout })
    }

    fn release(&mut self) {
        // SAFETY: ptr was obtained from `alloc` with exactly this layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }

    fn fits(&self, layout: Layout) -> bool {
        self.layout.size() >= layout.size() && self.layout.align() >= layout.align()
    }
}

// ─── Arena ────────────────────────────────────────────────────────────────────

/// A free-list-backed resettable pool handing out aligned multi-section
/// blocks. See the module docs for the full contract.
pub struct DynamicArena {
    blocks: RefCell<Vec<Block>>,
    cursor: Cell<usize>,
}

// SAFETY: the arena is a plain owner of heap blocks; moving it between
// threads is fine. It is intentionally not `Sync` (RefCell); per-ray
// contexts are not internally synchronized.
unsafe impl Send for DynamicArena {}

impl DynamicArena {
    /// Creates an empty arena. No memory is reserved until the first
    /// allocation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: RefCell::new(Vec::new()),
            cursor: Cell::new(0),
        }
    }

    // ── Allocation (requires &self) ────────────────────────────────────────

    /// Allocates one block holding a primary region of
    /// `(primary_size, primary_align)` and, when `data_size` is non-zero, a
    /// data region of `(data_size, data_align)` placed after it.
    ///
    /// Sizes must be multiples of their alignments and alignments must be
    /// powers of two; violations fail with
    /// [`Error::InvalidArgumentCombination`]. A zero `primary_size` fails
    /// with [`Error::InvalidArgument`]`(1)`.
    pub fn alloc_raw(
        &self,
        primary_size: usize,
        primary_align: usize,
        data_size: usize,
        data_align: usize,
    ) -> Result<RawAllocation> {
        let primary = Self::checked_layout(primary_size, primary_align, 1)?;
        if primary_size == 0 {
            return Err(Error::InvalidArgument(1));
        }

        let (combined, data_offset) = if data_size == 0 {
            (primary, None)
        } else {
            let data = Self::checked_layout(data_size, data_align, 3)?;
            let (combined, offset) = primary
                .extend(data)
                .map_err(|_| Error::AllocationFailed)?;
            (combined, Some(offset))
        };

        let mut blocks = self.blocks.borrow_mut();
        let index = self.cursor.get();

        if index < blocks.len() {
            if !blocks[index].fits(combined) {
                // Grow in place in the sequence. The old contents are
                // discarded by contract.
                let replacement = Block::new(combined)?;
                blocks[index].release();
                blocks[index] = replacement;
            }
        } else {
            blocks.push(Block::new(combined)?);
        }

        let block = &blocks[index];
        self.cursor.set(index + 1);

        let base = block.ptr;
        // SAFETY: offsets computed by `Layout::extend` lie within the block.
        let data = data_offset.map(|offset| unsafe { base.add(offset) });

        Ok(RawAllocation {
            token: BlockToken(base),
            primary: base,
            data,
        })
    }

    /// Copies `value` into the arena and returns a reference valid until the
    /// next reset.
    pub fn alloc<T: Copy>(&self, value: T) -> Result<&T> {
        let raw = self.alloc_raw(size_of::<T>().max(align_of::<T>()), align_of::<T>(), 0, 1)?;
        let ptr = raw.primary.cast::<T>();
        // SAFETY: the region is fresh, correctly sized and aligned for `T`,
        // and not aliased; the returned borrow is tied to `&self` and dies
        // before any `&mut self` reset can recycle the block.
        unsafe {
            ptr.write(value);
            Ok(ptr.as_ref())
        }
    }

    // ── Reset (requires &mut self) ─────────────────────────────────────────

    /// Rewinds the cursor to the head of the sequence. Every block becomes
    /// reusable; nothing is returned to the system.
    pub fn free_all(&mut self) {
        self.cursor.set(0);
    }

    /// Moves the block named by `token` to the head of the sequence, then
    /// frees all with the cursor placed just past it.
    ///
    /// The kept block's bytes survive the reset untouched; after a later
    /// [`free_all`](Self::free_all) it is the first block handed out.
    pub fn free_all_except(&mut self, token: BlockToken) -> Result<()> {
        let mut blocks = self.blocks.borrow_mut();
        let Some(index) = blocks.iter().position(|b| b.ptr == token.0) else {
            return Err(Error::InvalidArgument(1));
        };
        blocks[..=index].rotate_right(1);
        self.cursor.set(1);
        Ok(())
    }

    // ── Introspection ──────────────────────────────────────────────────────

    /// Number of blocks currently owned (allocated from the system).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.borrow().len()
    }

    fn checked_layout(size: usize, align: usize, combination: u8) -> Result<Layout> {
        if align == 0 || !align.is_power_of_two() {
            return Err(Error::InvalidArgumentCombination(combination));
        }
        if size % align != 0 {
            return Err(Error::InvalidArgumentCombination(combination + 1));
        }
        Layout::from_size_align(size.max(1), align).map_err(|_| Error::AllocationFailed)
    }
}

impl Default for DynamicArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DynamicArena {
    fn drop(&mut self) {
        for block in self.blocks.borrow_mut().iter_mut() {
            block.release();
        }
    }
}
