use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::constants::{BLOCK_SIZE, POOL_SIZE};

/// Raw block storage: `BLOCK_SIZE` opaque payload bytes, word-aligned so a
/// DMA engine can read the block directly.
#[repr(C, align(4))]
pub struct BlockData {
    pub bytes: [u8; BLOCK_SIZE],
}

/// Lock-free fixed-arena allocator for transfer blocks.
///
/// An atomic bitmap tracks which slots are taken. A slot is exclusively owned
/// by whichever collection currently holds its handle; there is no sharing,
/// so no reference counting. All operations are O(1), never block, and are
/// safe to call from both the producer and consumer interrupt contexts.
pub struct BlockPool {
    /// Bitmap: bit N = 1 means slot N is taken.
    bitmap: AtomicU32,
    /// Highest simultaneous occupancy observed since the last counter reset.
    peak: AtomicU32,
    /// Block storage. Payload bytes are left uninitialized until written;
    /// the fill protocol guarantees no stale byte ever reaches a consumer.
    storage: UnsafeCell<[MaybeUninit<BlockData>; POOL_SIZE]>,
}

// SAFETY: All shared state is updated through atomics. `storage` is only
// accessed through slot indices whose bitmap bit the accessor exclusively
// claimed, so no two contexts ever touch the same slot concurrently.
unsafe impl Sync for BlockPool {}

impl BlockPool {
    /// Create a pool with every slot free.
    pub const fn new() -> Self {
        // One bitmap word must cover the whole arena.
        assert!(POOL_SIZE <= 32);
        BlockPool {
            bitmap: AtomicU32::new(0),
            peak: AtomicU32::new(0),
            storage: UnsafeCell::new(unsafe {
                MaybeUninit::<[MaybeUninit<BlockData>; POOL_SIZE]>::uninit().assume_init()
            }),
        }
    }

    /// Claim a free slot. Returns its index, or `None` when the pool is
    /// exhausted (the caller's back-pressure signal).
    pub fn alloc(&self) -> Option<u8> {
        loop {
            let bitmap = self.bitmap.load(Ordering::Acquire);
            let free = !bitmap;
            if free == 0 {
                return None;
            }
            let slot = free.trailing_zeros();
            if slot >= POOL_SIZE as u32 {
                return None;
            }
            let bit = 1u32 << slot;
            match self.bitmap.compare_exchange_weak(
                bitmap,
                bitmap | bit,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.peak
                        .fetch_max((bitmap | bit).count_ones(), Ordering::Relaxed);
                    return Some(slot as u8);
                }
                Err(_) => continue, // the other context raced us, retry
            }
        }
    }

    /// Return a slot to the free set.
    ///
    /// The caller must be the slot's sole owner. Outside of tests the only
    /// call site is [`Block`](super::Block)'s `Drop`, which upholds this.
    pub fn free(&self, slot: u8) {
        debug_assert!((slot as usize) < POOL_SIZE);
        let bit = 1u32 << (slot as u32);
        let prev = self.bitmap.fetch_and(!bit, Ordering::Release);
        debug_assert!(prev & bit != 0, "free of a slot that is not taken");
    }

    /// Pointer to the payload of a slot.
    ///
    /// # Safety
    /// The caller must own the slot (its bitmap bit set by the caller's
    /// allocation) for the duration of any access through the pointer.
    pub unsafe fn data_ptr(&self, slot: u8) -> *mut BlockData {
        let storage = self.storage.get();
        unsafe { (*storage)[slot as usize].as_mut_ptr() }
    }

    /// Number of currently taken slots.
    pub fn allocated_count(&self) -> u32 {
        self.bitmap.load(Ordering::Acquire).count_ones()
    }

    /// Highest simultaneous occupancy since the last [`reset_peak`](Self::reset_peak).
    pub fn peak_count(&self) -> u32 {
        self.peak.load(Ordering::Relaxed)
    }

    /// Restart peak tracking from the current occupancy.
    pub fn reset_peak(&self) {
        self.peak.store(self.allocated_count(), Ordering::Relaxed);
    }
}

impl Default for BlockPool {
    fn default() -> Self {
        Self::new()
    }
}
