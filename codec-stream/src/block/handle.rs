use core::ops::{Deref, DerefMut};

use crate::constants::BLOCK_SIZE;

use super::pool::BlockPool;

/// Exclusive handle to one pool slot.
///
/// Exactly one `Block` exists per taken slot. Provides `Deref`/`DerefMut`
/// access to the slot's `[u8; BLOCK_SIZE]` payload. Dropping a `Block`
/// returns the slot to the pool.
///
/// When a block crosses the ready queue it travels as a bare slot index:
/// [`into_slot`](Self::into_slot) releases ownership on the producer side and
/// [`from_slot`](Self::from_slot) re-wraps it on the consumer side. The slot
/// stays taken for the whole trip, so the handle is never aliased.
pub struct Block<'p> {
    pool: &'p BlockPool,
    slot: u8,
}

impl<'p> Block<'p> {
    /// Allocate a block. Returns `None` when the pool is exhausted.
    pub fn alloc(pool: &'p BlockPool) -> Option<Self> {
        pool.alloc().map(|slot| Block { pool, slot })
    }

    /// Wrap an owned slot index.
    ///
    /// # Safety contract
    /// The caller must own `slot` (taken in the pool, no other `Block` for
    /// it). The only call sites are the consumer side of the ready queue and
    /// error recovery on a failed push, both of which receive ownership from
    /// a prior [`into_slot`](Self::into_slot).
    pub(crate) fn from_slot(pool: &'p BlockPool, slot: u8) -> Self {
        Block { pool, slot }
    }

    /// Pool slot index of this block.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Release ownership to a bare slot index without freeing the slot.
    pub(crate) fn into_slot(self) -> u8 {
        let slot = self.slot;
        core::mem::forget(self); // don't run Drop (slot stays taken)
        slot
    }
}

impl Deref for Block<'_> {
    type Target = [u8; BLOCK_SIZE];

    fn deref(&self) -> &Self::Target {
        // SAFETY: We hold the slot's unique handle.
        unsafe { &(*self.pool.data_ptr(self.slot)).bytes }
    }
}

impl DerefMut for Block<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: We hold the slot's unique handle.
        unsafe { &mut (*self.pool.data_ptr(self.slot)).bytes }
    }
}

impl Drop for Block<'_> {
    fn drop(&mut self) {
        self.pool.free(self.slot);
    }
}
