//! Lock-free single-producer single-consumer ring of pool slot indices.
//!
//! Backs the ready queue. The fill path (producer interrupt context) is the
//! sole pusher; the drain path (consumer interrupt context) is the sole
//! popper. The two contexts share one core and may preempt each other, so the
//! queue uses the Lamport algorithm with acquire/release index ordering
//! instead of a critical section.
//!
//! # Contract
//!
//! - Only ONE context may call [`push()`](IndexQueue::push).
//! - Only ONE context may call [`pop()`](IndexQueue::pop).
//! - One of the `N` slots is reserved for full/empty disambiguation, so the
//!   usable capacity is `N - 1`.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free SPSC ring holding `N - 1` slot indices.
pub struct IndexQueue<const N: usize> {
    buffer: UnsafeCell<[u8; N]>,
    /// Write position, only advanced by the producer.
    head: AtomicUsize,
    /// Read position, only advanced by the consumer.
    tail: AtomicUsize,
}

// SAFETY: `head` is written by the producer only and `tail` by the consumer
// only; release stores on each index publish the matching buffer access, so
// the two contexts never read a slot the other side is still writing.
unsafe impl<const N: usize> Sync for IndexQueue<N> {}

impl<const N: usize> IndexQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        assert!(N >= 2, "ring needs one data slot plus the sentinel");
        IndexQueue {
            buffer: UnsafeCell::new([0u8; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Push a slot index (producer side). Returns `Err(slot)` when full.
    pub fn push(&self, slot: u8) -> Result<(), u8> {
        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) % N;

        if next_head == self.tail.load(Ordering::Acquire) {
            return Err(slot);
        }

        // SAFETY: sole producer; `next_head != tail` means the consumer is
        // not reading this slot.
        unsafe {
            (*self.buffer.get())[head] = slot;
        }

        self.head.store(next_head, Ordering::Release);
        Ok(())
    }

    /// Pop the oldest slot index (consumer side). `None` when empty.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: sole consumer; `tail != head` means the producer has
        // published this slot.
        let slot = unsafe { (*self.buffer.get())[tail] };

        self.tail.store((tail + 1) % N, Ordering::Release);
        Some(slot)
    }

    /// Number of queued indices. A snapshot; exact when called from either
    /// endpoint context, conservative otherwise.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire) == self.head.load(Ordering::Acquire)
    }
}
