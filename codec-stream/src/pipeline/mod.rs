//! The buffering pipeline: shared core, producer/consumer halves, reset.
//!
//! ## Components
//!
//! | Component | Owner | Purpose |
//! |-----------|-------|---------|
//! | [`StreamBuffer`] | application (`static`) | block pool + ready queue |
//! | [`Producer`] | packet-source context | fill cursor, watermark monitor |
//! | [`Consumer`] | transfer-completion context | in-flight registry |
//!
//! Data flow: packet source → fill cursor → (block full) → ready queue →
//! (`next()`) → in-flight registry → (two newer pulls) → pool.
//!
//! [`StreamBuffer::split`] hands each interrupt context its own half, so all
//! state a context mutates is owned by value on its side; the only shared
//! structures are the lock-free pool and the SPSC ready queue. That is the
//! whole mutual-exclusion story: no critical sections, nothing blocks.

pub mod consumer;
pub mod producer;
pub mod spsc;
pub mod watermark;

pub use consumer::Consumer;
pub use producer::{BufferEvent, BufferEventHandler, Producer};

use core::sync::atomic::{AtomicBool, Ordering};

use crate::block::BlockPool;
use crate::constants::{POOL_SIZE, READY_QUEUE_SLOTS};
use crate::error::Error;

use spsc::IndexQueue;

/// Shared core of the pipeline: the block pool and the ready queue.
///
/// Created once (typically as a `static`) and split into a [`Producer`] and a
/// [`Consumer`] half via [`split`](Self::split).
pub struct StreamBuffer {
    pub(crate) pool: BlockPool,
    pub(crate) ready: IndexQueue<READY_QUEUE_SLOTS>,
    taken: AtomicBool,
}

impl StreamBuffer {
    /// Create an empty pipeline core.
    pub const fn new() -> Self {
        StreamBuffer {
            pool: BlockPool::new(),
            ready: IndexQueue::new(),
            taken: AtomicBool::new(false),
        }
    }

    /// Initialize the pipeline: validate the watermark threshold, register
    /// the event callback, and hand out the two halves.
    ///
    /// May only be called once per buffer; a second call, or a threshold
    /// outside `1..=POOL_SIZE`, fails with [`Error::InvariantViolation`].
    pub fn split(
        &self,
        threshold: usize,
        handler: BufferEventHandler,
    ) -> Result<(Producer<'_>, Consumer<'_>), Error> {
        if threshold == 0 || threshold > POOL_SIZE {
            log::error!("watermark threshold {} out of range", threshold);
            return Err(Error::InvariantViolation);
        }
        if self.taken.swap(true, Ordering::AcqRel) {
            log::error!("stream buffer already split");
            return Err(Error::InvariantViolation);
        }
        Ok((Producer::new(self, threshold, handler), Consumer::new(self)))
    }

    /// Current ready-queue occupancy.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of free blocks left in the pool.
    pub fn free_blocks(&self) -> usize {
        POOL_SIZE - self.pool.allocated_count() as usize
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Return every block to the pool and restore the pipeline's initial state:
/// the ready queue and in-flight registry are drained, a partially written
/// fill block is discarded, and the watermark re-arms below threshold.
///
/// Requiring `&mut` on both halves is the mutual-exclusion discipline for
/// reset: neither interrupt context can have a fill or drain call in
/// progress while the application holds them. Idempotent.
pub fn reset(producer: &mut Producer<'_>, consumer: &mut Consumer<'_>) {
    debug_assert!(
        core::ptr::eq(producer.shared(), consumer.shared()),
        "halves of different stream buffers"
    );

    log::info!(
        "reset: max queue occupancy {}, max pool occupancy {}",
        producer.peak_occupancy(),
        producer.shared().pool.peak_count()
    );

    consumer.flush();
    producer.clear();
    producer.shared().pool.reset_peak();
}
