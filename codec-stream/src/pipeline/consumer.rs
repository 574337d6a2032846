//! Drain path: the consumer-facing half of the pipeline.
//!
//! The transfer engine's completion interrupt calls [`next()`](Consumer::next)
//! each time it finishes a block. The popped block is not freed immediately:
//! hardware double-buffering means the engine may still be reading a block's
//! memory after the driver call that handed over its successor. Each block
//! therefore parks in a small in-flight ring and returns to the pool only
//! once [`IN_FLIGHT_DEPTH`] newer blocks have been requested. That call-order
//! discipline follows the engine's own buffer-swap cadence, with no
//! wall-clock timing involved.

use crate::block::Block;
use crate::constants::{BLOCK_SIZE, IN_FLIGHT_DEPTH};

use super::StreamBuffer;

/// Bounded record of blocks the transfer engine may still reference.
struct InFlight<'p> {
    entries: [Option<Block<'p>>; IN_FLIGHT_DEPTH],
    /// Index of the oldest entry.
    head: usize,
    len: usize,
}

impl<'p> InFlight<'p> {
    fn new() -> Self {
        InFlight {
            entries: core::array::from_fn(|_| None),
            head: 0,
            len: 0,
        }
    }

    /// Admit a block at the tail. When the ring is full the oldest entry is
    /// reclaimed first: its hardware reference is guaranteed stale by the
    /// time this many newer blocks have been requested.
    fn admit(&mut self, block: Block<'p>) -> &Block<'p> {
        if self.len == IN_FLIGHT_DEPTH {
            self.entries[self.head] = None; // returns to the pool via Drop
            self.head = (self.head + 1) % IN_FLIGHT_DEPTH;
            self.len -= 1;
        }
        let tail = (self.head + self.len) % IN_FLIGHT_DEPTH;
        self.len += 1;
        self.entries[tail].insert(block)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Consumer half of the pipeline. Owned by the transfer-completion context;
/// holds the in-flight registry only that context touches.
pub struct Consumer<'p> {
    shared: &'p StreamBuffer,
    in_flight: InFlight<'p>,
}

impl<'p> Consumer<'p> {
    pub(crate) fn new(shared: &'p StreamBuffer) -> Self {
        Consumer {
            shared,
            in_flight: InFlight::new(),
        }
    }

    /// Pull the next ready block for transfer.
    ///
    /// Returns a view of the block's payload. The underlying memory stays
    /// valid until [`IN_FLIGHT_DEPTH`] further `next()` calls, matching the
    /// window in which the transfer engine may still read it.
    ///
    /// `None` means underrun: the ready queue is empty and the caller must
    /// stop the transfer engine. This is expected flow control, not an
    /// error, and leaves the in-flight registry untouched.
    pub fn next(&mut self) -> Option<&[u8; BLOCK_SIZE]> {
        let Some(slot) = self.shared.ready.pop() else {
            log::debug!("ready queue empty");
            return None;
        };
        let block = Block::from_slot(&self.shared.pool, slot);
        Some(&**self.in_flight.admit(block))
    }

    /// Number of blocks currently parked in the in-flight registry.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn shared(&self) -> &'p StreamBuffer {
        self.shared
    }

    /// Return every ready and in-flight block to the pool.
    pub(crate) fn flush(&mut self) {
        while let Some(slot) = self.shared.ready.pop() {
            drop(Block::from_slot(&self.shared.pool, slot));
        }
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{POOL_SIZE, WATERMARK_LOW};
    use crate::pipeline::{BufferEvent, StreamBuffer};

    fn ignore(_: BufferEvent) {}

    /// Push one full block per tag byte, payload filled with that tag.
    fn fill_blocks(producer: &mut crate::pipeline::Producer<'_>, tags: &[u8]) {
        for &tag in tags {
            producer.write(&[tag; BLOCK_SIZE]).unwrap();
        }
    }

    #[test]
    fn reclamation_lags_by_in_flight_depth() {
        let buffer = StreamBuffer::new();
        let (mut producer, mut consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        fill_blocks(&mut producer, &[1, 2, 3, 4]);

        // 4 ready + 1 fresh fill block.
        assert_eq!(buffer.free_blocks(), POOL_SIZE - 5);

        consumer.next().unwrap();
        assert_eq!(consumer.in_flight_len(), 1);
        assert_eq!(buffer.free_blocks(), POOL_SIZE - 5); // nothing reclaimed

        consumer.next().unwrap();
        assert_eq!(consumer.in_flight_len(), 2);
        assert_eq!(buffer.free_blocks(), POOL_SIZE - 5); // registry now full

        // Third pull: exactly the first block returns to the pool.
        consumer.next().unwrap();
        assert_eq!(consumer.in_flight_len(), 2);
        assert_eq!(buffer.free_blocks(), POOL_SIZE - 4);
    }

    #[test]
    fn underrun_returns_none_and_mutates_nothing() {
        let buffer = StreamBuffer::new();
        let (mut producer, mut consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        fill_blocks(&mut producer, &[7, 8]);

        consumer.next().unwrap();
        consumer.next().unwrap();
        assert_eq!(consumer.in_flight_len(), 2);
        let free_before = buffer.free_blocks();

        assert!(consumer.next().is_none());
        assert!(consumer.next().is_none());
        assert_eq!(consumer.in_flight_len(), 2);
        assert_eq!(buffer.free_blocks(), free_before);
    }

    #[test]
    fn blocks_drain_in_fifo_order() {
        let buffer = StreamBuffer::new();
        let (mut producer, mut consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        fill_blocks(&mut producer, &[10, 20, 30]);

        for expected in [10u8, 20, 30] {
            let block = consumer.next().unwrap();
            assert!(block.iter().all(|&b| b == expected));
        }
        assert!(consumer.next().is_none());
    }

    #[test]
    fn flush_returns_everything_to_the_pool() {
        let buffer = StreamBuffer::new();
        let (mut producer, mut consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        fill_blocks(&mut producer, &[1, 2, 3, 4, 5]);
        consumer.next().unwrap();
        consumer.next().unwrap();

        consumer.flush();
        assert_eq!(consumer.in_flight_len(), 0);
        assert_eq!(buffer.ready_len(), 0);
        // Only the producer's fill block remains allocated.
        assert_eq!(buffer.free_blocks(), POOL_SIZE - 1);
        assert!(producer.fill_active());
    }
}
