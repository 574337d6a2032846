//! Fill path: the producer-facing half of the pipeline.
//!
//! The packet source (typically a USB audio endpoint or a radio link) runs in
//! its own interrupt or scheduled-callback context and feeds bytes into the
//! current fill block through a reserve/commit protocol:
//!
//! 1. [`reserve(size)`](Producer::reserve) hands out a writable slice of the
//!    fill block and advances the write offset.
//! 2. The caller fills the slice (typically by pointing a bus transfer at it).
//! 3. [`commit(size)`](Producer::commit) accounts the bytes as valid; when the
//!    block reaches capacity it moves to the ready queue and a fresh fill
//!    block is started.
//!
//! Reservations must fit the remaining capacity of the fill block.
//! [`write`](Producer::write) performs that chunking for callers with an
//! arbitrary byte slice. [`commit_unfinished`](Producer::commit_unfinished)
//! flushes a partial block when the source times out mid-block, substituting
//! silence for the missing tail.

use crate::block::Block;
use crate::constants::BLOCK_SIZE;
use crate::error::Error;

use super::watermark::WatermarkMonitor;
use super::StreamBuffer;

/// Buffer-level notifications delivered to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// Ready-queue occupancy crossed the low watermark from below: enough
    /// audio is buffered to start the transfer engine.
    LowWatermarkCrossedUp,
}

/// Buffer event callback. A plain `fn` so it can be registered from a
/// `static` context and invoked from the producer interrupt.
pub type BufferEventHandler = fn(BufferEvent);

/// The block currently accepting producer writes.
struct FillCursor<'p> {
    block: Block<'p>,
    /// Offset of the next byte handed out by `reserve`.
    write_index: usize,
    /// Bytes committed so far.
    size: usize,
}

impl<'p> FillCursor<'p> {
    fn new(block: Block<'p>) -> Self {
        FillCursor {
            block,
            write_index: 0,
            size: 0,
        }
    }
}

/// Producer half of the pipeline. Owned by the packet-source context; holds
/// all state only that context touches (fill cursor, watermark monitor).
pub struct Producer<'p> {
    shared: &'p StreamBuffer,
    fill: Option<FillCursor<'p>>,
    watermark: WatermarkMonitor,
    handler: BufferEventHandler,
}

impl<'p> Producer<'p> {
    pub(crate) fn new(
        shared: &'p StreamBuffer,
        threshold: usize,
        handler: BufferEventHandler,
    ) -> Self {
        Producer {
            shared,
            fill: None,
            watermark: WatermarkMonitor::new(threshold),
            handler,
        }
    }

    /// Reserve `size` writable bytes in the current fill block.
    ///
    /// Starts a fresh fill block if none is active. Fails with
    /// [`Error::OutOfMemory`] when the pool is exhausted (refuse or defer the
    /// incoming packet) and with [`Error::InvariantViolation`] when the
    /// reservation does not fit the remaining capacity: reservations are
    /// sized upstream, so an oversized one is a chunking bug and is never
    /// truncated. See [`remaining_capacity`](Self::remaining_capacity).
    pub fn reserve(&mut self, size: usize) -> Result<&mut [u8], Error> {
        if self.fill.is_none() {
            let Some(block) = Block::alloc(&self.shared.pool) else {
                log::warn!("block pool exhausted");
                return Err(Error::OutOfMemory);
            };
            self.fill = Some(FillCursor::new(block));
        }
        let Some(cursor) = self.fill.as_mut() else {
            return Err(Error::InvariantViolation);
        };

        if size > BLOCK_SIZE - cursor.write_index {
            log::error!(
                "reservation of {} bytes exceeds remaining capacity {}",
                size,
                BLOCK_SIZE - cursor.write_index
            );
            return Err(Error::InvariantViolation);
        }

        let start = cursor.write_index;
        cursor.write_index += size;
        Ok(&mut cursor.block[start..start + size])
    }

    /// Account `size` reserved bytes as filled.
    ///
    /// When the fill block reaches capacity it is pushed to the ready queue,
    /// a new fill block is started (propagating [`Error::OutOfMemory`] if the
    /// pool is empty, so the stream stalls upstream), and the watermark is
    /// re-evaluated. Committing past capacity, or without a prior `reserve`,
    /// is an [`Error::InvariantViolation`].
    pub fn commit(&mut self, size: usize) -> Result<(), Error> {
        let Some(cursor) = self.fill.as_mut() else {
            log::error!("commit without an active fill block");
            return Err(Error::InvariantViolation);
        };

        cursor.size += size;
        if cursor.size < BLOCK_SIZE {
            return Ok(());
        }

        // `reserve` bounds every reservation to the block, so a nonzero
        // overflow can only mean the caller committed more than it reserved.
        let overflow = cursor.size - BLOCK_SIZE;
        if overflow > 0 {
            log::error!("commit overruns block capacity by {} bytes", overflow);
            return Err(Error::InvariantViolation);
        }

        if let Some(cursor) = self.fill.take() {
            self.push_ready(cursor.block)?;
        }

        // Start the next fill block right away so the next packet has
        // somewhere to land.
        let Some(block) = Block::alloc(&self.shared.pool) else {
            log::warn!("block pool exhausted after commit");
            return Err(Error::OutOfMemory);
        };
        self.fill = Some(FillCursor::new(block));

        self.evaluate_watermark();
        Ok(())
    }

    /// Flush the current fill block before it is full.
    ///
    /// Called when the packet source times out mid-block. The unwritten
    /// remainder is zero-padded (the consumer plays silence, never stale
    /// bytes) and the fill cursor is cleared. A no-op when no fill block is
    /// active (the timeout landed exactly on a block boundary).
    pub fn commit_unfinished(&mut self) -> Result<(), Error> {
        let Some(mut cursor) = self.fill.take() else {
            return Ok(());
        };
        cursor.block[cursor.write_index..].fill(0);
        self.push_ready(cursor.block)
    }

    /// Append `data`, splitting it into reserve/commit pairs sized to the
    /// remaining capacity of the fill block. A write that straddles block
    /// boundaries fills each block exactly and leaves the tail in the new
    /// fill block.
    pub fn write(&mut self, mut data: &[u8]) -> Result<(), Error> {
        while !data.is_empty() {
            let chunk = data.len().min(self.remaining_capacity());
            if chunk == 0 {
                // Only reachable when a reservation was left uncommitted.
                return Err(Error::InvariantViolation);
            }
            self.reserve(chunk)?.copy_from_slice(&data[..chunk]);
            self.commit(chunk)?;
            data = &data[chunk..];
        }
        Ok(())
    }

    /// Bytes still reservable in the current fill block (a whole block when
    /// none is active).
    pub fn remaining_capacity(&self) -> usize {
        match &self.fill {
            Some(cursor) => BLOCK_SIZE - cursor.write_index,
            None => BLOCK_SIZE,
        }
    }

    /// Whether a fill block is currently active.
    pub fn fill_active(&self) -> bool {
        self.fill.is_some()
    }

    pub(crate) fn shared(&self) -> &'p StreamBuffer {
        self.shared
    }

    /// Discard the fill cursor and restore the watermark to its initial
    /// below-threshold condition. The partial block returns to the pool.
    pub(crate) fn clear(&mut self) {
        self.fill = None;
        self.watermark.rearm();
    }

    /// Highest ready-queue occupancy observed since the last reset.
    pub(crate) fn peak_occupancy(&self) -> usize {
        self.watermark.peak()
    }

    fn push_ready(&mut self, block: Block<'p>) -> Result<(), Error> {
        if let Err(slot) = self.shared.ready.push(block.into_slot()) {
            // Statically impossible: the queue has one slot per pool block.
            log::error!("ready queue full, dropping block");
            drop(Block::from_slot(&self.shared.pool, slot));
            return Err(Error::InvariantViolation);
        }
        Ok(())
    }

    fn evaluate_watermark(&mut self) {
        let occupancy = self.shared.ready.len();
        if self.watermark.observe(occupancy) {
            (self.handler)(BufferEvent::LowWatermarkCrossedUp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{POOL_SIZE, WATERMARK_LOW};
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn ignore(_: BufferEvent) {}

    #[test]
    fn reserve_commit_rolls_block_over() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();

        let half = BLOCK_SIZE / 2;
        producer.reserve(half).unwrap().fill(0xAA);
        producer.commit(half).unwrap();
        assert_eq!(buffer.ready_len(), 0);
        assert_eq!(producer.remaining_capacity(), half);

        producer.reserve(half).unwrap().fill(0xBB);
        producer.commit(half).unwrap();
        assert_eq!(buffer.ready_len(), 1);
        // A fresh fill block was started immediately.
        assert!(producer.fill_active());
        assert_eq!(producer.remaining_capacity(), BLOCK_SIZE);
    }

    #[test]
    fn oversized_reservation_rejected_without_truncation() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();

        assert_eq!(
            producer.reserve(BLOCK_SIZE + 1),
            Err(Error::InvariantViolation)
        );
        // The write offset did not advance; a fitting reservation still works.
        assert_eq!(producer.remaining_capacity(), BLOCK_SIZE);
        assert!(producer.reserve(BLOCK_SIZE).is_ok());
    }

    #[test]
    fn reservation_beyond_remaining_capacity_rejected() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();

        producer.reserve(BLOCK_SIZE - 10).unwrap();
        assert_eq!(producer.reserve(11), Err(Error::InvariantViolation));
        assert!(producer.reserve(10).is_ok());
    }

    #[test]
    fn commit_without_reserve_rejected() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        assert_eq!(producer.commit(16), Err(Error::InvariantViolation));
    }

    #[test]
    fn over_commit_rejected() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        producer.reserve(16).unwrap();
        assert_eq!(
            producer.commit(BLOCK_SIZE + 1),
            Err(Error::InvariantViolation)
        );
    }

    #[test]
    fn commit_unfinished_pads_with_silence() {
        let buffer = StreamBuffer::new();
        let (mut producer, mut consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();

        producer.reserve(100).unwrap().fill(0xFF);
        producer.commit(100).unwrap();
        producer.commit_unfinished().unwrap();

        assert_eq!(buffer.ready_len(), 1);
        assert!(!producer.fill_active());

        let block = consumer.next().unwrap();
        assert!(block[..100].iter().all(|&b| b == 0xFF));
        assert!(block[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn commit_unfinished_without_fill_is_noop() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();
        assert_eq!(producer.commit_unfinished(), Ok(()));
        assert_eq!(buffer.ready_len(), 0);
        assert_eq!(buffer.free_blocks(), POOL_SIZE);
    }

    #[test]
    fn straddling_write_fills_whole_blocks_and_carries_tail() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();

        // 2.5 blocks in one logical write.
        let data = [0x42u8; BLOCK_SIZE * 5 / 2];
        producer.write(&data).unwrap();

        assert_eq!(buffer.ready_len(), 2);
        // Half a block resides in the new fill block's prefix.
        assert_eq!(producer.remaining_capacity(), BLOCK_SIZE / 2);
        // Two ready + one fill block allocated.
        assert_eq!(buffer.free_blocks(), POOL_SIZE - 3);
    }

    #[test]
    fn pool_exhaustion_propagates_out_of_memory() {
        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(WATERMARK_LOW, ignore).unwrap();

        let block = [0u8; BLOCK_SIZE];
        for _ in 0..POOL_SIZE - 1 {
            producer.write(&block).unwrap();
        }
        // The last commit pushes the final block but cannot start a new fill.
        assert_eq!(producer.write(&block), Err(Error::OutOfMemory));
        assert_eq!(buffer.ready_len(), POOL_SIZE);
        assert!(!producer.fill_active());

        // Back-pressure: further fills are refused until blocks drain.
        assert_eq!(producer.reserve(16).unwrap_err(), Error::OutOfMemory);
    }

    static CROSSINGS: AtomicUsize = AtomicUsize::new(0);

    fn count_crossings(event: BufferEvent) {
        assert_eq!(event, BufferEvent::LowWatermarkCrossedUp);
        CROSSINGS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn watermark_fires_once_while_filling() {
        CROSSINGS.store(0, Ordering::Relaxed);

        let buffer = StreamBuffer::new();
        let (mut producer, _consumer) = buffer.split(4, count_crossings).unwrap();

        let block = [0u8; BLOCK_SIZE];
        for pushed in 1..=6 {
            producer.write(&block).unwrap();
            assert_eq!(buffer.ready_len(), pushed);
        }
        assert_eq!(CROSSINGS.load(Ordering::Relaxed), 1);
    }
}
