//! # codec-stream
//!
//! A `no_std`, zero-allocation buffering pipeline that decouples a bursty
//! audio packet source (USB/radio RX arriving at a jittery cadence) from a
//! synchronous, double-buffered hardware consumer (an I2S/DMA transfer
//! engine that stalls unless a block is ready the moment it finishes the
//! previous one).
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`block`] | Fixed block pool with exclusively-owned handles |
//! | Pipeline | [`pipeline`] | Fill/drain halves, ready queue, watermark |
//! | Control | [`stream`] | Stream start/underrun/stop state machine |
//!
//! ## Quick start
//!
//! ```ignore
//! use codec_stream::{StreamBuffer, BufferEvent, constants::WATERMARK_LOW};
//!
//! static BUFFER: StreamBuffer = StreamBuffer::new();
//!
//! fn on_buffer_event(event: BufferEvent) {
//!     // BufferEvent::LowWatermarkCrossedUp: enough audio is buffered,
//!     // start the transfer engine.
//! }
//!
//! let (mut producer, mut consumer) =
//!     BUFFER.split(WATERMARK_LOW, on_buffer_event)?;
//!
//! // Packet-source context: append each received packet.
//! producer.write(&packet)?;
//! // ...or reserve/commit to let the bus write in place:
//! let dst = producer.reserve(len)?;
//! // (point the RX transfer at `dst`, then once it completes:)
//! producer.commit(len)?;
//!
//! // Transfer-completion context: pull the next block, stop on None.
//! match consumer.next() {
//!     Some(block) => { /* hand `block` to the DMA engine */ }
//!     None => { /* underrun: stop the engine, notify stream stopped */ }
//! }
//! ```
//!
//! ## Concurrency
//!
//! Single-core, interrupt-driven: the producer half runs in the packet
//! source's context, the consumer half in the transfer engine's completion
//! context. Each half owns its mutable state by value; the shared pool and
//! ready queue are lock-free (bitmap CAS, SPSC ring). No operation blocks,
//! sleeps, or retries; every failure path returns immediately.
//!
//! ## Sizing
//!
//! All capacities are compile-time constants in [`constants`]:
//! `BLOCK_SIZE` = 1024 bytes, `POOL_SIZE` = 32 blocks, `IN_FLIGHT_DEPTH` = 2
//! (hardware double buffering), `WATERMARK_LOW` = 4 blocks.

#![no_std]

pub mod block;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod stream;

pub use block::{Block, BlockPool};
pub use error::Error;
pub use pipeline::{reset, BufferEvent, BufferEventHandler, Consumer, Producer, StreamBuffer};
pub use stream::{StreamControl, StreamEvent, StreamEventHandler, StreamState};
