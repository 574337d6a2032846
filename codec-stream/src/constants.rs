/// Number of 32-bit words per transfer block (one I2S transfer's worth of
/// frames in the target configuration).
pub const BLOCK_SIZE_WORDS: usize = 256;

/// Transfer block capacity in bytes.
pub const BLOCK_SIZE: usize = BLOCK_SIZE_WORDS * 4;

/// Number of blocks in the pool.
pub const POOL_SIZE: usize = 32;

/// Hardware double-buffering depth: how many blocks the transfer engine may
/// still be reading after `next()` returns. Reclamation of a block lags its
/// hand-out by exactly this many `next()` calls.
pub const IN_FLIGHT_DEPTH: usize = 2;

/// Default low-watermark threshold on ready-queue occupancy. Crossing it
/// upward signals that enough audio is buffered to start the transfer engine.
pub const WATERMARK_LOW: usize = 4;

/// Ready-queue slot count: `POOL_SIZE` usable entries plus the one sentinel
/// slot the Lamport queue reserves for full/empty disambiguation.
pub(crate) const READY_QUEUE_SLOTS: usize = POOL_SIZE + 1;
