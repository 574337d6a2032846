//! Fixed-capacity block pool and exclusive block handles.
//!
//! Every byte of audio payload flowing through the pipeline lives in one of
//! [`POOL_SIZE`](crate::constants::POOL_SIZE) fixed blocks allocated at
//! compile time. Blocks are never copied between stages; only ownership of a
//! slot moves: free pool → fill cursor → ready queue → in-flight registry →
//! free pool.

pub mod handle;
pub mod pool;

pub use handle::Block;
pub use pool::BlockPool;
