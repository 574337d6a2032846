use core::fmt;

/// Errors surfaced by the buffering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The block pool is exhausted. Recoverable: apply back-pressure upstream
    /// (refuse or defer the next producer packet) and try again later.
    OutOfMemory,
    /// A static-sizing or calling-convention guarantee was broken (oversized
    /// reservation, over-commit, ready-queue overflow, double init). Not
    /// recoverable; indicates a configuration or caller bug.
    InvariantViolation,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfMemory => f.write_str("block pool exhausted"),
            Error::InvariantViolation => f.write_str("internal invariant violation"),
        }
    }
}
