//! Error types for building and deserializing filters.

use thiserror::Error;

/// Errors rejected at build time. All of these are caller programming
/// errors; a successful build never produces a partially usable filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The input keys were not in ascending byte-lexicographic order.
    #[error("input keys are not sorted: key at index {index} sorts before its predecessor")]
    UnsortedKeys { index: usize },

    /// The combined suffix width exceeds one 64-bit word.
    #[error("suffix width of {bits} bits exceeds the 64-bit maximum")]
    SuffixTooWide { bits: u32 },

    /// `sparse_dense_ratio` must be nonzero when the dense tier is enabled.
    #[error("sparse/dense ratio of zero with the dense tier enabled")]
    ZeroSparseDenseRatio,
}

/// Errors surfaced while reading a serialized filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializeError {
    /// The buffer ended before a section was complete.
    #[error("serialized filter truncated: {needed} bytes needed at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// A section length did not fit in the address space.
    #[error("serialized section length overflows")]
    LengthOverflow,

    /// The suffix column header carried an unknown kind byte.
    #[error("invalid suffix kind byte {0}")]
    InvalidSuffixKind(u8),
}
