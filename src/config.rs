//! Filter configuration and shared constants.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Fan-out of a trie node: one slot per possible byte label.
pub(crate) const FANOUT: usize = 256;

/// Reserved label marking a key that ends at an inner node.
///
/// Within a node the terminator sorts first, before all real labels; a real
/// `0xFF` edge can therefore never be the first label of a multi-label node.
pub(crate) const TERMINATOR: u8 = 0xFF;

/// Pre-mask shift applied to the hash word before a hash suffix is cut out.
/// Kept bit-for-bit compatible across implementations.
pub(crate) const HASH_SHIFT: usize = 7;

/// Disambiguation strategy for keys that share their stored trie path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SuffixKind {
    /// No suffix bits; every path match is reported as a hit.
    None = 0,
    /// A slice of the key hash. Cheap membership check, cannot order.
    Hash = 1,
    /// The first bits of the key past the stored prefix. Supports ordering.
    Real = 2,
    /// Hash bits concatenated above real bits.
    Mixed = 3,
}

impl SuffixKind {
    pub(crate) fn from_u8(value: u8) -> Option<SuffixKind> {
        match value {
            0 => Some(SuffixKind::None),
            1 => Some(SuffixKind::Hash),
            2 => Some(SuffixKind::Real),
            3 => Some(SuffixKind::Mixed),
            _ => None,
        }
    }
}

/// Build-time configuration for a [`RangeFilter`](crate::RangeFilter).
///
/// A suffix kind whose configured width works out to zero bits is treated
/// as [`SuffixKind::None`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterConfig {
    /// Emit the bitmap-encoded top levels (default: true).
    pub include_dense: bool,
    /// Keep growing the dense tier while it is at least this many times
    /// more compact than the sparse encoding of the same levels.
    pub sparse_dense_ratio: u32,
    /// Suffix strategy (default: [`SuffixKind::None`]).
    pub suffix_kind: SuffixKind,
    /// Width of the hash portion in bits (`Hash` and `Mixed` only).
    pub hash_suffix_bits: u32,
    /// Width of the real portion in bits (`Real` and `Mixed` only).
    pub real_suffix_bits: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_dense: true,
            sparse_dense_ratio: 16,
            suffix_kind: SuffixKind::None,
            hash_suffix_bits: 0,
            real_suffix_bits: 0,
        }
    }
}

impl FilterConfig {
    /// Enable or disable the dense tier.
    pub fn with_include_dense(mut self, include_dense: bool) -> Self {
        self.include_dense = include_dense;
        self
    }

    /// Set the sparse/dense size ratio.
    pub fn with_sparse_dense_ratio(mut self, ratio: u32) -> Self {
        self.sparse_dense_ratio = ratio;
        self
    }

    /// Set the suffix strategy.
    pub fn with_suffix_kind(mut self, kind: SuffixKind) -> Self {
        self.suffix_kind = kind;
        self
    }

    /// Set the hash suffix width in bits.
    pub fn with_hash_suffix_bits(mut self, bits: u32) -> Self {
        self.hash_suffix_bits = bits;
        self
    }

    /// Set the real suffix width in bits.
    pub fn with_real_suffix_bits(mut self, bits: u32) -> Self {
        self.real_suffix_bits = bits;
        self
    }

    /// Effective hash width given the suffix kind.
    pub(crate) fn hash_len(&self) -> usize {
        match self.suffix_kind {
            SuffixKind::Hash | SuffixKind::Mixed => self.hash_suffix_bits as usize,
            _ => 0,
        }
    }

    /// Effective real width given the suffix kind.
    pub(crate) fn real_len(&self) -> usize {
        match self.suffix_kind {
            SuffixKind::Real | SuffixKind::Mixed => self.real_suffix_bits as usize,
            _ => 0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        let width = self.hash_len() + self.real_len();
        if width > 64 {
            return Err(BuildError::SuffixTooWide { bits: width as u32 });
        }
        if self.include_dense && self.sparse_dense_ratio == 0 {
            return Err(BuildError::ZeroSparseDenseRatio);
        }
        Ok(())
    }
}
