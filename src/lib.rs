//! # Rangefilter
//!
//! A succinct range filter over a static, sorted set of byte-string keys.
//!
//! The key set is stored as a trie whose topology lives in two succinct
//! encodings: a 256-way bitmap form for the top levels (where nodes are
//! dense) and a level-ordered label-list form for the rest. A per-key
//! suffix column trades memory for false-positive rate. The filter answers
//! point lookups, range emptiness/collection queries, and ordered
//! seek/iterate - with bounded false positives and no false negatives.
//!
//! ## Module Organization
//!
//! - [`bits`] - bitvectors with O(1) rank and select (MSB-first bit order)
//! - [`RangeFilter`] - the filter itself, plus its [`Iter`] cursor
//! - [`FilterConfig`] / [`SuffixKind`] - build-time configuration
//!
//! ## Quick Start
//!
//! ```
//! use rangefilter::{FilterConfig, RangeFilter, SuffixKind};
//!
//! // Keys must be sorted; values are any `bytemuck::Pod` type.
//! let keys = [
//!     (&b"far"[..], 1u64),
//!     (&b"fast"[..], 2),
//!     (&b"toy"[..], 3),
//! ];
//! let config = FilterConfig::default()
//!     .with_suffix_kind(SuffixKind::Real)
//!     .with_real_suffix_bits(8);
//! let filter = RangeFilter::new(&keys, &config).unwrap();
//!
//! assert_eq!(filter.lookup_point(b"fast"), Some(2));
//! assert_eq!(filter.lookup_point(b"fase"), None);
//!
//! // Seek to the first key >= "t" and walk forward.
//! let mut iter = filter.seek_ge(b"t", true);
//! assert_eq!(iter.value(), Some(3));
//! iter.advance();
//! assert!(!iter.valid());
//! ```
//!
//! ## Guarantees
//!
//! Every stored key is found (no false negatives). A lookup of an absent
//! key may report a hit with probability bounded by the suffix width;
//! iterators expose [`Iter::could_be_false_positive`] so callers with
//! access to the true data can re-check boundary hits.
//!
//! ## Features
//!
//! - `serde` - serialization/deserialization support for configuration
//!   types

/// Bitvector implementations with rank and select support.
pub mod bits;

pub(crate) mod binary;
pub(crate) mod builder;
pub(crate) mod config;
pub(crate) mod dense;
pub(crate) mod error;
pub(crate) mod filter;
pub(crate) mod hash;
pub(crate) mod labels;
pub(crate) mod sparse;
pub(crate) mod suffix;
pub(crate) mod util;
pub(crate) mod values;

pub use config::{FilterConfig, SuffixKind};
pub use error::{BuildError, DeserializeError};
pub use filter::{Iter, RangeFilter};
