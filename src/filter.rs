//! The public filter: LOUDS-Dense stacked on LOUDS-Sparse.
//!
//! Point lookups run through the dense levels and continue in the sparse
//! levels when the key outlives the dense height. Seeks drive a pair of
//! sub-cursors, one per tier; the dense cursor hands the walk to the
//! sparse cursor through a node ordinal, and stepping advances the sparse
//! cursor first, climbing back into the dense levels when it exhausts its
//! subtrie.

use bytemuck::Pod;
use log::debug;

use crate::binary::{Reader, Writer};
use crate::builder::Builder;
use crate::config::FilterConfig;
use crate::dense::{DenseIter, DenseResult, LoudsDense};
use crate::error::{BuildError, DeserializeError};
use crate::sparse::{LoudsSparse, SparseIter};
use crate::suffix::KeyCompare;

/// A static, succinct filter over an ordered set of byte keys.
///
/// Queries may return false positives at a rate bounded by the configured
/// suffix width; stored keys are never missed. The structure is immutable
/// once built and safe to share across threads by reference.
///
/// The lifetime parameter tracks borrowed storage:
/// [`deserialize`](Self::deserialize) aliases the input buffer, while
/// [`new`](Self::new) owns everything (`RangeFilter<'static, V>`).
pub struct RangeFilter<'a, V: Pod = u64> {
    dense: LoudsDense<'a, V>,
    sparse: LoudsSparse<'a, V>,
}

impl<V: Pod> RangeFilter<'static, V> {
    /// Build a filter from keys in ascending byte order.
    ///
    /// Duplicate keys collapse to their first value. Returns an error on
    /// out-of-order input or an invalid configuration; an empty input
    /// yields an empty filter on which every query misses.
    pub fn new<K: AsRef<[u8]>>(
        keys: &[(K, V)],
        config: &FilterConfig,
    ) -> Result<RangeFilter<'static, V>, BuildError> {
        let mut builder = Builder::new(config)?;
        builder.build(keys)?;
        let dense = LoudsDense::from_builder(&builder);
        let sparse = LoudsSparse::from_builder(&builder);
        debug!(
            "filter built: {} keys in, height {}, dense levels {}",
            keys.len(),
            sparse.height(),
            dense.height()
        );
        Ok(RangeFilter { dense, sparse })
    }
}

impl<'a, V: Pod> RangeFilter<'a, V> {
    /// Tree height in levels (longest stored path).
    pub fn height(&self) -> usize {
        self.sparse.height()
    }

    /// First level encoded sparsely; levels above it are dense.
    pub fn sparse_start_level(&self) -> usize {
        self.sparse.start_level()
    }

    fn is_empty_trie(&self) -> bool {
        self.sparse.height() == 0
    }

    /// Look up `key`, returning its value on a (possibly false-positive)
    /// hit.
    pub fn lookup_point(&self, key: &[u8]) -> Option<V> {
        if self.is_empty_trie() {
            return None;
        }
        match self.dense.lookup_key(key) {
            DenseResult::Found(value) => Some(value),
            DenseResult::Missing => None,
            DenseResult::Descend(node) => self.sparse.lookup_key(key, node),
        }
    }

    /// All values whose keys fall in the range from `left` to `right`
    /// with the given endpoint inclusivities.
    pub fn lookup_range(
        &self,
        left: &[u8],
        left_inclusive: bool,
        right: &[u8],
        right_inclusive: bool,
    ) -> Vec<V> {
        let mut results = Vec::new();
        let mut iter = self.seek_ge(left, left_inclusive);
        while iter.valid() {
            let admit = match iter.compare(right) {
                KeyCompare::Less | KeyCompare::CouldBePositive => true,
                KeyCompare::Equal => right_inclusive,
                KeyCompare::Greater => break,
            };
            if admit {
                if let Some(value) = iter.value() {
                    results.push(value);
                }
            }
            iter.advance();
        }
        results
    }

    /// Iterator at the smallest stored key `>= key` (`> key` when not
    /// inclusive, where equality is decidable).
    pub fn seek_ge(&self, key: &[u8], inclusive: bool) -> Iter<'_, 'a, V> {
        let mut iter = Iter::new(self);
        if self.is_empty_trie() {
            return iter;
        }

        iter.could_be_fp = self.dense.seek_ge(key, inclusive, &mut iter.dense);
        if !iter.dense.is_valid() || iter.dense.is_complete() {
            return iter;
        }

        if !iter.dense.is_search_complete() {
            iter.pass_to_sparse();
            iter.could_be_fp = self.sparse.seek_ge(key, inclusive, &mut iter.sparse);
            if !iter.sparse.is_valid() {
                iter.increment_dense();
            }
        } else if !iter.dense.is_move_left_complete() {
            iter.pass_to_sparse();
            iter.sparse.move_to_leftmost_key();
        }
        iter
    }

    /// Iterator at the largest stored key `<= key` (`< key` when not
    /// inclusive, where equality is decidable).
    pub fn seek_lt(&self, key: &[u8], inclusive: bool) -> Iter<'_, 'a, V> {
        let mut iter = self.seek_ge(key, true);
        if !iter.valid() {
            return self.last();
        }
        match iter.compare(key) {
            KeyCompare::Equal | KeyCompare::CouldBePositive if inclusive => {
                // Possibly sitting on the key itself.
                iter.could_be_fp = true;
            }
            KeyCompare::Less => {
                iter.could_be_fp = false;
            }
            _ => {
                iter.retreat();
                iter.could_be_fp = false;
            }
        }
        iter
    }

    /// Iterator at the smallest stored key.
    pub fn first(&self) -> Iter<'_, 'a, V> {
        let mut iter = Iter::new(self);
        if self.is_empty_trie() {
            return iter;
        }
        if self.dense.height() > 0 {
            iter.dense.move_to_first();
            if iter.dense.is_valid() && !iter.dense.is_move_left_complete() {
                iter.pass_to_sparse();
                iter.sparse.move_to_leftmost_key();
            }
        } else {
            iter.sparse.move_to_leftmost_key();
        }
        iter
    }

    /// Iterator at the largest stored key.
    pub fn last(&self) -> Iter<'_, 'a, V> {
        let mut iter = Iter::new(self);
        if self.is_empty_trie() {
            return iter;
        }
        if self.dense.height() > 0 {
            iter.dense.move_to_last();
            if iter.dense.is_valid() && !iter.dense.is_move_right_complete() {
                iter.pass_to_sparse();
                iter.sparse.move_to_rightmost_key();
            }
        } else {
            iter.sparse.move_to_rightmost_key();
        }
        iter
    }

    /// Serialize into a contiguous byte buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.dense.serialize(&mut writer);
        self.sparse.serialize(&mut writer);
        writer.into_vec()
    }

    /// Size in bytes of [`serialize`](Self::serialize)'s output.
    pub fn serialized_size(&self) -> usize {
        let mut writer = Writer::new();
        self.dense.serialize(&mut writer);
        self.sparse.serialize(&mut writer);
        writer.len()
    }

    /// Reconstruct a filter over a serialized buffer.
    ///
    /// The filter aliases `bytes` where alignment permits, so the buffer
    /// must outlive it; no index is rebuilt. Fails on truncated or
    /// malformed input.
    pub fn deserialize(bytes: &'a [u8]) -> Result<RangeFilter<'a, V>, DeserializeError> {
        let mut reader = Reader::new(bytes);
        let dense = LoudsDense::deserialize(&mut reader)?;
        let sparse = LoudsSparse::deserialize(&mut reader)?;
        Ok(RangeFilter { dense, sparse })
    }

    /// Total bytes held by the filter's arrays and indices.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.dense.heap_size() + self.sparse.heap_size()
    }
}

/// Bidirectional cursor over the stored keys.
///
/// Obtained from the seek and first/last methods on [`RangeFilter`]. An
/// iterator stepped past either end becomes invalid; there is no error.
pub struct Iter<'t, 'a, V: Pod = u64> {
    dense: DenseIter<'t, 'a, V>,
    sparse: SparseIter<'t, 'a, V>,
    could_be_fp: bool,
}

impl<'t, 'a, V: Pod> Iter<'t, 'a, V> {
    fn new(filter: &'t RangeFilter<'a, V>) -> Self {
        Self {
            dense: DenseIter::new(&filter.dense),
            sparse: SparseIter::new(&filter.sparse),
            could_be_fp: false,
        }
    }

    /// Does the iterator point at a stored key?
    pub fn valid(&self) -> bool {
        if self.dense.trie_height() == 0 {
            return self.sparse.is_valid();
        }
        self.dense.is_valid() && (self.dense.is_complete() || self.sparse.is_valid())
    }

    /// Whether the seek that produced this iterator may have landed on a
    /// false positive; callers with access to the true keys can re-check.
    pub fn could_be_false_positive(&self) -> bool {
        self.could_be_fp
    }

    /// The stored path of the current key (excludes suffix bits).
    pub fn key(&self) -> Vec<u8> {
        if !self.valid() {
            return Vec::new();
        }
        let mut key = self.dense.key_bytes().to_vec();
        if !self.dense.is_complete() {
            key.extend_from_slice(self.sparse.key_bytes());
        }
        key
    }

    /// The current key extended with its stored real-suffix bytes, when a
    /// real suffix is configured. Trailing sub-byte bits are padded low.
    pub fn key_with_suffix(&self) -> Vec<u8> {
        let mut key = self.key();
        if let Some((suffix, len)) = self.suffix() {
            if suffix > 0 && len > 0 {
                let aligned = suffix << (64 - len);
                key.extend_from_slice(&aligned.to_be_bytes()[..len.div_ceil(8)]);
            }
        }
        key
    }

    /// Real suffix bits of the current terminal and their width.
    pub fn suffix(&self) -> Option<(u64, usize)> {
        if !self.valid() {
            return None;
        }
        if self.dense.is_complete() {
            self.dense.suffix()
        } else {
            self.sparse.suffix()
        }
    }

    /// Value stored with the current key.
    pub fn value(&self) -> Option<V> {
        if !self.valid() {
            return None;
        }
        if self.dense.is_complete() {
            self.dense.value()
        } else {
            self.sparse.value()
        }
    }

    /// Step to the next key. Returns whether the iterator is still valid.
    pub fn advance(&mut self) -> bool {
        if !self.valid() {
            return false;
        }
        if self.increment_sparse() {
            return true;
        }
        self.increment_dense()
    }

    /// Step to the previous key. Returns whether the iterator is still
    /// valid.
    pub fn retreat(&mut self) -> bool {
        if !self.valid() {
            return false;
        }
        if self.decrement_sparse() {
            return true;
        }
        self.decrement_dense()
    }

    pub(crate) fn compare(&self, key: &[u8]) -> KeyCompare {
        debug_assert!(self.valid());
        let dense_compare = self.dense.compare(key);
        if self.dense.is_complete() || dense_compare != KeyCompare::Equal {
            return dense_compare;
        }
        self.sparse.compare(key)
    }

    fn pass_to_sparse(&mut self) {
        self.sparse.start_node = self.dense.send_out_node;
    }

    fn increment_sparse(&mut self) -> bool {
        if !self.sparse.is_valid() {
            return false;
        }
        self.sparse.increment();
        self.sparse.is_valid()
    }

    fn increment_dense(&mut self) -> bool {
        if !self.dense.is_valid() {
            return false;
        }
        self.dense.increment();
        if !self.dense.is_valid() {
            return false;
        }
        if self.dense.is_move_left_complete() {
            return true;
        }
        self.pass_to_sparse();
        self.sparse.clear();
        self.sparse.move_to_leftmost_key();
        true
    }

    fn decrement_sparse(&mut self) -> bool {
        if !self.sparse.is_valid() {
            return false;
        }
        self.sparse.decrement();
        self.sparse.is_valid()
    }

    fn decrement_dense(&mut self) -> bool {
        if !self.dense.is_valid() {
            return false;
        }
        self.dense.decrement();
        if !self.dense.is_valid() {
            return false;
        }
        if self.dense.is_move_right_complete() {
            return true;
        }
        self.pass_to_sparse();
        self.sparse.clear();
        self.sparse.move_to_rightmost_key();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuffixKind;

    fn real8() -> FilterConfig {
        FilterConfig::default()
            .with_suffix_kind(SuffixKind::Real)
            .with_real_suffix_bits(8)
    }

    fn paper_filter() -> RangeFilter<'static, u64> {
        let keys: Vec<(&[u8], u64)> = vec![
            (b"f", 1),
            (b"far", 2),
            (b"fast", 3),
            (b"s", 4),
            (b"top", 5),
            (b"toy", 6),
            (b"trie", 7),
        ];
        RangeFilter::new(&keys, &real8()).unwrap()
    }

    #[test]
    fn test_lookup_spans_both_tiers() {
        let filter = paper_filter();
        assert!(filter.sparse_start_level() >= 1);
        for (key, value) in [
            (b"f" as &[u8], 1u64),
            (b"far", 2),
            (b"fast", 3),
            (b"s", 4),
            (b"top", 5),
            (b"toy", 6),
            (b"trie", 7),
        ] {
            assert_eq!(filter.lookup_point(key), Some(value), "key {:?}", key);
        }
        assert_eq!(filter.lookup_point(b"fase"), None);
        assert_eq!(filter.lookup_point(b"to"), None);
        assert_eq!(filter.lookup_point(b"z"), None);
    }

    #[test]
    fn test_forward_iteration_over_both_tiers() {
        let filter = paper_filter();
        let mut iter = filter.first();
        let mut values = Vec::new();
        while iter.valid() {
            values.push(iter.value().unwrap());
            iter.advance();
        }
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_backward_iteration_over_both_tiers() {
        let filter = paper_filter();
        let mut iter = filter.last();
        let mut values = Vec::new();
        while iter.valid() {
            values.push(iter.value().unwrap());
            iter.retreat();
        }
        assert_eq!(values, vec![7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_iter_key_concatenates_tiers() {
        let filter = paper_filter();
        let iter = filter.seek_ge(b"to", true);
        assert!(iter.valid());
        assert_eq!(iter.key(), b"top");
        assert_eq!(iter.value(), Some(5));
    }

    #[test]
    fn test_seek_then_advance_crosses_subtries() {
        let filter = paper_filter();
        let mut iter = filter.seek_ge(b"to", true);
        assert_eq!(iter.key(), b"top");
        iter.advance();
        assert_eq!(iter.key(), b"toy");
        iter.advance();
        assert_eq!(iter.key(), b"tr");
        assert!(!iter.advance());
        assert!(!iter.valid());
    }

    #[test]
    fn test_empty_filter() {
        let keys: Vec<(&[u8], u64)> = Vec::new();
        let filter = RangeFilter::new(&keys, &FilterConfig::default()).unwrap();
        assert_eq!(filter.lookup_point(b"anything"), None);
        assert!(!filter.first().valid());
        assert!(!filter.last().valid());
        assert!(!filter.seek_ge(b"a", true).valid());
        assert!(!filter.seek_lt(b"a", true).valid());
        assert!(filter.lookup_range(b"a", true, b"z", true).is_empty());
    }

    #[test]
    fn test_sparse_only_filter() {
        let keys: Vec<(&[u8], u64)> = vec![(b"ant", 1), (b"bee", 2), (b"cat", 3)];
        let config = real8().with_include_dense(false);
        let filter = RangeFilter::new(&keys, &config).unwrap();
        assert_eq!(filter.sparse_start_level(), 0);

        assert_eq!(filter.lookup_point(b"bee"), Some(2));
        assert_eq!(filter.lookup_point(b"bat"), None);

        let mut iter = filter.first();
        let mut values = Vec::new();
        while iter.valid() {
            values.push(iter.value().unwrap());
            iter.advance();
        }
        assert_eq!(values, vec![1, 2, 3]);

        let iter = filter.seek_ge(b"b", true);
        assert_eq!(iter.value(), Some(2));
    }

    #[test]
    fn test_seek_lt() {
        let filter = paper_filter();

        let iter = filter.seek_lt(b"t", true);
        assert!(iter.valid());
        assert_eq!(iter.value(), Some(4)); // "s"

        // Inclusive on a stored key keeps the key.
        let iter = filter.seek_lt(b"top", true);
        assert_eq!(iter.value(), Some(5));
        assert!(iter.could_be_false_positive());

        // Exclusive steps below it.
        let iter = filter.seek_lt(b"top", false);
        assert_eq!(iter.value(), Some(4));

        // Below the smallest key: invalid.
        let iter = filter.seek_lt(b"a", false);
        assert!(!iter.valid());

        // Above the largest key: the last key.
        let iter = filter.seek_lt(b"zzz", true);
        assert_eq!(iter.value(), Some(7));
    }

    #[test]
    fn test_serialize_roundtrip_answers_identically() {
        let filter = paper_filter();
        let bytes = filter.serialize();
        assert_eq!(bytes.len(), filter.serialized_size());
        let restored: RangeFilter<'_, u64> = RangeFilter::deserialize(&bytes).unwrap();

        for key in [b"f" as &[u8], b"far", b"fast", b"fase", b"s", b"to", b"top", b"z"] {
            assert_eq!(
                restored.lookup_point(key),
                filter.lookup_point(key),
                "key {:?}",
                key
            );
        }
        assert_eq!(
            restored.lookup_range(b"f", true, b"tz", true),
            filter.lookup_range(b"f", true, b"tz", true)
        );
        assert_eq!(restored.height(), filter.height());
        assert_eq!(restored.sparse_start_level(), filter.sparse_start_level());
    }

    #[test]
    fn test_deserialize_rejects_truncation() {
        let filter = paper_filter();
        let bytes = filter.serialize();
        let result: Result<RangeFilter<'_, u64>, _> =
            RangeFilter::deserialize(&bytes[..bytes.len() / 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_memory_usage_positive() {
        let filter = paper_filter();
        assert!(filter.memory_usage() > 0);
    }
}
