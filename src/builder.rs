//! Single-pass construction of the per-level trie staging vectors.
//!
//! One forward scan over the sorted keys fills the sparse-format staging
//! vectors (labels, child indicators, LOUDS bits, suffixes, values); the
//! dense bitmaps for the levels above the cutoff are then derived from the
//! sparse staging. The staging vectors are consumed by
//! [`LoudsDense::from_builder`](crate::dense::LoudsDense) and
//! [`LoudsSparse::from_builder`](crate::sparse::LoudsSparse).

use bytemuck::Pod;
use log::debug;

use crate::bits::WORD_BITS;
use crate::config::{FilterConfig, SuffixKind, FANOUT, TERMINATOR};
use crate::error::BuildError;
use crate::suffix::construct_suffix;
use crate::util::broadword::MSB_MASK;

fn set_bit(bits: &mut [u64], pos: usize) {
    debug_assert!(pos < bits.len() * WORD_BITS);
    bits[pos / WORD_BITS] |= MSB_MASK >> (pos % WORD_BITS);
}

fn read_bit(bits: &[u64], pos: usize) -> bool {
    debug_assert!(pos < bits.len() * WORD_BITS);
    bits[pos / WORD_BITS] & (MSB_MASK >> (pos % WORD_BITS)) != 0
}

/// Per-level staging vectors produced by one scan of the sorted input.
///
/// Levels `< sparse_start_level` are encoded densely, the rest sparsely.
pub(crate) struct Builder<V> {
    include_dense: bool,
    sparse_dense_ratio: u32,
    pub(crate) suffix_kind: SuffixKind,
    pub(crate) hash_len: usize,
    pub(crate) real_len: usize,
    pub(crate) sparse_start_level: usize,

    // Sparse staging
    pub(crate) labels: Vec<Vec<u8>>,
    pub(crate) child_indicator_bits: Vec<Vec<u64>>,
    pub(crate) louds_bits: Vec<Vec<u64>>,

    // Dense staging, derived after the cutoff decision
    pub(crate) bitmap_labels: Vec<Vec<u64>>,
    pub(crate) bitmap_child_bits: Vec<Vec<u64>>,
    pub(crate) prefixkey_bits: Vec<Vec<u64>>,

    pub(crate) suffixes: Vec<Vec<u64>>,
    pub(crate) suffix_counts: Vec<usize>,
    pub(crate) values: Vec<Vec<V>>,

    pub(crate) node_counts: Vec<usize>,
    last_item_terminator: Vec<bool>,
    /// Whether the empty key is stored. Disambiguates a terminator at the
    /// very first root slot from a real `0xFF` edge of a singleton trie.
    stores_empty_key: bool,
}

impl<V: Pod> Builder<V> {
    pub(crate) fn new(config: &FilterConfig) -> Result<Self, BuildError> {
        config.validate()?;
        let hash_len = config.hash_len();
        let real_len = config.real_len();
        // A zero-width suffix stores nothing; normalize so lookups skip
        // the equality check entirely.
        let suffix_kind = if hash_len + real_len == 0 {
            SuffixKind::None
        } else {
            config.suffix_kind
        };

        Ok(Self {
            include_dense: config.include_dense,
            sparse_dense_ratio: config.sparse_dense_ratio,
            suffix_kind,
            hash_len,
            real_len,
            sparse_start_level: 0,
            labels: Vec::new(),
            child_indicator_bits: Vec::new(),
            louds_bits: Vec::new(),
            bitmap_labels: Vec::new(),
            bitmap_child_bits: Vec::new(),
            prefixkey_bits: Vec::new(),
            suffixes: Vec::new(),
            suffix_counts: Vec::new(),
            values: Vec::new(),
            node_counts: Vec::new(),
            last_item_terminator: Vec::new(),
            stores_empty_key: false,
        })
    }

    /// Fill the staging vectors from the sorted `(key, value)` list.
    ///
    /// Runs of byte-identical keys are collapsed; the first value of a run
    /// wins. Fails on out-of-order input.
    pub(crate) fn build<K: AsRef<[u8]>>(&mut self, keys: &[(K, V)]) -> Result<(), BuildError> {
        self.build_sparse(keys)?;
        if self.include_dense {
            self.determine_cutoff_level();
            self.build_dense();
        }
        debug!(
            "built staging vectors: height={}, sparse_start_level={}, nodes={:?}",
            self.tree_height(),
            self.sparse_start_level,
            self.node_counts
        );
        Ok(())
    }

    pub(crate) fn tree_height(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn suffix_width(&self) -> usize {
        self.hash_len + self.real_len
    }

    fn build_sparse<K: AsRef<[u8]>>(&mut self, keys: &[(K, V)]) -> Result<(), BuildError> {
        let mut i = 0;
        while i < keys.len() {
            let key = keys[i].0.as_ref();
            let value = keys[i].1;

            let level = self.skip_common_prefix(key);

            while i + 1 < keys.len() && keys[i + 1].0.as_ref() == key {
                i += 1;
            }
            let next_key = if i + 1 < keys.len() {
                let next = keys[i + 1].0.as_ref();
                if next < key {
                    return Err(BuildError::UnsortedKeys { index: i + 1 });
                }
                Some(next)
            } else {
                None
            };

            let level = self.insert_key_bytes_until_unique(key, value, next_key, level);
            self.insert_suffix(key, level);
            i += 1;
        }
        Ok(())
    }

    /// Walk down the partially built trie along `key` while it matches the
    /// previous key, confirming each matched label as an internal edge.
    fn skip_common_prefix(&mut self, key: &[u8]) -> usize {
        let mut level = 0;
        while level < key.len() && self.is_char_common_prefix(key[level], level) {
            let pos = self.num_items(level) - 1;
            set_bit(&mut self.child_indicator_bits[level], pos);
            level += 1;
        }
        level
    }

    /// Emit `key`'s bytes from `start_level` until the first position where
    /// it no longer matches `next_key`; the last emitted byte (or a
    /// terminator when the key runs out first) is the terminal. Returns the
    /// level one past the terminal.
    fn insert_key_bytes_until_unique(
        &mut self,
        key: &[u8],
        value: V,
        next_key: Option<&[u8]>,
        start_level: usize,
    ) -> usize {
        if key.is_empty() {
            // The empty key is a prefix-key of the root.
            let is_start_of_node = self.is_level_empty(0);
            self.insert_key_byte(TERMINATOR, 0, is_start_of_node, true);
            self.values[0].push(value);
            self.stores_empty_key = true;
            return 1;
        }

        let mut level = start_level;
        let is_start_of_node = self.is_level_empty(level);
        // The first byte past the common prefix joins the previous key's
        // node.
        self.insert_key_byte(key[level], level, is_start_of_node, false);
        level += 1;

        let next_key = next_key.unwrap_or(&[]);
        if level > next_key.len() || key[..level] != next_key[..level] {
            self.values[level - 1].push(value);
            return level;
        }

        // Every byte from here on starts a new node.
        while level < key.len() && level < next_key.len() && key[level] == next_key[level] {
            self.insert_key_byte(key[level], level, true, false);
            level += 1;
        }

        if level < key.len() {
            self.insert_key_byte(key[level], level, true, false);
        } else {
            self.insert_key_byte(TERMINATOR, level, true, true);
        }
        self.values[level].push(value);
        level + 1
    }

    fn insert_key_byte(&mut self, c: u8, level: usize, is_start_of_node: bool, is_term: bool) {
        while level >= self.tree_height() {
            self.add_level();
        }

        // The previous key's label at the parent level gains a child.
        if level > 0 {
            let pos = self.num_items(level - 1) - 1;
            set_bit(&mut self.child_indicator_bits[level - 1], pos);
        }

        self.labels[level].push(c);
        if is_start_of_node {
            let pos = self.num_items(level) - 1;
            set_bit(&mut self.louds_bits[level], pos);
            self.node_counts[level] += 1;
        }
        self.last_item_terminator[level] = is_term;

        self.move_to_next_item_slot(level);
    }

    fn insert_suffix(&mut self, key: &[u8], level: usize) {
        if level >= self.tree_height() {
            self.add_level();
        }
        let suffix = construct_suffix(self.suffix_kind, key, self.hash_len, level, self.real_len);
        self.store_suffix(level, suffix);
    }

    fn store_suffix(&mut self, level: usize, suffix: u64) {
        let width = self.suffix_width();
        if width == 0 {
            self.suffix_counts[level - 1] += 1;
            return;
        }
        let words = &mut self.suffixes[level - 1];
        let pos = self.suffix_counts[level - 1] * width;
        debug_assert!(pos <= words.len() * WORD_BITS);
        if pos == words.len() * WORD_BITS {
            words.push(0);
        }
        let word_id = pos / WORD_BITS;
        let offset = pos % WORD_BITS;
        let word_remaining = WORD_BITS - offset;
        if width <= word_remaining {
            words[word_id] |= suffix << (word_remaining - width);
        } else {
            words[word_id] |= suffix >> (width - word_remaining);
            words.push(0);
            words[word_id + 1] |= suffix << (WORD_BITS - (width - word_remaining));
        }
        self.suffix_counts[level - 1] += 1;
    }

    fn is_char_common_prefix(&self, c: u8, level: usize) -> bool {
        level < self.tree_height()
            && !self.last_item_terminator[level]
            && self.labels[level].last() == Some(&c)
    }

    fn is_level_empty(&self, level: usize) -> bool {
        level >= self.tree_height() || self.labels[level].is_empty()
    }

    fn move_to_next_item_slot(&mut self, level: usize) {
        let num_items = self.num_items(level);
        if num_items % WORD_BITS == 0 {
            self.child_indicator_bits[level].push(0);
            self.louds_bits[level].push(0);
        }
    }

    fn add_level(&mut self) {
        self.labels.push(Vec::new());
        self.child_indicator_bits.push(vec![0]);
        self.louds_bits.push(vec![0]);
        self.suffixes.push(Vec::new());
        self.suffix_counts.push(0);
        self.values.push(Vec::new());
        self.node_counts.push(0);
        self.last_item_terminator.push(false);
    }

    fn num_items(&self, level: usize) -> usize {
        self.labels[level].len()
    }

    /// Grow the dense tier while it stays `sparse_dense_ratio` times more
    /// compact than the sparse encoding of the same levels.
    fn determine_cutoff_level(&mut self) {
        let mut cutoff = 0;
        while cutoff < self.tree_height()
            && (self.compute_dense_mem(cutoff) * self.sparse_dense_ratio as u64)
                < self.compute_sparse_mem(cutoff)
        {
            cutoff += 1;
        }
        self.sparse_start_level = cutoff;
    }

    fn compute_dense_mem(&self, downto_level: usize) -> u64 {
        let width = self.suffix_width() as u64;
        let mut mem = 0u64;
        for level in 0..downto_level {
            mem += 2 * FANOUT as u64 * self.node_counts[level] as u64;
            if level > 0 {
                mem += (self.node_counts[level - 1] as u64 + 7) / 8;
            }
            mem += (self.suffix_counts[level] as u64 * width + 7) / 8;
        }
        mem
    }

    fn compute_sparse_mem(&self, start_level: usize) -> u64 {
        let width = self.suffix_width() as u64;
        let mut mem = 0u64;
        for level in start_level..self.tree_height() {
            let num_items = self.labels[level].len() as u64;
            mem += num_items + 2 * ((num_items + 7) / 8);
            mem += (self.suffix_counts[level] as u64 * width + 7) / 8;
        }
        mem
    }

    /// Derive the dense bitmaps for the levels below the cutoff from the
    /// sparse staging vectors.
    fn build_dense(&mut self) {
        for level in 0..self.sparse_start_level {
            self.init_dense_vectors(level);
            if self.num_items(level) == 0 {
                continue;
            }

            let mut node_num = 0;
            if self.is_terminator(level, 0) {
                set_bit(&mut self.prefixkey_bits[level], 0);
            } else {
                self.set_label_and_child_bitmap(level, node_num, 0);
            }
            for pos in 1..self.num_items(level) {
                if self.is_start_of_node(level, pos) {
                    node_num += 1;
                    if self.is_terminator(level, pos) {
                        set_bit(&mut self.prefixkey_bits[level], node_num);
                        continue;
                    }
                }
                self.set_label_and_child_bitmap(level, node_num, pos);
            }
        }
    }

    fn init_dense_vectors(&mut self, level: usize) {
        let words_per_node = FANOUT / WORD_BITS;
        let node_count = self.node_counts[level];
        self.bitmap_labels.push(vec![0; node_count * words_per_node]);
        self.bitmap_child_bits
            .push(vec![0; node_count * words_per_node]);
        self.prefixkey_bits
            .push(vec![0; node_count.div_ceil(WORD_BITS)]);
    }

    fn set_label_and_child_bitmap(&mut self, level: usize, node_num: usize, pos: usize) {
        let label = self.labels[level][pos];
        let bit = node_num * FANOUT + label as usize;
        set_bit(&mut self.bitmap_labels[level], bit);
        if read_bit(&self.child_indicator_bits[level], pos) {
            set_bit(&mut self.bitmap_child_bits[level], bit);
        }
    }

    fn is_start_of_node(&self, level: usize, pos: usize) -> bool {
        read_bit(&self.louds_bits[level], pos)
    }

    fn is_terminator(&self, level: usize, pos: usize) -> bool {
        // The first root slot can hold a real 0xFF edge of a one-key trie;
        // everywhere else a non-child 0xFF at a node start is a terminator
        // (a real 0xFF edge sorts last and never opens a node).
        self.labels[level][pos] == TERMINATOR
            && !read_bit(&self.child_indicator_bits[level], pos)
            && (level > 0 || pos > 0 || self.stores_empty_key)
    }

    /// Encode every level densely, regardless of the size heuristic. Only
    /// meaningful after a build with `include_dense = false`.
    #[cfg(test)]
    pub(crate) fn force_all_dense(&mut self) {
        assert!(self.bitmap_labels.is_empty());
        self.sparse_start_level = self.tree_height();
        self.build_dense();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_from(keys: &[(&[u8], u64)], config: &FilterConfig) -> Builder<u64> {
        let mut builder = Builder::new(config).unwrap();
        builder.build(keys).unwrap();
        builder
    }

    fn paper_keys() -> Vec<(&'static [u8], u64)> {
        vec![
            (b"f", 1),
            (b"far", 2),
            (b"fast", 3),
            (b"s", 4),
            (b"top", 5),
            (b"toy", 6),
            (b"trie", 7),
        ]
    }

    #[test]
    fn test_paper_example_levels() {
        let config = FilterConfig::default().with_include_dense(false);
        let builder = build_from(&paper_keys(), &config);

        // Level 0: f, s, t. Level 1: terminator (for "f"), a, o, r.
        assert_eq!(builder.labels[0], vec![b'f', b's', b't']);
        assert_eq!(builder.labels[1], vec![TERMINATOR, b'a', b'o', b'r']);
        // Level 2: r, s under "fa"; p, y under "to". "trie" already became
        // unique at its 'r', so nothing reaches level 2 for it.
        assert_eq!(builder.labels[2], vec![b'r', b's', b'p', b'y']);
        // The last level exists only as the (empty) suffix overflow level.
        assert_eq!(builder.labels[3], Vec::<u8>::new());
        assert_eq!(builder.tree_height(), 4);

        assert_eq!(builder.node_counts[0], 1);
        assert_eq!(builder.node_counts[1], 2);
        assert_eq!(builder.node_counts[2], 2);
        assert_eq!(builder.node_counts[3], 0);
    }

    #[test]
    fn test_paper_example_louds_bits() {
        let config = FilterConfig::default().with_include_dense(false);
        let builder = build_from(&paper_keys(), &config);

        // Level 1 nodes: [TERM a] under f, [o r] under t.
        assert!(read_bit(&builder.louds_bits[1], 0));
        assert!(!read_bit(&builder.louds_bits[1], 1));
        assert!(read_bit(&builder.louds_bits[1], 2));
        assert!(!read_bit(&builder.louds_bits[1], 3));

        // Level 1 child bits: 'a' and 'o' are internal; the terminator and
        // the 'r' of "trie" terminate.
        assert!(!read_bit(&builder.child_indicator_bits[1], 0));
        assert!(read_bit(&builder.child_indicator_bits[1], 1));
        assert!(read_bit(&builder.child_indicator_bits[1], 2));
        assert!(!read_bit(&builder.child_indicator_bits[1], 3));
    }

    #[test]
    fn test_values_recorded_at_terminal_levels() {
        let config = FilterConfig::default().with_include_dense(false);
        let builder = build_from(&paper_keys(), &config);

        // "s" terminates at level 0; "f" (terminator) and "trie" at level
        // 1; "far", "fast", "top", "toy" at level 2.
        assert_eq!(builder.values[0], vec![4]);
        assert_eq!(builder.values[1], vec![1, 7]);
        assert_eq!(builder.values[2], vec![2, 3, 5, 6]);
        assert_eq!(builder.values[3], Vec::<u64>::new());
    }

    #[test]
    fn test_suffix_counts_match_values() {
        let config = FilterConfig::default()
            .with_include_dense(false)
            .with_suffix_kind(SuffixKind::Real)
            .with_real_suffix_bits(8);
        let builder = build_from(&paper_keys(), &config);
        for level in 0..builder.tree_height() {
            assert_eq!(
                builder.suffix_counts[level],
                builder.values[level].len(),
                "level {}",
                level
            );
        }
    }

    #[test]
    fn test_cutoff_level_with_default_ratio() {
        let config = FilterConfig::default();
        let builder = build_from(&paper_keys(), &config);
        // Few keys: one dense level wins, deeper levels stay sparse.
        assert!(builder.sparse_start_level >= 1);
        assert_eq!(builder.bitmap_labels.len(), builder.sparse_start_level);
        assert_eq!(builder.prefixkey_bits.len(), builder.sparse_start_level);
    }

    #[test]
    fn test_dense_bitmap_contents() {
        let config = FilterConfig::default();
        let builder = build_from(&paper_keys(), &config);
        assert!(builder.sparse_start_level >= 1);

        // Root bitmap: f, s, t present; f and t have children; s is a leaf.
        assert!(read_bit(&builder.bitmap_labels[0], b'f' as usize));
        assert!(read_bit(&builder.bitmap_labels[0], b's' as usize));
        assert!(read_bit(&builder.bitmap_labels[0], b't' as usize));
        assert!(!read_bit(&builder.bitmap_labels[0], b'x' as usize));
        assert!(read_bit(&builder.bitmap_child_bits[0], b'f' as usize));
        assert!(!read_bit(&builder.bitmap_child_bits[0], b's' as usize));
        assert!(read_bit(&builder.bitmap_child_bits[0], b't' as usize));
    }

    #[test]
    fn test_prefix_key_becomes_dense_prefix_bit() {
        // The empty key is a prefix-key of the root, which always lands in
        // the dense tier when it is enabled.
        let keys: Vec<(&[u8], u64)> = vec![(b"", 1), (b"a", 2)];
        let builder = build_from(&keys, &FilterConfig::default());
        assert_eq!(builder.sparse_start_level, 1);
        assert!(read_bit(&builder.prefixkey_bits[0], 0));
        assert!(read_bit(&builder.bitmap_labels[0], b'a' as usize));
        assert!(!read_bit(&builder.bitmap_labels[0], TERMINATOR as usize));
    }

    #[test]
    fn test_duplicate_keys_first_value_wins() {
        let keys: Vec<(&[u8], u64)> = vec![(b"dup", 10), (b"dup", 20), (b"dup", 30), (b"zz", 40)];
        let config = FilterConfig::default().with_include_dense(false);
        let builder = build_from(&keys, &config);
        let total: usize = builder.values.iter().map(Vec::len).sum();
        assert_eq!(total, 2);
        // Both survivors are level-0 leaves; "dup" kept its first value.
        assert_eq!(builder.values[0], vec![10, 40]);
    }

    #[test]
    fn test_unsorted_input_rejected() {
        let keys: Vec<(&[u8], u64)> = vec![(b"beta", 1), (b"alpha", 2)];
        let mut builder: Builder<u64> = Builder::new(&FilterConfig::default()).unwrap();
        assert_eq!(
            builder.build(&keys),
            Err(BuildError::UnsortedKeys { index: 1 })
        );
    }

    #[test]
    fn test_unsorted_after_duplicates_rejected() {
        let keys: Vec<(&[u8], u64)> = vec![(b"b", 1), (b"b", 2), (b"a", 3)];
        let mut builder: Builder<u64> = Builder::new(&FilterConfig::default()).unwrap();
        assert_eq!(
            builder.build(&keys),
            Err(BuildError::UnsortedKeys { index: 2 })
        );
    }

    #[test]
    fn test_empty_input() {
        let keys: Vec<(&[u8], u64)> = Vec::new();
        let builder = build_from(&keys, &FilterConfig::default());
        assert_eq!(builder.tree_height(), 0);
        assert_eq!(builder.sparse_start_level, 0);
    }

    #[test]
    fn test_empty_key_is_root_prefix() {
        let keys: Vec<(&[u8], u64)> = vec![(b"", 1), (b"a", 2)];
        let config = FilterConfig::default().with_include_dense(false);
        let builder = build_from(&keys, &config);
        assert_eq!(builder.labels[0], vec![TERMINATOR, b'a']);
        assert!(!read_bit(&builder.child_indicator_bits[0], 0));
        assert_eq!(builder.values[0], vec![1, 2]);
    }

    #[test]
    fn test_zero_width_suffix_normalized_to_none() {
        let config = FilterConfig::default()
            .with_suffix_kind(SuffixKind::Real)
            .with_real_suffix_bits(0);
        let builder: Builder<u64> = Builder::new(&config).unwrap();
        assert_eq!(builder.suffix_kind, SuffixKind::None);
    }
}
