//! LOUDS-Dense: bitmap-encoded top levels of the trie.
//!
//! Each node owns 256 label bits and 256 child-indicator bits plus one
//! prefix-key bit. Child ordinals come from rank over the child bitmap, so
//! descending a level is a rank query. Nodes of all dense levels share one
//! global numbering, with the root as node 0.

use bytemuck::Pod;

use crate::binary::{Reader, Writer};
use crate::bits::{BitVector, RankVector};
use crate::builder::Builder;
use crate::config::FANOUT;
use crate::error::DeserializeError;
use crate::suffix::{KeyCompare, SuffixColumn, SuffixCompare};
use crate::values::ValueColumn;

/// Outcome of a dense point lookup.
pub(crate) enum DenseResult<V> {
    /// The key terminated in the dense levels with a suffix match.
    Found(V),
    /// The key provably does not exist.
    Missing,
    /// The key survived all dense levels; the walk continues in the
    /// sparse encoding at this node.
    Descend(usize),
}

/// The dense tier: levels `[0, height)` of the trie.
pub(crate) struct LoudsDense<'a, V: Pod> {
    height: usize,
    label_bitmaps: RankVector<'a>,
    child_bitmaps: RankVector<'a>,
    prefixkey_bits: RankVector<'a>,
    suffixes: SuffixColumn<'a>,
    values: ValueColumn<'a, V>,
}

impl<'a, V: Pod> LoudsDense<'a, V> {
    pub(crate) fn from_builder(builder: &Builder<V>) -> LoudsDense<'static, V> {
        let height = builder.sparse_start_level;
        let bits_per_level: Vec<usize> = (0..height)
            .map(|level| builder.bitmap_labels[level].len() * 64)
            .collect();

        let label_bitmaps = RankVector::new(BitVector::from_levels(
            &builder.bitmap_labels,
            &bits_per_level,
            0,
            height,
        ));
        let child_bitmaps = RankVector::new(BitVector::from_levels(
            &builder.bitmap_child_bits,
            &bits_per_level,
            0,
            height,
        ));
        let prefixkey_bits = RankVector::new(BitVector::from_levels(
            &builder.prefixkey_bits,
            &builder.node_counts,
            0,
            height,
        ));

        let suffixes = SuffixColumn::from_levels(
            builder.suffix_kind,
            builder.hash_len,
            builder.real_len,
            &builder.suffixes,
            &builder.suffix_counts,
            0,
            height,
        );
        let values = ValueColumn::from_levels(&builder.values, 0, height);

        LoudsDense {
            height,
            label_bitmaps,
            child_bitmaps,
            prefixkey_bits,
            suffixes,
            values,
        }
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn has_root_prefix_key(&self) -> bool {
        self.height > 0 && self.prefixkey_bits.num_bits() > 0 && self.prefixkey_bits.read_bit(0)
    }

    /// Descend along `key`. Resolves to a value, a definite miss, or the
    /// sparse node where the walk continues.
    pub(crate) fn lookup_key(&self, key: &[u8]) -> DenseResult<V> {
        let mut node_num = 0;
        for level in 0..self.height {
            let mut pos = node_num * FANOUT;
            if level >= key.len() {
                // Out of key bytes: only a prefix-key can match here.
                if self.prefixkey_bits.read_bit(node_num) {
                    let suffix_pos = self.suffix_pos(pos, true);
                    if self.suffixes.check_equality(suffix_pos, key, level + 1) {
                        return DenseResult::Found(self.values.read(suffix_pos));
                    }
                }
                return DenseResult::Missing;
            }
            pos += key[level] as usize;

            if !self.label_bitmaps.read_bit(pos) {
                return DenseResult::Missing;
            }
            if !self.child_bitmaps.read_bit(pos) {
                let suffix_pos = self.suffix_pos(pos, false);
                return if self.suffixes.check_equality(suffix_pos, key, level + 1) {
                    DenseResult::Found(self.values.read(suffix_pos))
                } else {
                    DenseResult::Missing
                };
            }
            node_num = self.child_node(pos);
        }
        DenseResult::Descend(node_num)
    }

    /// Position the iterator at the smallest key `>= key` (`> key` when
    /// `inclusive` is false and equality is decidable). Returns the
    /// could-be-false-positive flag.
    pub(crate) fn seek_ge(
        &self,
        key: &[u8],
        inclusive: bool,
        iter: &mut DenseIter<'_, 'a, V>,
    ) -> bool {
        let mut node_num = 0;
        for level in 0..self.height {
            let pos = node_num * FANOUT;
            if level >= key.len() {
                iter.append(self.first_pos_from(pos));
                if self.prefixkey_bits.read_bit(node_num) {
                    // The stored prefix-key equals the query exactly.
                    iter.at_prefix_key = true;
                    iter.set_flags(true, true, true, true);
                    if !inclusive {
                        iter.increment();
                        return false;
                    }
                } else {
                    iter.move_to_leftmost_key();
                }
                return true;
            }

            let pos = pos + key[level] as usize;
            iter.append(pos);

            if !self.label_bitmaps.read_bit(pos) {
                iter.increment();
                return false;
            }
            if !self.child_bitmaps.read_bit(pos) {
                return self.compare_suffix_ge(pos, key, level + 1, inclusive, iter);
            }
            node_num = self.child_node(pos);
        }

        // The search continues in the sparse levels.
        iter.send_out_node = node_num;
        iter.set_flags(true, false, true, true);
        true
    }

    fn compare_suffix_ge(
        &self,
        pos: usize,
        key: &[u8],
        level: usize,
        inclusive: bool,
        iter: &mut DenseIter<'_, 'a, V>,
    ) -> bool {
        let suffix_pos = self.suffix_pos(pos, false);
        match self.suffixes.compare(suffix_pos, key, level) {
            SuffixCompare::Less => {
                iter.increment();
                false
            }
            SuffixCompare::CouldBePositive if !inclusive && self.suffixes.is_orderable() => {
                // Possibly equal to the exclusive bound: step past it.
                iter.set_flags(true, true, true, true);
                iter.increment();
                false
            }
            _ => {
                iter.set_flags(true, true, true, true);
                true
            }
        }
    }

    #[inline]
    fn child_node(&self, pos: usize) -> usize {
        self.child_bitmaps.rank(pos)
    }

    /// Ordinal of the terminal at `pos` among all dense terminals, which
    /// indexes both the suffix and the value column.
    fn suffix_pos(&self, pos: usize, is_prefix_key: bool) -> usize {
        // A prefix-key-only root stores no labels; clamp its probe.
        let pos = pos.min(self.label_bitmaps.num_bits() - 1);
        let node_num = pos / FANOUT;
        let mut suffix_pos = self.label_bitmaps.rank(pos) - self.child_bitmaps.rank(pos)
            + self.prefixkey_bits.rank(node_num)
            - 1;
        // The prefix-key slot precedes the node's label terminals.
        if is_prefix_key && self.label_bitmaps.read_bit(pos) && !self.child_bitmaps.read_bit(pos) {
            suffix_pos -= 1;
        }
        suffix_pos
    }

    /// First labelled position at or after `pos`; `num_bits` when none.
    fn first_pos_from(&self, pos: usize) -> usize {
        if pos < self.label_bitmaps.num_bits() && self.label_bitmaps.read_bit(pos) {
            pos
        } else {
            self.next_pos(pos)
        }
    }

    fn next_pos(&self, pos: usize) -> usize {
        pos + self.label_bitmaps.distance_to_next_set_bit(pos)
    }

    fn prev_pos(&self, pos: usize) -> Option<usize> {
        self.label_bitmaps.prev_set_bit(pos)
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.label_bitmaps.heap_size()
            + self.child_bitmaps.heap_size()
            + self.prefixkey_bits.heap_size()
            + self.suffixes.heap_size()
            + self.values.heap_size()
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u32(self.height as u32);
        writer.align8();
        self.label_bitmaps.serialize(writer);
        self.child_bitmaps.serialize(writer);
        self.prefixkey_bits.serialize(writer);
        self.suffixes.serialize(writer);
        self.values.serialize(writer);
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let height = reader.u32()? as usize;
        reader.align8();
        let label_bitmaps = RankVector::deserialize(reader)?;
        let child_bitmaps = RankVector::deserialize(reader)?;
        let prefixkey_bits = RankVector::deserialize(reader)?;
        let suffixes = SuffixColumn::deserialize(reader)?;
        let values = ValueColumn::deserialize(reader)?;
        Ok(LoudsDense {
            height,
            label_bitmaps,
            child_bitmaps,
            prefixkey_bits,
            suffixes,
            values,
        })
    }
}

/// Cursor over the dense levels.
///
/// `move_left_complete == false` hands the leftmost descent over to the
/// sparse iterator at `send_out_node`; `move_right_complete` is the
/// symmetric signal, and `search_complete == false` means the seek itself
/// must continue in the sparse levels.
pub(crate) struct DenseIter<'t, 'a, V: Pod> {
    trie: &'t LoudsDense<'a, V>,
    pub(crate) valid: bool,
    search_complete: bool,
    move_left_complete: bool,
    move_right_complete: bool,
    pub(crate) send_out_node: usize,
    key_len: usize,
    key: Vec<u8>,
    pos_in_trie: Vec<usize>,
    pub(crate) at_prefix_key: bool,
}

impl<'t, 'a, V: Pod> DenseIter<'t, 'a, V> {
    pub(crate) fn new(trie: &'t LoudsDense<'a, V>) -> Self {
        Self {
            trie,
            valid: false,
            search_complete: false,
            move_left_complete: false,
            move_right_complete: false,
            send_out_node: 0,
            key_len: 0,
            key: vec![0; trie.height],
            pos_in_trie: vec![0; trie.height],
            at_prefix_key: false,
        }
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub(crate) fn is_search_complete(&self) -> bool {
        self.search_complete
    }

    #[inline]
    pub(crate) fn is_move_left_complete(&self) -> bool {
        self.move_left_complete
    }

    #[inline]
    pub(crate) fn is_move_right_complete(&self) -> bool {
        self.move_right_complete
    }

    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.search_complete && self.move_left_complete && self.move_right_complete
    }

    #[inline]
    pub(crate) fn trie_height(&self) -> usize {
        self.trie.height
    }

    /// Position at the first stored key.
    pub(crate) fn move_to_first(&mut self) {
        self.set_to_first_label_in_root();
        if self.trie.has_root_prefix_key() {
            self.at_prefix_key = true;
            self.set_flags(true, true, true, true);
            return;
        }
        self.move_to_leftmost_key();
    }

    /// Position at the last stored key.
    pub(crate) fn move_to_last(&mut self) {
        if self.set_to_last_label_in_root() {
            self.move_to_rightmost_key();
        } else if self.trie.has_root_prefix_key() {
            // Only the empty key is stored.
            self.pos_in_trie[0] = self.trie.first_pos_from(0);
            self.key_len = 1;
            self.at_prefix_key = true;
            self.set_flags(true, true, true, true);
        } else {
            self.valid = false;
        }
    }

    fn set_to_first_label_in_root(&mut self) {
        self.pos_in_trie[0] = self.trie.first_pos_from(0);
        self.key[0] = (self.pos_in_trie[0] % FANOUT) as u8;
        self.key_len = 1;
    }

    fn set_to_last_label_in_root(&mut self) -> bool {
        match self.trie.prev_pos(FANOUT) {
            Some(pos) => {
                self.pos_in_trie[0] = pos;
                self.key[0] = pos as u8;
                self.key_len = 1;
                true
            }
            None => false,
        }
    }

    /// Descend to the smallest key in the subtree below the current
    /// position, handing off to the sparse levels if the subtree extends
    /// past the dense height.
    pub(crate) fn move_to_leftmost_key(&mut self) {
        debug_assert!(self.key_len > 0);
        let mut level = self.key_len - 1;
        let mut pos = self.pos_in_trie[level];
        if pos >= self.trie.label_bitmaps.num_bits() {
            self.valid = false;
            return;
        }
        if !self.trie.child_bitmaps.read_bit(pos) {
            self.set_flags(true, true, true, true);
            return;
        }

        while level < self.trie.height - 1 {
            let node_num = self.trie.child_node(pos);
            if self.trie.prefixkey_bits.read_bit(node_num) {
                self.append(self.trie.first_pos_from(node_num * FANOUT));
                self.at_prefix_key = true;
                self.set_flags(true, true, true, true);
                return;
            }

            pos = self.trie.first_pos_from(node_num * FANOUT);
            self.append(pos);

            if !self.trie.child_bitmaps.read_bit(pos) {
                self.set_flags(true, true, true, true);
                return;
            }
            level += 1;
        }
        self.send_out_node = self.trie.child_node(pos);
        self.set_flags(true, true, false, true);
    }

    /// Symmetric to [`move_to_leftmost_key`](Self::move_to_leftmost_key).
    pub(crate) fn move_to_rightmost_key(&mut self) {
        debug_assert!(self.key_len > 0);
        let mut level = self.key_len - 1;
        let mut pos = self.pos_in_trie[level];
        if pos >= self.trie.label_bitmaps.num_bits() {
            self.valid = false;
            return;
        }
        if !self.trie.child_bitmaps.read_bit(pos) {
            self.set_flags(true, true, true, true);
            return;
        }

        while level < self.trie.height - 1 {
            let node_num = self.trie.child_node(pos);
            match self.trie.prev_pos((node_num + 1) * FANOUT) {
                None => {
                    self.valid = false;
                    return;
                }
                Some(prev) => pos = prev,
            }
            self.append(pos);

            if !self.trie.child_bitmaps.read_bit(pos) {
                self.set_flags(true, true, true, true);
                return;
            }
            level += 1;
        }
        self.send_out_node = self.trie.child_node(pos);
        self.set_flags(true, true, true, false);
    }

    /// Step to the next dense position in key order.
    pub(crate) fn increment(&mut self) {
        if self.key_len == 0 {
            self.valid = false;
            return;
        }
        if self.at_prefix_key {
            // The prefix-key precedes every key below its node.
            self.at_prefix_key = false;
            self.move_to_leftmost_key();
            return;
        }

        let mut pos = self.pos_in_trie[self.key_len - 1];
        let mut next_pos = self.trie.next_pos(pos);
        while next_pos / FANOUT > pos / FANOUT {
            // Node exhausted: climb to the parent label and retry.
            self.key_len -= 1;
            if self.key_len == 0 {
                self.valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len - 1];
            next_pos = self.trie.next_pos(pos);
        }
        self.set(self.key_len - 1, next_pos);
        self.move_to_leftmost_key();
    }

    /// Step to the previous dense position in key order.
    pub(crate) fn decrement(&mut self) {
        if self.key_len == 0 {
            self.valid = false;
            return;
        }
        if self.at_prefix_key {
            self.at_prefix_key = false;
            self.key_len -= 1;
            if self.key_len == 0 {
                self.valid = false;
                return;
            }
        }

        let mut pos = self.pos_in_trie[self.key_len - 1];
        let mut prev_pos = match self.trie.prev_pos(pos) {
            // No earlier label anywhere: the only candidate predecessor
            // is the current node's prefix-key.
            None => {
                if self.land_on_prefix_key(pos) {
                    return;
                }
                self.valid = false;
                return;
            }
            Some(p) => p,
        };

        while prev_pos / FANOUT < pos / FANOUT {
            // Crossing the node boundary backwards lands on the node's
            // prefix-key when it has one.
            if self.land_on_prefix_key(pos) {
                return;
            }

            self.key_len -= 1;
            if self.key_len == 0 {
                self.valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len - 1];
            prev_pos = match self.trie.prev_pos(pos) {
                None => {
                    if self.land_on_prefix_key(pos) {
                        return;
                    }
                    self.valid = false;
                    return;
                }
                Some(p) => p,
            };
        }
        self.set(self.key_len - 1, prev_pos);
        self.move_to_rightmost_key();
    }

    fn land_on_prefix_key(&mut self, pos: usize) -> bool {
        if !self.trie.prefixkey_bits.read_bit(pos / FANOUT) {
            return false;
        }
        self.at_prefix_key = true;
        self.set_flags(true, true, true, true);
        true
    }

    /// Compare the current position to `key`. `Equal` means the dense part
    /// matches and the sparse part must finish the comparison.
    pub(crate) fn compare(&self, key: &[u8]) -> KeyCompare {
        if self.at_prefix_key && self.key_len - 1 < key.len() {
            return KeyCompare::Less;
        }
        let iter_key = self.key_bytes();
        let min_len = iter_key.len().min(key.len());
        match iter_key[..min_len].cmp(&key[..min_len]) {
            std::cmp::Ordering::Less => return KeyCompare::Less,
            std::cmp::Ordering::Greater => return KeyCompare::Greater,
            std::cmp::Ordering::Equal => {}
        }
        if iter_key.len() > key.len() {
            return KeyCompare::Greater;
        }
        if self.is_complete() {
            let suffix_pos = self
                .trie
                .suffix_pos(self.pos_in_trie[self.key_len - 1], self.at_prefix_key);
            return self.trie.suffixes.compare(suffix_pos, key, self.key_len).into();
        }
        KeyCompare::Equal
    }

    /// The dense portion of the current key.
    pub(crate) fn key_bytes(&self) -> &[u8] {
        if !self.valid {
            return &[];
        }
        let mut len = self.key_len;
        if self.at_prefix_key {
            len -= 1;
        }
        &self.key[..len]
    }

    pub(crate) fn value(&self) -> Option<V> {
        if !self.is_complete() {
            return None;
        }
        let suffix_pos = self
            .trie
            .suffix_pos(self.pos_in_trie[self.key_len - 1], self.at_prefix_key);
        Some(self.trie.values.read(suffix_pos))
    }

    /// Real suffix bits and width of the current terminal.
    pub(crate) fn suffix(&self) -> Option<(u64, usize)> {
        if !self.is_complete() || !self.trie.suffixes.is_orderable() {
            return None;
        }
        let suffix_pos = self
            .trie
            .suffix_pos(self.pos_in_trie[self.key_len - 1], self.at_prefix_key);
        Some((
            self.trie.suffixes.read_real(suffix_pos),
            self.trie.suffixes.real_len(),
        ))
    }

    fn append(&mut self, pos: usize) {
        debug_assert!(self.key_len < self.key.len());
        self.key[self.key_len] = (pos % FANOUT) as u8;
        self.pos_in_trie[self.key_len] = pos;
        self.key_len += 1;
    }

    fn set(&mut self, level: usize, pos: usize) {
        debug_assert!(level < self.key.len());
        self.key[level] = (pos % FANOUT) as u8;
        self.pos_in_trie[level] = pos;
    }

    pub(crate) fn set_flags(
        &mut self,
        valid: bool,
        search_complete: bool,
        move_left_complete: bool,
        move_right_complete: bool,
    ) {
        self.valid = valid;
        self.search_complete = search_complete;
        self.move_left_complete = move_left_complete;
        self.move_right_complete = move_right_complete;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;

    fn dense_only(keys: &[(&[u8], u64)]) -> LoudsDense<'static, u64> {
        use crate::config::SuffixKind;
        let config = FilterConfig::default()
            .with_include_dense(false)
            .with_suffix_kind(SuffixKind::Real)
            .with_real_suffix_bits(8);
        let mut builder = Builder::new(&config).unwrap();
        builder.build(keys).unwrap();
        builder.force_all_dense();
        LoudsDense::from_builder(&builder)
    }

    fn lookup(trie: &LoudsDense<'_, u64>, key: &[u8]) -> Option<u64> {
        match trie.lookup_key(key) {
            DenseResult::Found(v) => Some(v),
            _ => None,
        }
    }

    #[test]
    fn test_lookup_leaves() {
        let keys: Vec<(&[u8], u64)> = vec![(b"ab", 1), (b"ad", 2), (b"cc", 3)];
        let trie = dense_only(&keys);
        assert_eq!(lookup(&trie, b"ab"), Some(1));
        assert_eq!(lookup(&trie, b"ad"), Some(2));
        assert_eq!(lookup(&trie, b"cc"), Some(3));
        assert_eq!(lookup(&trie, b"ac"), None);
        // "cc" terminates at its first byte; the 8-bit real suffix tells
        // "c" and "ca" apart from it.
        assert_eq!(lookup(&trie, b"c"), None);
        assert_eq!(lookup(&trie, b"ca"), None);
        // "ab" stores no suffix bits (the path exhausts it), so an
        // extension of it is an admitted false positive.
        assert_eq!(lookup(&trie, b"abx"), Some(1));
    }

    #[test]
    fn test_lookup_prefix_key() {
        let keys: Vec<(&[u8], u64)> = vec![(b"top", 1), (b"topper", 2)];
        let trie = dense_only(&keys);
        assert_eq!(lookup(&trie, b"top"), Some(1));
        assert_eq!(lookup(&trie, b"topper"), Some(2));
        assert_eq!(lookup(&trie, b"to"), None);
        assert_eq!(lookup(&trie, b"topp"), None);
    }

    #[test]
    fn test_iteration_in_order() {
        let keys: Vec<(&[u8], u64)> = vec![(b"ab", 1), (b"ad", 2), (b"ba", 3), (b"bc", 4)];
        let trie = dense_only(&keys);
        let mut iter = DenseIter::new(&trie);
        iter.move_to_first();

        let mut seen = Vec::new();
        while iter.is_valid() {
            seen.push((iter.key_bytes().to_vec(), iter.value().unwrap()));
            iter.increment();
        }
        let expected: Vec<(Vec<u8>, u64)> =
            keys.iter().map(|(k, v)| (k.to_vec(), *v)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_reverse_iteration() {
        let keys: Vec<(&[u8], u64)> = vec![(b"ab", 1), (b"ad", 2), (b"ba", 3)];
        let trie = dense_only(&keys);
        let mut iter = DenseIter::new(&trie);
        iter.move_to_last();

        let mut seen = Vec::new();
        while iter.is_valid() {
            seen.push(iter.value().unwrap());
            iter.decrement();
        }
        assert_eq!(seen, vec![3, 2, 1]);
    }

    #[test]
    fn test_iteration_visits_prefix_key_first() {
        let keys: Vec<(&[u8], u64)> = vec![(b"top", 1), (b"topper", 2), (b"toy", 3)];
        let trie = dense_only(&keys);
        let mut iter = DenseIter::new(&trie);
        iter.move_to_first();

        let mut seen = Vec::new();
        while iter.is_valid() {
            seen.push((iter.key_bytes().to_vec(), iter.value().unwrap()));
            iter.increment();
        }
        assert_eq!(
            seen,
            vec![
                (b"top".to_vec(), 1),
                (b"topp".to_vec(), 2),
                (b"toy".to_vec(), 3),
            ]
        );
    }

    #[test]
    fn test_reverse_visits_prefix_key_after_subtree() {
        let keys: Vec<(&[u8], u64)> = vec![(b"top", 1), (b"topper", 2), (b"toy", 3)];
        let trie = dense_only(&keys);
        let mut iter = DenseIter::new(&trie);
        iter.move_to_last();

        let mut seen = Vec::new();
        while iter.is_valid() {
            seen.push(iter.value().unwrap());
            iter.decrement();
        }
        assert_eq!(seen, vec![3, 2, 1]);
    }

    #[test]
    fn test_seek_ge_positions() {
        let keys: Vec<(&[u8], u64)> = vec![(b"ab", 1), (b"ad", 2), (b"ba", 3)];
        let trie = dense_only(&keys);

        let mut iter = DenseIter::new(&trie);
        trie.seek_ge(b"ac", true, &mut iter);
        assert!(iter.is_valid());
        assert_eq!(iter.key_bytes(), b"ad");

        let mut iter = DenseIter::new(&trie);
        trie.seek_ge(b"a", true, &mut iter);
        assert!(iter.is_valid());
        assert_eq!(iter.key_bytes(), b"ab");

        let mut iter = DenseIter::new(&trie);
        trie.seek_ge(b"bb", true, &mut iter);
        assert!(!iter.is_valid());
    }

    #[test]
    fn test_seek_ge_empty_key_finds_first() {
        let keys: Vec<(&[u8], u64)> = vec![(b"ab", 1), (b"ba", 2)];
        let trie = dense_only(&keys);
        let mut iter = DenseIter::new(&trie);
        trie.seek_ge(b"", true, &mut iter);
        assert!(iter.is_valid());
        assert_eq!(iter.key_bytes(), b"ab");
    }

    #[test]
    fn test_empty_key_only_filter() {
        let keys: Vec<(&[u8], u64)> = vec![(b"", 9)];
        let trie = dense_only(&keys);
        assert_eq!(lookup(&trie, b""), Some(9));
        assert_eq!(lookup(&trie, b"x"), None);

        let mut iter = DenseIter::new(&trie);
        iter.move_to_first();
        assert!(iter.is_valid());
        assert_eq!(iter.key_bytes(), b"");
        assert_eq!(iter.value(), Some(9));
        iter.increment();
        assert!(!iter.is_valid());

        let mut iter = DenseIter::new(&trie);
        iter.move_to_last();
        assert!(iter.is_valid());
        assert_eq!(iter.value(), Some(9));
        iter.decrement();
        assert!(!iter.is_valid());
    }

    #[test]
    fn test_keys_starting_with_zero_byte() {
        let keys: Vec<(&[u8], u64)> = vec![(b"\x00a", 1), (b"\x00b", 2), (b"a", 3)];
        let trie = dense_only(&keys);
        assert_eq!(lookup(&trie, b"\x00a"), Some(1));

        // Reverse iteration must reach the 0x00 subtree at the root.
        let mut iter = DenseIter::new(&trie);
        iter.move_to_last();
        let mut seen = Vec::new();
        while iter.is_valid() {
            seen.push(iter.value().unwrap());
            iter.decrement();
        }
        assert_eq!(seen, vec![3, 2, 1]);
    }
}
