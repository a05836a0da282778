//! LOUDS-Sparse: label-list encoding of the lower trie levels.
//!
//! Labels are stored explicitly with two parallel bit arrays: child
//! indicators (rank maps an edge to its child node) and LOUDS bits marking
//! the first label of each node (select maps a node ordinal to its label
//! range). Node ordinals continue the dense tier's numbering, so the two
//! encodings stitch together without translation.

use bytemuck::Pod;

use crate::binary::{Reader, Writer};
use crate::bits::{BitVector, RankVector, SelectVector};
use crate::builder::Builder;
use crate::config::TERMINATOR;
use crate::error::DeserializeError;
use crate::labels::LabelVector;
use crate::suffix::{KeyCompare, SuffixColumn, SuffixCompare};
use crate::values::ValueColumn;

/// The sparse tier: levels `[start_level, height)` of the trie.
pub(crate) struct LoudsSparse<'a, V: Pod> {
    height: usize,
    start_level: usize,
    /// Node ordinals below `start_level` continue the dense numbering.
    node_count_dense: usize,
    child_count_dense: usize,

    labels: LabelVector<'a>,
    child_indicator: RankVector<'a>,
    louds: SelectVector<'a>,
    suffixes: SuffixColumn<'a>,
    values: ValueColumn<'a, V>,
}

impl<'a, V: Pod> LoudsSparse<'a, V> {
    pub(crate) fn from_builder(builder: &Builder<V>) -> LoudsSparse<'static, V> {
        let height = builder.tree_height();
        let start_level = builder.sparse_start_level;

        let node_count_dense: usize = builder.node_counts[..start_level].iter().sum();
        let child_count_dense = if start_level == 0 {
            0
        } else if start_level < builder.node_counts.len() {
            node_count_dense + builder.node_counts[start_level] - 1
        } else {
            node_count_dense
        };

        let labels = LabelVector::from_levels(&builder.labels, start_level, height);
        let num_items_per_level: Vec<usize> =
            builder.labels.iter().map(Vec::len).collect();
        let child_indicator = RankVector::new(BitVector::from_levels(
            &builder.child_indicator_bits,
            &num_items_per_level,
            start_level,
            height,
        ));
        let louds = SelectVector::new(BitVector::from_levels(
            &builder.louds_bits,
            &num_items_per_level,
            start_level,
            height,
        ));

        let suffixes = SuffixColumn::from_levels(
            builder.suffix_kind,
            builder.hash_len,
            builder.real_len,
            &builder.suffixes,
            &builder.suffix_counts,
            start_level,
            height,
        );
        let values = ValueColumn::from_levels(&builder.values, start_level, height);

        LoudsSparse {
            height,
            start_level,
            node_count_dense,
            child_count_dense,
            labels,
            child_indicator,
            louds,
            suffixes,
            values,
        }
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub(crate) fn start_level(&self) -> usize {
        self.start_level
    }

    /// Point lookup continuing at `in_node` (0 when there is no dense
    /// tier). The walk starts at level `start_level`.
    pub(crate) fn lookup_key(&self, key: &[u8], in_node: usize) -> Option<V> {
        let mut node_num = in_node;
        let mut pos = self.first_label_pos(node_num);

        let mut level = self.start_level;
        while level < key.len() {
            let node_size = self.node_size(pos);
            pos = self.labels.search(key[level], pos, node_size)?;

            if !self.child_indicator.read_bit(pos) {
                let suffix_pos = self.suffix_pos(pos);
                return if self.suffixes.check_equality(suffix_pos, key, level + 1) {
                    Some(self.values.read(suffix_pos))
                } else {
                    None
                };
            }
            node_num = self.child_node(pos);
            pos = self.first_label_pos(node_num);
            level += 1;
        }

        // Out of key bytes: the key can only be stored as a prefix-key
        // terminator of the current node.
        if self.is_terminator(pos) {
            let suffix_pos = self.suffix_pos(pos);
            if self.suffixes.check_equality(suffix_pos, key, level + 1) {
                return Some(self.values.read(suffix_pos));
            }
        }
        None
    }

    /// Position the iterator at the smallest key `>= key` (`> key` when
    /// `inclusive` is false and equality is decidable), starting at the
    /// iterator's hand-off node. Returns the could-be-false-positive flag.
    pub(crate) fn seek_ge(
        &self,
        key: &[u8],
        inclusive: bool,
        iter: &mut SparseIter<'_, 'a, V>,
    ) -> bool {
        let mut node_num = iter.start_node;
        let mut pos = self.first_label_pos(node_num);

        let mut level = self.start_level;
        while level < key.len() {
            let node_size = self.node_size(pos);
            match self.labels.search(key[level], pos, node_size) {
                None => {
                    self.move_to_left_in_next_subtrie(pos, node_size, key[level], iter);
                    return false;
                }
                Some(found) => pos = found,
            }
            iter.append_label(key[level], pos);

            if !self.child_indicator.read_bit(pos) {
                return self.compare_suffix_ge(pos, key, level + 1, inclusive, iter);
            }
            node_num = self.child_node(pos);
            pos = self.first_label_pos(node_num);
            level += 1;
        }

        if self.is_terminator(pos) {
            // The stored prefix-key equals the query exactly.
            iter.append_label(TERMINATOR, pos);
            iter.at_terminator = true;
            iter.valid = true;
            if !inclusive {
                iter.increment();
            }
            return false;
        }

        // Every key below this node extends the query strictly.
        iter.move_to_leftmost_key();
        false
    }

    fn compare_suffix_ge(
        &self,
        pos: usize,
        key: &[u8],
        level: usize,
        inclusive: bool,
        iter: &mut SparseIter<'_, 'a, V>,
    ) -> bool {
        let suffix_pos = self.suffix_pos(pos);
        match self.suffixes.compare(suffix_pos, key, level) {
            SuffixCompare::Less => {
                iter.increment();
                false
            }
            SuffixCompare::CouldBePositive if !inclusive && self.suffixes.is_orderable() => {
                // Possibly equal to the exclusive bound: step past it.
                iter.valid = true;
                iter.increment();
                false
            }
            _ => {
                iter.valid = true;
                true
            }
        }
    }

    /// Position the iterator at the smallest key in the subtrie right of
    /// the missing label.
    fn move_to_left_in_next_subtrie(
        &self,
        pos: usize,
        node_size: usize,
        label: u8,
        iter: &mut SparseIter<'_, 'a, V>,
    ) {
        match self.labels.search_greater_than(label, pos, node_size) {
            None => {
                iter.append_pos(pos + node_size - 1);
                iter.increment();
            }
            Some(found) => {
                iter.append_pos(found);
                iter.move_to_leftmost_key();
            }
        }
    }

    #[inline]
    fn child_node(&self, pos: usize) -> usize {
        self.child_indicator.rank(pos) + self.child_count_dense
    }

    #[inline]
    fn first_label_pos(&self, node_num: usize) -> usize {
        self.louds.select(node_num + 1 - self.node_count_dense)
    }

    fn last_label_pos(&self, node_num: usize) -> usize {
        let next_rank = node_num + 2 - self.node_count_dense;
        if next_rank > self.louds.num_ones() {
            self.louds.num_bits() - 1
        } else {
            self.louds.select(next_rank) - 1
        }
    }

    /// Ordinal of the terminal at `pos` among all sparse terminals.
    #[inline]
    fn suffix_pos(&self, pos: usize) -> usize {
        pos - self.child_indicator.rank(pos)
    }

    fn node_size(&self, pos: usize) -> usize {
        debug_assert!(self.louds.read_bit(pos));
        self.louds.distance_to_next_set_bit(pos)
    }

    /// A terminator label marks a prefix-key terminal. It always sits at a
    /// node start; a real `0xFF` edge never can (it sorts last).
    fn is_terminator(&self, pos: usize) -> bool {
        self.labels.read(pos) == TERMINATOR
            && !self.child_indicator.read_bit(pos)
            && self.louds.read_bit(pos)
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.labels.heap_size()
            + self.child_indicator.heap_size()
            + self.louds.heap_size()
            + self.suffixes.heap_size()
            + self.values.heap_size()
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u32(self.height as u32);
        writer.u32(self.start_level as u32);
        writer.u32(self.node_count_dense as u32);
        writer.u32(self.child_count_dense as u32);
        writer.align8();
        self.labels.serialize(writer);
        self.child_indicator.serialize(writer);
        self.louds.serialize(writer);
        self.suffixes.serialize(writer);
        self.values.serialize(writer);
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let height = reader.u32()? as usize;
        let start_level = reader.u32()? as usize;
        let node_count_dense = reader.u32()? as usize;
        let child_count_dense = reader.u32()? as usize;
        reader.align8();
        let labels = LabelVector::deserialize(reader)?;
        let child_indicator = RankVector::deserialize(reader)?;
        let louds = SelectVector::deserialize(reader)?;
        let suffixes = SuffixColumn::deserialize(reader)?;
        let values = ValueColumn::deserialize(reader)?;
        Ok(LoudsSparse {
            height,
            start_level,
            node_count_dense,
            child_count_dense,
            labels,
            child_indicator,
            louds,
            suffixes,
            values,
        })
    }
}

/// Cursor over the sparse levels.
///
/// Stores the label byte per depth alongside the position, since a sparse
/// position alone does not reveal its label without a read.
pub(crate) struct SparseIter<'t, 'a, V: Pod> {
    trie: &'t LoudsSparse<'a, V>,
    pub(crate) valid: bool,
    /// Node where the walk enters the sparse tier; set by the dense
    /// iterator's hand-off.
    pub(crate) start_node: usize,
    key_len: usize,
    key: Vec<u8>,
    pos_in_trie: Vec<usize>,
    pub(crate) at_terminator: bool,
}

impl<'t, 'a, V: Pod> SparseIter<'t, 'a, V> {
    pub(crate) fn new(trie: &'t LoudsSparse<'a, V>) -> Self {
        let depth = trie.height - trie.start_level;
        Self {
            trie,
            valid: false,
            start_node: 0,
            key_len: 0,
            key: vec![0; depth],
            pos_in_trie: vec![0; depth],
            at_terminator: false,
        }
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn clear(&mut self) {
        self.valid = false;
        self.key_len = 0;
        self.at_terminator = false;
    }

    /// Descend to the smallest key below the current position (or below
    /// `start_node` when the cursor is fresh).
    pub(crate) fn move_to_leftmost_key(&mut self) {
        if self.key_len == 0 {
            let pos = self.trie.first_label_pos(self.start_node);
            self.append_pos(pos);
        }
        let mut pos = self.pos_in_trie[self.key_len - 1];
        if !self.trie.child_indicator.read_bit(pos) {
            if self.trie.is_terminator(pos) {
                self.at_terminator = true;
            }
            self.valid = true;
            return;
        }

        let mut level = self.key_len;
        while level < self.trie.height {
            let node_num = self.trie.child_node(pos);
            pos = self.trie.first_label_pos(node_num);
            self.append_pos(pos);
            if !self.trie.child_indicator.read_bit(pos) {
                if self.trie.is_terminator(pos) {
                    self.at_terminator = true;
                }
                self.valid = true;
                return;
            }
            level += 1;
        }
        debug_assert!(false, "descent exceeded the trie height");
        self.valid = false;
    }

    /// Descend to the largest key below the current position.
    pub(crate) fn move_to_rightmost_key(&mut self) {
        if self.key_len == 0 {
            let pos = self.trie.last_label_pos(self.start_node);
            self.append_pos(pos);
        }
        let mut pos = self.pos_in_trie[self.key_len - 1];
        if !self.trie.child_indicator.read_bit(pos) {
            if self.trie.is_terminator(pos) {
                self.at_terminator = true;
            }
            self.valid = true;
            return;
        }

        let mut level = self.key_len;
        while level < self.trie.height {
            let node_num = self.trie.child_node(pos);
            pos = self.trie.last_label_pos(node_num);
            self.append_pos(pos);
            if !self.trie.child_indicator.read_bit(pos) {
                if self.trie.is_terminator(pos) {
                    self.at_terminator = true;
                }
                self.valid = true;
                return;
            }
            level += 1;
        }
        debug_assert!(false, "descent exceeded the trie height");
        self.valid = false;
    }

    /// Step to the next position in key order.
    pub(crate) fn increment(&mut self) {
        if self.key_len == 0 {
            self.valid = false;
            return;
        }
        self.at_terminator = false;
        let mut pos = self.pos_in_trie[self.key_len - 1] + 1;
        // A LOUDS bit (or the end of the labels) means the node is
        // exhausted: climb and advance the ancestor.
        while pos >= self.trie.louds.num_bits() || self.trie.louds.read_bit(pos) {
            self.key_len -= 1;
            if self.key_len == 0 {
                self.valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len - 1] + 1;
        }
        self.set_pos(self.key_len - 1, pos);
        self.move_to_leftmost_key();
    }

    /// Step to the previous position in key order.
    pub(crate) fn decrement(&mut self) {
        if self.key_len == 0 {
            self.valid = false;
            return;
        }
        self.at_terminator = false;
        let mut pos = self.pos_in_trie[self.key_len - 1];
        if pos == 0 {
            self.valid = false;
            return;
        }
        while self.trie.louds.read_bit(pos) {
            self.key_len -= 1;
            if self.key_len == 0 {
                self.valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len - 1];
        }
        self.set_pos(self.key_len - 1, pos - 1);
        self.move_to_rightmost_key();
    }

    /// Compare the current position to the sparse part of `key`.
    pub(crate) fn compare(&self, key: &[u8]) -> KeyCompare {
        let key_tail = key.get(self.trie.start_level..).unwrap_or(&[]);
        if self.at_terminator && self.key_len - 1 < key_tail.len() {
            return KeyCompare::Less;
        }
        let iter_key = self.key_bytes();
        let min_len = iter_key.len().min(key_tail.len());
        match iter_key[..min_len].cmp(&key_tail[..min_len]) {
            std::cmp::Ordering::Less => return KeyCompare::Less,
            std::cmp::Ordering::Greater => return KeyCompare::Greater,
            std::cmp::Ordering::Equal => {}
        }
        if iter_key.len() > key_tail.len() {
            return KeyCompare::Greater;
        }
        let suffix_pos = self.trie.suffix_pos(self.pos_in_trie[self.key_len - 1]);
        self.trie
            .suffixes
            .compare(suffix_pos, key_tail, self.key_len)
            .into()
    }

    /// The sparse portion of the current key.
    pub(crate) fn key_bytes(&self) -> &[u8] {
        if !self.valid {
            return &[];
        }
        let mut len = self.key_len;
        if self.at_terminator {
            len -= 1;
        }
        &self.key[..len]
    }

    pub(crate) fn value(&self) -> Option<V> {
        if !self.valid {
            return None;
        }
        let suffix_pos = self.trie.suffix_pos(self.pos_in_trie[self.key_len - 1]);
        Some(self.trie.values.read(suffix_pos))
    }

    /// Real suffix bits and width of the current terminal.
    pub(crate) fn suffix(&self) -> Option<(u64, usize)> {
        if !self.valid || !self.trie.suffixes.is_orderable() {
            return None;
        }
        let suffix_pos = self.trie.suffix_pos(self.pos_in_trie[self.key_len - 1]);
        Some((
            self.trie.suffixes.read_real(suffix_pos),
            self.trie.suffixes.real_len(),
        ))
    }

    fn append_pos(&mut self, pos: usize) {
        self.append_label(self.trie.labels.read(pos), pos);
    }

    pub(crate) fn append_label(&mut self, label: u8, pos: usize) {
        debug_assert!(self.key_len < self.key.len());
        self.key[self.key_len] = label;
        self.pos_in_trie[self.key_len] = pos;
        self.key_len += 1;
    }

    fn set_pos(&mut self, depth: usize, pos: usize) {
        debug_assert!(depth < self.key.len());
        self.key[depth] = self.trie.labels.read(pos);
        self.pos_in_trie[depth] = pos;
    }
}
