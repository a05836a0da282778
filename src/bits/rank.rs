//! Bitvector with a precomputed popcount index for O(1) rank.

use std::borrow::Cow;

use super::{BitVector, WORD_BITS};
use crate::binary::{Reader, Writer};
use crate::error::DeserializeError;

/// Bits per basic block of the rank index.
pub(crate) const RANK_BLOCK_BITS: usize = 512;

const WORDS_PER_BLOCK: usize = RANK_BLOCK_BITS / WORD_BITS;

/// [`BitVector`] plus one cumulative popcount per 512-bit block.
///
/// `rank(p)` counts the set bits in `[0, p]` as block prefix + in-block
/// popcount, in constant time.
#[derive(Clone, Debug)]
pub struct RankVector<'a> {
    bits: BitVector<'a>,
    rank_lut: Cow<'a, [u32]>,
}

impl<'a> RankVector<'a> {
    /// Build the rank index over `bits`.
    pub fn new(bits: BitVector<'a>) -> Self {
        let num_blocks = bits.num_bits() / RANK_BLOCK_BITS + 1;
        let words = bits.words();

        let mut rank_lut = Vec::with_capacity(num_blocks);
        let mut cumulative = 0u32;
        for block in 0..num_blocks {
            rank_lut.push(cumulative);
            let start = block * WORDS_PER_BLOCK;
            let end = (start + WORDS_PER_BLOCK).min(words.len());
            for word in &words[start.min(words.len())..end] {
                cumulative += word.count_ones();
            }
        }

        Self {
            bits,
            rank_lut: Cow::Owned(rank_lut),
        }
    }

    /// Number of set bits in `[0, pos]`. The caller guarantees
    /// `pos < num_bits`.
    pub fn rank(&self, pos: usize) -> usize {
        debug_assert!(pos < self.bits.num_bits());
        let words = self.bits.words();
        let block = pos / RANK_BLOCK_BITS;

        let mut count = self.rank_lut[block] as usize;
        let last_word = pos / WORD_BITS;
        for word in &words[block * WORDS_PER_BLOCK..last_word] {
            count += word.count_ones() as usize;
        }
        let offset = pos % WORD_BITS;
        count + (words[last_word] >> (WORD_BITS - 1 - offset)).count_ones() as usize
    }

    #[inline]
    pub fn read_bit(&self, pos: usize) -> bool {
        self.bits.read_bit(pos)
    }

    #[inline]
    pub fn num_bits(&self) -> usize {
        self.bits.num_bits()
    }

    #[inline]
    pub fn distance_to_next_set_bit(&self, pos: usize) -> usize {
        self.bits.distance_to_next_set_bit(pos)
    }

    #[inline]
    pub fn prev_set_bit(&self, pos: usize) -> Option<usize> {
        self.bits.prev_set_bit(pos)
    }

    /// Heap bytes held by the words and the rank index.
    pub fn heap_size(&self) -> usize {
        self.bits.heap_size() + self.rank_lut.len() * 4
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        self.bits.serialize(writer);
        writer.pods(&self.rank_lut);
        writer.align8();
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let bits = BitVector::deserialize(reader)?;
        let num_blocks = bits.num_bits() / RANK_BLOCK_BITS + 1;
        let rank_lut = reader.pods(num_blocks)?;
        reader.align8();
        Ok(Self { bits, rank_lut })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::broadword::MSB_MASK;

    fn build(bits: &[bool]) -> RankVector<'static> {
        let mut words = vec![0u64; bits.len().div_ceil(64)];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                words[i / 64] |= MSB_MASK >> (i % 64);
            }
        }
        RankVector::new(BitVector::from_levels(&[words], &[bits.len()], 0, 1))
    }

    fn naive_rank(bits: &[bool], pos: usize) -> usize {
        bits[..=pos].iter().filter(|&&b| b).count()
    }

    #[test]
    fn test_rank_small() {
        let bits = [true, false, true, true, false, false, true];
        let rv = build(&bits);
        assert_eq!(rv.rank(0), 1);
        assert_eq!(rv.rank(1), 1);
        assert_eq!(rv.rank(2), 2);
        assert_eq!(rv.rank(6), 4);
    }

    #[test]
    fn test_rank_across_blocks() {
        // Every third bit set over three 512-bit blocks.
        let bits: Vec<bool> = (0..1600).map(|i| i % 3 == 0).collect();
        let rv = build(&bits);
        for pos in (0..1600).step_by(37) {
            assert_eq!(rv.rank(pos), naive_rank(&bits, pos), "pos {}", pos);
        }
        assert_eq!(rv.rank(1599), naive_rank(&bits, 1599));
    }

    #[test]
    fn test_rank_dense_word_boundaries() {
        let bits = vec![true; 512];
        let rv = build(&bits);
        assert_eq!(rv.rank(63), 64);
        assert_eq!(rv.rank(64), 65);
        assert_eq!(rv.rank(511), 512);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let bits: Vec<bool> = (0..700).map(|i| i % 5 == 0 || i % 7 == 0).collect();
        let rv = build(&bits);

        let mut w = crate::binary::Writer::new();
        rv.serialize(&mut w);
        let bytes = w.into_vec();
        let mut r = crate::binary::Reader::new(&bytes);
        let restored = RankVector::deserialize(&mut r).unwrap();

        for pos in 0..700 {
            assert_eq!(restored.rank(pos), rv.rank(pos), "pos {}", pos);
        }
    }
}
