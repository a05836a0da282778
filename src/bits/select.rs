//! Bitvector with a sampled-position index for O(1) select.

use std::borrow::Cow;

use super::{BitVector, WORD_BITS};
use crate::binary::{Reader, Writer};
use crate::error::DeserializeError;
use crate::util::broadword::select_in_word;

/// Every `SAMPLE_INTERVAL`-th set bit has its position cached.
pub(crate) const SAMPLE_INTERVAL: usize = 64;

/// [`BitVector`] plus the sampled positions of every 64th set bit.
///
/// `select(i)` jumps to the nearest sampled position at or before the
/// `i`-th set bit and scans forward word by word.
#[derive(Clone, Debug)]
pub struct SelectVector<'a> {
    bits: BitVector<'a>,
    num_ones: usize,
    select_lut: Cow<'a, [u32]>,
}

impl<'a> SelectVector<'a> {
    /// Build the select index over `bits`.
    pub fn new(bits: BitVector<'a>) -> Self {
        let words = bits.words();
        let mut select_lut = vec![0u32];
        let mut sampling_ones = SAMPLE_INTERVAL;
        let mut ones_upto_word = 0usize;
        let mut first_seen = false;

        for (word_id, word) in words.iter().enumerate() {
            let ones_in_word = word.count_ones() as usize;
            if !first_seen && ones_in_word > 0 {
                select_lut[0] = (word_id * WORD_BITS + select_in_word(*word, 1)) as u32;
                first_seen = true;
            }
            while sampling_ones <= ones_upto_word + ones_in_word {
                let within = sampling_ones - ones_upto_word;
                select_lut.push((word_id * WORD_BITS + select_in_word(*word, within)) as u32);
                sampling_ones += SAMPLE_INTERVAL;
            }
            ones_upto_word += ones_in_word;
        }

        Self {
            bits,
            num_ones: ones_upto_word,
            select_lut: Cow::Owned(select_lut),
        }
    }

    /// Total number of set bits.
    #[inline]
    pub fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Position of the `rank`-th set bit, 1-indexed. The caller guarantees
    /// `1 <= rank <= num_ones`.
    pub fn select(&self, rank: usize) -> usize {
        debug_assert!(rank >= 1 && rank <= self.num_ones);
        let lut_idx = rank / SAMPLE_INTERVAL;
        let mut rank_left = rank % SAMPLE_INTERVAL;
        // The first slot caches the very first set bit rather than a
        // multiple of the interval.
        if lut_idx == 0 {
            rank_left -= 1;
        }

        let pos = self.select_lut[lut_idx] as usize;
        if rank_left == 0 {
            return pos;
        }

        let words = self.bits.words();
        let mut word_id = pos / WORD_BITS;
        let mut offset = pos % WORD_BITS;
        if offset == WORD_BITS - 1 {
            word_id += 1;
            offset = 0;
        } else {
            offset += 1;
        }
        let mut word = (words[word_id] << offset) >> offset;
        let mut ones_in_word = word.count_ones() as usize;
        while ones_in_word < rank_left {
            word_id += 1;
            rank_left -= ones_in_word;
            word = words[word_id];
            ones_in_word = word.count_ones() as usize;
        }
        word_id * WORD_BITS + select_in_word(word, rank_left)
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

    /// Heap bytes held by the words and the select index.
    pub fn heap_size(&self) -> usize {
        self.bits.heap_size() + self.select_lut.len() * 4
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u32(self.num_ones as u32);
        writer.align8();
        self.bits.serialize(writer);
        writer.pods(&self.select_lut);
        writer.align8();
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let num_ones = reader.u32()? as usize;
        reader.align8();
        let bits = BitVector::deserialize(reader)?;
        let lut_len = num_ones / SAMPLE_INTERVAL + 1;
        let select_lut = reader.pods(lut_len)?;
        reader.align8();
        Ok(Self {
            bits,
            num_ones,
            select_lut,
        })
    }
}
