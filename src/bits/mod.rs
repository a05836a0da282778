//! Bitvector primitives with rank and select support.
//!
//! Bit 0 of word 0 is the **most significant** bit; bit numbering grows
//! MSB-first within each 64-bit word. This convention is shared by every
//! shift, popcount, and SIMD operation in the crate.
//!
//! - [`BitVector`] - packed bit array with next/previous set-bit scans
//! - [`RankVector`] - adds a 512-bit-block popcount index for O(1) rank
//! - [`SelectVector`] - adds a sampled-position index for O(1) select

mod rank;
mod select;

pub use rank::RankVector;
pub use select::SelectVector;

use std::borrow::Cow;

use crate::binary::{Reader, Writer};
use crate::error::DeserializeError;
use crate::util::broadword::MSB_MASK;

pub(crate) const WORD_BITS: usize = 64;

/// Fixed-length packed bit array.
///
/// Built by concatenating per-level staging words; a level whose bit count
/// is not a multiple of 64 carries its trailing bits into the next level's
/// first word, so the packed form has no per-level padding.
#[derive(Clone, Debug)]
pub struct BitVector<'a> {
    num_bits: usize,
    words: Cow<'a, [u64]>,
}

impl<'a> BitVector<'a> {
    /// An empty bitvector.
    pub fn empty() -> BitVector<'static> {
        BitVector {
            num_bits: 0,
            words: Cow::Owned(Vec::new()),
        }
    }

    /// Pack the levels `[start, end)` of per-level word arrays into one
    /// contiguous bitstream. `bits_per_level[l]` gives the number of
    /// meaningful bits in `levels[l]`; bits past that count must be zero.
    pub fn from_levels(
        levels: &[Vec<u64>],
        bits_per_level: &[usize],
        start: usize,
        end: usize,
    ) -> BitVector<'static> {
        let num_bits: usize = bits_per_level[start..end].iter().sum();
        let mut words = vec![0u64; num_bits.div_ceil(WORD_BITS)];

        let mut bit_shift = 0;
        let mut word_id = 0;
        for level in start..end {
            let level_bits = bits_per_level[level];
            if level_bits == 0 {
                continue;
            }
            let num_complete_words = level_bits / WORD_BITS;
            for word in 0..num_complete_words {
                words[word_id] |= levels[level][word] >> bit_shift;
                word_id += 1;
                if bit_shift > 0 {
                    words[word_id] |= levels[level][word] << (WORD_BITS - bit_shift);
                }
            }

            let bits_remain = level_bits - num_complete_words * WORD_BITS;
            if bits_remain > 0 {
                let last_word = levels[level][num_complete_words];
                words[word_id] |= last_word >> bit_shift;
                if bit_shift + bits_remain < WORD_BITS {
                    bit_shift += bits_remain;
                } else {
                    word_id += 1;
                    if word_id < words.len() {
                        words[word_id] |= last_word << (WORD_BITS - bit_shift);
                    }
                    bit_shift = bit_shift + bits_remain - WORD_BITS;
                }
            }
        }

        BitVector {
            num_bits,
            words: Cow::Owned(words),
        }
    }

    /// Number of addressable bits.
    #[inline]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Number of backing words.
    #[inline]
    pub fn num_words(&self) -> usize {
        self.num_bits.div_ceil(WORD_BITS)
    }

    /// Size of the backing words in bytes.
    #[inline]
    pub fn bits_size(&self) -> usize {
        self.num_words() * 8
    }

    #[inline]
    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Read bit `pos`. The caller guarantees `pos < num_bits`.
    #[inline]
    pub fn read_bit(&self, pos: usize) -> bool {
        debug_assert!(pos < self.num_bits);
        self.words[pos / WORD_BITS] & (MSB_MASK >> (pos % WORD_BITS)) != 0
    }

    /// Number of bits strictly after `pos` up to and including the next
    /// set bit. Returns `num_bits - pos` when no later bit is set, i.e.
    /// one past the end.
    pub fn distance_to_next_set_bit(&self, pos: usize) -> usize {
        debug_assert!(pos < self.num_bits);
        if pos + 1 >= self.num_bits {
            return self.num_bits - pos;
        }

        let mut distance = 1;
        let word_id = (pos + 1) / WORD_BITS;
        let offset = (pos + 1) % WORD_BITS;

        let test_bits = self.words[word_id] << offset;
        if test_bits != 0 {
            return distance + test_bits.leading_zeros() as usize;
        }
        if word_id == self.num_words() - 1 {
            return self.num_bits - pos;
        }
        distance += WORD_BITS - offset;

        for word in &self.words[word_id + 1..] {
            if *word != 0 {
                return distance + word.leading_zeros() as usize;
            }
            distance += WORD_BITS;
        }
        self.num_bits - pos
    }

    /// Position of the last set bit strictly before `pos`, or `None` when
    /// no earlier bit is set.
    pub fn prev_set_bit(&self, pos: usize) -> Option<usize> {
        if pos == 0 || self.num_bits == 0 {
            return None;
        }
        let pos = pos.min(self.num_bits);

        let word_id = (pos - 1) / WORD_BITS;
        let offset = (pos - 1) % WORD_BITS;

        let test_bits = self.words[word_id] >> (WORD_BITS - 1 - offset);
        if test_bits != 0 {
            return Some(pos - 1 - test_bits.trailing_zeros() as usize);
        }

        for word_id in (0..word_id).rev() {
            let word = self.words[word_id];
            if word != 0 {
                return Some(word_id * WORD_BITS + (WORD_BITS - 1 - word.trailing_zeros() as usize));
            }
        }
        None
    }

    /// Heap bytes held by this structure.
    pub fn heap_size(&self) -> usize {
        self.words.len() * 8
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u32(self.num_bits as u32);
        writer.align8();
        writer.pods(self.words());
        writer.align8();
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let num_bits = reader.u32()? as usize;
        reader.align8();
        let words = reader.pods(num_bits.div_ceil(WORD_BITS))?;
        reader.align8();
        Ok(BitVector { num_bits, words })
    }
}
