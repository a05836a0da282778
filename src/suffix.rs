//! Per-terminal suffix bits for key disambiguation.
//!
//! Each terminal entry owns one packed field of `hash_len + real_len` bits.
//! Hash bits are a slice of the key hash; real bits are the first bits of
//! the key past the stored trie path. A real suffix of all zeros is the
//! sentinel for "no suffix stored" (the path exhausted the key).

use crate::binary::{Reader, Writer};
use crate::bits::{BitVector, WORD_BITS};
use crate::config::{SuffixKind, HASH_SHIFT};
use crate::error::DeserializeError;
use crate::hash::suffix_hash;

/// Outcome of comparing a stored suffix against a query key.
///
/// `CouldBePositive` means the stored suffix is either absent or equal to
/// the query's; the two cases cannot be told apart without the full key,
/// so range logic admits the entry as a potential hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SuffixCompare {
    Less,
    CouldBePositive,
    Greater,
}

/// Order of an iterator's current key relative to a query key.
///
/// `Equal` means "equal as far as this encoding tier can see" — the caller
/// continues the comparison in the next tier. A completed comparison ends
/// in `Less`, `Greater`, or `CouldBePositive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeyCompare {
    Less,
    Equal,
    Greater,
    CouldBePositive,
}

impl From<SuffixCompare> for KeyCompare {
    fn from(compare: SuffixCompare) -> Self {
        match compare {
            SuffixCompare::Less => KeyCompare::Less,
            SuffixCompare::CouldBePositive => KeyCompare::CouldBePositive,
            SuffixCompare::Greater => KeyCompare::Greater,
        }
    }
}

/// Build the suffix word for `key` whose trie path ends just before
/// `level`.
pub(crate) fn construct_suffix(
    kind: SuffixKind,
    key: &[u8],
    hash_len: usize,
    level: usize,
    real_len: usize,
) -> u64 {
    match kind {
        SuffixKind::None => 0,
        SuffixKind::Hash => construct_hash_suffix(key, hash_len),
        SuffixKind::Real => construct_real_suffix(key, level, real_len),
        SuffixKind::Mixed => {
            let hash = construct_hash_suffix(key, hash_len);
            let real = construct_real_suffix(key, level, real_len);
            (hash << real_len) | real
        }
    }
}

/// `len` bits of the key hash, ending `HASH_SHIFT` bits above its low end.
pub(crate) fn construct_hash_suffix(key: &[u8], len: usize) -> u64 {
    if len == 0 {
        return 0;
    }
    let hash = suffix_hash(key) as u64;
    let total = len + HASH_SHIFT;
    if total <= WORD_BITS {
        (hash << (WORD_BITS - total)) >> (WORD_BITS - len)
    } else {
        (hash >> (total - WORD_BITS)) & mask(len)
    }
}

/// The first `len` bits of `key` past byte `level`, or 0 when the key is
/// too short to supply them.
pub(crate) fn construct_real_suffix(key: &[u8], level: usize, len: usize) -> u64 {
    if len == 0 || key.len() < level || (key.len() - level) * 8 < len {
        return 0;
    }
    let mut suffix = 0u64;
    let num_complete_bytes = len / 8;
    if num_complete_bytes > 0 {
        suffix = key[level] as u64;
        for i in 1..num_complete_bytes {
            suffix = (suffix << 8) | key[level + i] as u64;
        }
    }
    let offset = len % 8;
    if offset > 0 {
        suffix <<= offset;
        suffix |= (key[level + num_complete_bytes] as u64) >> (8 - offset);
    }
    suffix
}

fn extract_real_suffix(suffix: u64, real_len: usize) -> u64 {
    suffix & mask(real_len)
}

fn mask(len: usize) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Packed suffix fields for the terminals of a range of levels.
#[derive(Clone, Debug)]
pub(crate) struct SuffixColumn<'a> {
    kind: SuffixKind,
    hash_len: usize,
    real_len: usize,
    bits: BitVector<'a>,
}

impl<'a> SuffixColumn<'a> {
    pub(crate) fn empty() -> SuffixColumn<'static> {
        SuffixColumn {
            kind: SuffixKind::None,
            hash_len: 0,
            real_len: 0,
            bits: BitVector::empty(),
        }
    }

    /// Pack the suffix words of levels `[start, end)`.
    pub(crate) fn from_levels(
        kind: SuffixKind,
        hash_len: usize,
        real_len: usize,
        suffixes_per_level: &[Vec<u64>],
        counts_per_level: &[usize],
        start: usize,
        end: usize,
    ) -> SuffixColumn<'static> {
        let width = hash_len + real_len;
        let bits_per_level: Vec<usize> = counts_per_level.iter().map(|&c| c * width).collect();
        SuffixColumn {
            kind,
            hash_len,
            real_len,
            bits: BitVector::from_levels(suffixes_per_level, &bits_per_level, start, end),
        }
    }

    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.hash_len + self.real_len
    }

    #[inline]
    pub(crate) fn real_len(&self) -> usize {
        self.real_len
    }

    /// Whether `compare` can produce an ordering (real bits present).
    #[inline]
    pub(crate) fn is_orderable(&self) -> bool {
        matches!(self.kind, SuffixKind::Real | SuffixKind::Mixed)
    }

    /// Extract the suffix field of terminal `idx`; the field may straddle
    /// a word boundary.
    pub(crate) fn read(&self, idx: usize) -> u64 {
        if self.kind == SuffixKind::None {
            return 0;
        }
        let width = self.width();
        let bit_pos = idx * width;
        if width == 0 || bit_pos >= self.bits.num_bits() {
            return 0;
        }

        let words = self.bits.words();
        let word_id = bit_pos / WORD_BITS;
        let offset = bit_pos % WORD_BITS;
        let mut value = (words[word_id] << offset) >> (WORD_BITS - width);
        if offset + width > WORD_BITS {
            value |= words[word_id + 1] >> (2 * WORD_BITS - offset - width);
        }
        value
    }

    /// The real portion of terminal `idx`'s suffix.
    pub(crate) fn read_real(&self, idx: usize) -> u64 {
        extract_real_suffix(self.read(idx), self.real_len)
    }

    /// Does the stored suffix of terminal `idx` match `key`'s?
    pub(crate) fn check_equality(&self, idx: usize, key: &[u8], level: usize) -> bool {
        if self.kind == SuffixKind::None {
            return true;
        }
        if idx * self.width() >= self.bits.num_bits() {
            return false;
        }

        let stored = self.read(idx);
        if self.kind == SuffixKind::Real {
            // Absent suffix: the stored path is the whole stored key.
            if stored == 0 {
                return true;
            }
            if key.len() < level || (key.len() - level) * 8 < self.real_len {
                return false;
            }
        }
        let querying = construct_suffix(self.kind, key, self.hash_len, level, self.real_len);
        stored == querying
    }

    /// Three-valued order of the stored real suffix against `key`'s bits
    /// past `level`. Hash-only and empty columns cannot order and always
    /// answer `CouldBePositive`.
    pub(crate) fn compare(&self, idx: usize, key: &[u8], level: usize) -> SuffixCompare {
        if idx * self.width() >= self.bits.num_bits()
            || self.kind == SuffixKind::None
            || self.kind == SuffixKind::Hash
        {
            return SuffixCompare::CouldBePositive;
        }

        let mut stored = self.read(idx);
        let querying = construct_real_suffix(key, level, self.real_len);
        if self.kind == SuffixKind::Mixed {
            stored = extract_real_suffix(stored, self.real_len);
        }

        if stored == 0 && querying == 0 {
            SuffixCompare::CouldBePositive
        } else if stored == 0 || stored < querying {
            SuffixCompare::Less
        } else if stored == querying {
            SuffixCompare::CouldBePositive
        } else {
            SuffixCompare::Greater
        }
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.bits.heap_size()
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u8(self.kind as u8);
        writer.u32(self.hash_len as u32);
        writer.u32(self.real_len as u32);
        writer.align8();
        self.bits.serialize(writer);
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let kind_byte = reader.u8()?;
        let kind =
            SuffixKind::from_u8(kind_byte).ok_or(DeserializeError::InvalidSuffixKind(kind_byte))?;
        let hash_len = reader.u32()? as usize;
        let real_len = reader.u32()? as usize;
        reader.align8();
        let bits = BitVector::deserialize(reader)?;
        Ok(SuffixColumn {
            kind,
            hash_len,
            real_len,
            bits,
        })
    }
}
