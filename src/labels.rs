//! Packed edge labels for the sparse trie levels.

use std::borrow::Cow;

use crate::binary::{Reader, Writer};
use crate::config::TERMINATOR;
use crate::error::DeserializeError;

/// Byte sequence of edge labels, children of a node stored contiguously in
/// ascending label order (with the terminator, when present, first).
///
/// Search dispatches on the node size: linear scan for tiny nodes, binary
/// search for small ones, SIMD byte equality for the rest.
#[derive(Clone, Debug)]
pub struct LabelVector<'a> {
    labels: Cow<'a, [u8]>,
}

impl<'a> LabelVector<'a> {
    /// Concatenate the label bytes of levels `[start, end)`.
    pub fn from_levels(
        labels_per_level: &[Vec<u8>],
        start: usize,
        end: usize,
    ) -> LabelVector<'static> {
        let total: usize = labels_per_level[start..end].iter().map(Vec::len).sum();
        let mut labels = Vec::with_capacity(total);
        for level in &labels_per_level[start..end] {
            labels.extend_from_slice(level);
        }
        LabelVector {
            labels: Cow::Owned(labels),
        }
    }

    /// Number of stored labels.
    #[inline]
    pub fn num_bytes(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn read(&self, pos: usize) -> u8 {
        self.labels[pos]
    }

    /// Find `target` among the `search_len` labels starting at `pos`.
    ///
    /// A leading terminator is skipped: it precedes the real labels in
    /// node order but must never match a query byte.
    pub fn search(&self, target: u8, mut pos: usize, mut search_len: usize) -> Option<usize> {
        if search_len > 1 && self.labels[pos] == TERMINATOR {
            pos += 1;
            search_len -= 1;
        }

        if search_len < 3 {
            self.linear_search(target, pos, search_len)
        } else if search_len < 12 {
            self.binary_search(target, pos, search_len)
        } else {
            self.simd_search(target, pos, search_len)
        }
    }

    /// Position of the smallest label strictly greater than `target` among
    /// the `search_len` labels starting at `pos`.
    pub fn search_greater_than(
        &self,
        target: u8,
        mut pos: usize,
        mut search_len: usize,
    ) -> Option<usize> {
        if search_len > 1 && self.labels[pos] == TERMINATOR {
            pos += 1;
            search_len -= 1;
        }

        if search_len < 3 {
            self.linear_search_greater_than(target, pos, search_len)
        } else {
            self.binary_search_greater_than(target, pos, search_len)
        }
    }

    fn linear_search(&self, target: u8, pos: usize, search_len: usize) -> Option<usize> {
        self.labels[pos..pos + search_len]
            .iter()
            .position(|&label| label == target)
            .map(|i| pos + i)
    }

    fn binary_search(&self, target: u8, pos: usize, search_len: usize) -> Option<usize> {
        let mut l = pos;
        let mut r = pos + search_len;
        while l < r {
            let m = (l + r) >> 1;
            match target.cmp(&self.labels[m]) {
                std::cmp::Ordering::Less => r = m,
                std::cmp::Ordering::Equal => return Some(m),
                std::cmp::Ordering::Greater => l = m + 1,
            }
        }
        None
    }

    #[cfg(target_arch = "x86_64")]
    fn simd_search(&self, target: u8, pos: usize, search_len: usize) -> Option<usize> {
        crate::util::simd::find_byte(&self.labels[pos..pos + search_len], target).map(|i| pos + i)
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn simd_search(&self, target: u8, pos: usize, search_len: usize) -> Option<usize> {
        self.binary_search(target, pos, search_len)
    }

    fn linear_search_greater_than(
        &self,
        target: u8,
        pos: usize,
        search_len: usize,
    ) -> Option<usize> {
        self.labels[pos..pos + search_len]
            .iter()
            .position(|&label| label > target)
            .map(|i| pos + i)
    }

    fn binary_search_greater_than(
        &self,
        target: u8,
        pos: usize,
        search_len: usize,
    ) -> Option<usize> {
        let mut l = pos;
        let mut r = pos + search_len;
        while l < r {
            let m = (l + r) >> 1;
            match target.cmp(&self.labels[m]) {
                std::cmp::Ordering::Less => r = m,
                std::cmp::Ordering::Equal => {
                    return if m + 1 < pos + search_len {
                        Some(m + 1)
                    } else {
                        None
                    };
                }
                std::cmp::Ordering::Greater => l = m + 1,
            }
        }
        (l < pos + search_len).then_some(l)
    }

    /// Heap bytes held by the label array.
    pub fn heap_size(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u32(self.labels.len() as u32);
        writer.align8();
        writer.pods(&self.labels);
        writer.align8();
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let num_bytes = reader.u32()? as usize;
        reader.align8();
        let labels = reader.pods(num_bytes)?;
        reader.align8();
        Ok(LabelVector { labels })
    }
}
