//! Densely packed values aligned with terminal entries.

use std::borrow::Cow;

use bytemuck::Pod;

use crate::binary::{Reader, Writer};
use crate::error::DeserializeError;

/// One value per terminal entry, stored in the same order as the suffix
/// column. `V` must be trivially copyable and fixed-size (`Pod`) so the
/// column serializes as raw bytes.
#[derive(Clone, Debug)]
pub(crate) struct ValueColumn<'a, V: Pod> {
    values: Cow<'a, [V]>,
}

impl<'a, V: Pod> ValueColumn<'a, V> {
    /// Concatenate the per-level value vectors of levels `[start, end)`.
    pub(crate) fn from_levels(
        values_per_level: &[Vec<V>],
        start: usize,
        end: usize,
    ) -> ValueColumn<'static, V> {
        let total: usize = values_per_level[start..end].iter().map(Vec::len).sum();
        let mut values = Vec::with_capacity(total);
        for level in &values_per_level[start..end] {
            values.extend_from_slice(level);
        }
        ValueColumn {
            values: Cow::Owned(values),
        }
    }

    #[inline]
    pub(crate) fn read(&self, idx: usize) -> V {
        self.values[idx]
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<V>()
    }

    pub(crate) fn serialize(&self, writer: &mut Writer) {
        writer.u32(self.values.len() as u32);
        writer.align8();
        writer.pods(&self.values);
        writer.align8();
    }

    pub(crate) fn deserialize(reader: &mut Reader<'a>) -> Result<Self, DeserializeError> {
        let len = reader.u32()? as usize;
        reader.align8();
        let values = reader.pods(len)?;
        reader.align8();
        Ok(ValueColumn { values })
    }
}
