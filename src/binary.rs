//! Byte-level reader and writer for the serialized filter layout.
//!
//! Sections are concatenated with 8-byte alignment between variable-length
//! parts. Headers are little-endian; word payloads are written in native
//! byte order and reinterpreted on read. Reading borrows from the input
//! buffer when its alignment allows and falls back to an owned copy
//! otherwise, so a deserialized filter never re-derives an index.

use std::borrow::Cow;

use bytemuck::Pod;

use crate::error::DeserializeError;

/// Append-only buffer with alignment control.
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn pods<V: Pod>(&mut self, values: &[V]) {
        self.buf.extend_from_slice(bytemuck::cast_slice(values));
    }

    /// Pad with zero bytes to the next 8-byte boundary.
    pub(crate) fn align8(&mut self) {
        while self.buf.len() % 8 != 0 {
            self.buf.push(0);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over a serialized filter.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DeserializeError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DeserializeError::LengthOverflow)?;
        if end > self.buf.len() {
            return Err(DeserializeError::Truncated {
                offset: self.pos,
                needed: len,
            });
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DeserializeError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32, DeserializeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read `count` packed values, borrowing when the buffer is aligned
    /// for `V` and copying otherwise.
    pub(crate) fn pods<V: Pod>(&mut self, count: usize) -> Result<Cow<'a, [V]>, DeserializeError> {
        let len = count
            .checked_mul(std::mem::size_of::<V>())
            .ok_or(DeserializeError::LengthOverflow)?;
        let bytes = self.take(len)?;
        match bytemuck::try_cast_slice(bytes) {
            Ok(slice) => Ok(Cow::Borrowed(slice)),
            Err(_) => Ok(Cow::Owned(bytemuck::pod_collect_to_vec(bytes))),
        }
    }

    pub(crate) fn align8(&mut self) {
        self.pos = (self.pos + 7) & !7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_headers() {
        let mut w = Writer::new();
        w.u32(0xDEAD_BEEF);
        w.u8(7);
        w.align8();
        w.u32(42);
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.u8().unwrap(), 7);
        r.align8();
        assert_eq!(r.u32().unwrap(), 42);
    }

    #[test]
    fn test_roundtrip_words() {
        let words: Vec<u64> = (0..9).map(|i| i * 0x0123_4567_89AB_CDEF).collect();
        let mut w = Writer::new();
        w.pods(&words);
        let bytes = w.into_vec();

        let mut r = Reader::new(&bytes);
        let read: Cow<'_, [u64]> = r.pods(words.len()).unwrap();
        assert_eq!(read.as_ref(), words.as_slice());
    }

    #[test]
    fn test_truncated_read() {
        let bytes = [0u8; 3];
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            r.u32(),
            Err(DeserializeError::Truncated { offset: 0, needed: 4 })
        ));
    }

    #[test]
    fn test_misaligned_words_fall_back_to_owned() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(bytemuck::cast_slice(&[u64::MAX, 17u64]));
        let mut r = Reader::new(&bytes);
        r.u8().unwrap();
        let words: Cow<'_, [u64]> = r.pods(2).unwrap();
        assert_eq!(words.as_ref(), &[u64::MAX, 17]);
    }

    #[test]
    fn test_align_past_end_detected_on_read() {
        let bytes = [1u8; 5];
        let mut r = Reader::new(&bytes);
        r.take(5).unwrap();
        r.align8();
        assert!(r.u8().is_err());
    }
}
