//! Cursor-based primitive decoding for the binary format.
//!
//! A [`Reader`] owns a position into a borrowed byte span and advances as it
//! decodes. Primitives follow the binary spec: LEB128 variable-length
//! integers (with over-long and dangling-bit rejection), little-endian fixed
//! ints and IEEE floats, and length-prefixed strings with UTF-8 validation.
//!
//! Every read takes the error sink and a short description of what was being
//! read; on failure it emits one diagnostic and returns `None`. Readers never
//! advance past the end of their span, so a failed read leaves the cursor in
//! a defined state.

use crate::error::{ErrorSink, Location};
use byteorder::{ByteOrder, LittleEndian};

#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Offset of `bytes[0]` within the whole module, so diagnostics carry
    /// file-absolute locations even inside sub-readers.
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0, base: 0 }
    }

    pub fn with_base(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    /// Position within this reader's span.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// File-absolute offset of the cursor.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// A file-absolute location from `start` (span-relative) to the cursor.
    pub fn location_from(&self, start: usize) -> Location {
        Location::new(self.base + start, self.base + self.pos)
    }

    /// A zero-length file-absolute location at the cursor.
    pub fn location_here(&self) -> Location {
        Location::at(self.offset())
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Moves the cursor to `pos`, clamped to the span end.
    pub fn skip_to(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// A sub-reader over the next `len` bytes, sharing the absolute base.
    /// The parent cursor advances past them.
    pub fn sub_reader(
        &mut self,
        len: usize,
        errors: &dyn ErrorSink,
        desc: &str,
    ) -> Option<Reader<'a>> {
        let bytes = self.read_bytes(len, errors, desc)?;
        Some(Reader::with_base(bytes, self.base + self.pos - len))
    }

    /// The rest of this reader's span, without advancing.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn truncated(&self, errors: &dyn ErrorSink, desc: &str) {
        errors.on_error(
            self.location_here(),
            &format!("unexpected end of input reading {}", desc),
        );
    }

    pub fn read_byte(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<u8> {
        match self.bytes.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Some(b)
            }
            None => {
                self.truncated(errors, desc);
                None
            }
        }
    }

    pub fn read_bytes(&mut self, len: usize, errors: &dyn ErrorSink, desc: &str) -> Option<&'a [u8]> {
        if self.remaining() < len {
            self.truncated(errors, desc);
            // Consume what is left so callers do not loop on a stuck cursor.
            self.pos = self.bytes.len();
            return None;
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }

    // ------------------------------------------------------------------
    // LEB128
    // ------------------------------------------------------------------

    /// Unsigned LEB128 of at most `bits` significant bits.
    fn read_uleb(&mut self, bits: u32, errors: &dyn ErrorSink, desc: &str) -> Option<u64> {
        let start = self.pos;
        let max_bytes = (bits as usize + 6) / 7;
        let mut result: u64 = 0;
        for i in 0..max_bytes {
            let byte = self.read_byte(errors, desc)?;
            let group = (byte & 0x7f) as u64;
            // The final group may only use the bits that fit the target width.
            if i + 1 == max_bytes {
                let used = bits - 7 * (max_bytes as u32 - 1);
                if group >> used != 0 {
                    errors.on_error(
                        self.location_from(start),
                        &format!("invalid LEB128 encoding of {}: unused bits set", desc),
                    );
                    return None;
                }
            }
            result |= group << (7 * i);
            if byte & 0x80 == 0 {
                return Some(result);
            }
        }
        errors.on_error(
            self.location_from(start),
            &format!("invalid LEB128 encoding of {}: too long", desc),
        );
        None
    }

    /// Signed LEB128 of at most `bits` significant bits.
    fn read_sleb(&mut self, bits: u32, errors: &dyn ErrorSink, desc: &str) -> Option<i64> {
        let start = self.pos;
        let max_bytes = (bits as usize + 6) / 7;
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        for i in 0..max_bytes {
            let byte = self.read_byte(errors, desc)?;
            let group = (byte & 0x7f) as i64;
            if i + 1 == max_bytes {
                // In the final group the unused bits must all match the sign.
                let used = bits - 7 * (max_bytes as u32 - 1);
                let unused = group >> (used - 1);
                if unused != 0 && unused != (0x7f >> (used - 1)) {
                    errors.on_error(
                        self.location_from(start),
                        &format!("invalid LEB128 encoding of {}: unused bits set", desc),
                    );
                    return None;
                }
            }
            result |= group << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                // Sign-extend from the top bit of the last group.
                if shift < 64 && (byte & 0x40) != 0 {
                    result |= -1i64 << shift;
                }
                return Some(result);
            }
        }
        errors.on_error(
            self.location_from(start),
            &format!("invalid LEB128 encoding of {}: too long", desc),
        );
        None
    }

    pub fn read_u32_leb(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<u32> {
        self.read_uleb(32, errors, desc).map(|v| v as u32)
    }

    pub fn read_u64_leb(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<u64> {
        self.read_uleb(64, errors, desc)
    }

    pub fn read_s32_leb(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<i32> {
        self.read_sleb(32, errors, desc).map(|v| v as i32)
    }

    pub fn read_s64_leb(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<i64> {
        self.read_sleb(64, errors, desc)
    }

    /// The 33-bit signed form used by block types.
    pub fn read_s33_leb(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<i64> {
        self.read_sleb(33, errors, desc)
    }

    /// A vector count.
    pub fn read_count(&mut self, errors: &dyn ErrorSink) -> Option<u32> {
        self.read_u32_leb(errors, "count")
    }

    /// An index immediate.
    pub fn read_index(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<u32> {
        self.read_u32_leb(errors, desc)
    }

    /// A byte that must be zero until a feature assigns it meaning.
    pub fn read_reserved(&mut self, errors: &dyn ErrorSink) -> Option<u32> {
        let start = self.pos;
        let value = self.read_u32_leb(errors, "reserved")?;
        if value != 0 {
            errors.on_error(
                self.location_from(start),
                &format!("expected reserved byte 0, got {}", value),
            );
            return None;
        }
        Some(value)
    }

    // ------------------------------------------------------------------
    // Fixed-width values
    // ------------------------------------------------------------------

    pub fn read_u32_fixed(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<u32> {
        self.read_bytes(4, errors, desc).map(LittleEndian::read_u32)
    }

    pub fn read_f32(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<f32> {
        self.read_bytes(4, errors, desc).map(LittleEndian::read_f32)
    }

    pub fn read_f64(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<f64> {
        self.read_bytes(8, errors, desc).map(LittleEndian::read_f64)
    }

    pub fn read_v128(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<[u8; 16]> {
        let slice = self.read_bytes(16, errors, desc)?;
        let mut out = [0u8; 16];
        out.copy_from_slice(slice);
        Some(out)
    }

    // ------------------------------------------------------------------
    // Strings and byte vectors
    // ------------------------------------------------------------------

    /// A length-prefixed byte vector, borrowed from the input.
    pub fn read_raw_vec(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<&'a [u8]> {
        let len = self.read_u32_leb(errors, desc)?;
        self.read_bytes(len as usize, errors, desc)
    }

    /// A length-prefixed UTF-8 string.
    pub fn read_string(&mut self, errors: &dyn ErrorSink, desc: &str) -> Option<String> {
        let start = self.pos;
        let bytes = self.read_raw_vec(errors, desc)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Some(s.to_string()),
            Err(_) => {
                errors.on_error(
                    self.location_from(start),
                    &format!("invalid UTF-8 encoding in {}", desc),
                );
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_encode {
    //! Little encoders used by tests to assemble reference bytes.

    pub fn uleb(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
        out
    }

    pub fn sleb(mut value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
            if done {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
        out
    }
}


#[cfg(test)]
mod proptests {
    use super::test_encode::{sleb, uleb};
    use super::*;
    use crate::error::CollectingErrors;
    use proptest::prelude::*;

    proptest! {
        /// Encoding then decoding any u32 yields the value back.
        #[test]
        fn uleb_round_trip(value in any::<u32>()) {
            let errors = CollectingErrors::new();
            let bytes = uleb(value as u64);
            let decoded = Reader::new(&bytes).read_u32_leb(&errors, "v");
            prop_assert_eq!(decoded, Some(value));
            prop_assert!(errors.is_empty());
        }

        #[test]
        fn uleb64_round_trip(value in any::<u64>()) {
            let errors = CollectingErrors::new();
            let bytes = uleb(value);
            let decoded = Reader::new(&bytes).read_u64_leb(&errors, "v");
            prop_assert_eq!(decoded, Some(value));
        }

        #[test]
        fn sleb_round_trip(value in any::<i32>()) {
            let errors = CollectingErrors::new();
            let bytes = sleb(value as i64);
            let decoded = Reader::new(&bytes).read_s32_leb(&errors, "v");
            prop_assert_eq!(decoded, Some(value));
        }

        #[test]
        fn sleb64_round_trip(value in any::<i64>()) {
            let errors = CollectingErrors::new();
            let bytes = sleb(value);
            let decoded = Reader::new(&bytes).read_s64_leb(&errors, "v");
            prop_assert_eq!(decoded, Some(value));
        }

        /// The reader never panics on arbitrary input.
        #[test]
        fn never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let errors = CollectingErrors::new();
            let mut reader = Reader::new(&bytes);
            let _ = reader.read_u32_leb(&errors, "a");
            let _ = reader.read_s64_leb(&errors, "b");
            let _ = reader.read_string(&errors, "c");
        }
    }
}
