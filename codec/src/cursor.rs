//! Manual write/read cursors over the AMQP wire form.
//!
//! Unlike [`crate::ser`]/[`crate::de`], which drive `serde`'s data model through a
//! growable sink, [`Emitter`] and [`Consumer`] operate directly over a caller-owned
//! byte region with the "measure-or-emit" contract used by the reference AMQP
//! engines this crate's layout is modeled on: an emitter never panics or
//! reallocates on overflow, it simply keeps counting so the caller can retry with
//! a bigger region; a consumer never mutates its position on a failed read.

use std::convert::TryFrom;

use crate::format_code::EncodingCodes;

/// Coarse shape of an encoding, independent of its small/large form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Fixed-width scalar, `width` bytes after the format code.
    Fixed(usize),
    /// Variable-width binary/string/symbol; `width` is the size of the length prefix.
    Variable(usize),
    /// List or map; `width` is the size of the size+count prefix fields.
    Compound(usize),
    /// Array; `width` is the size of the size+count prefix fields (element code follows).
    Array(usize),
}

impl Category {
    /// Classify a format code, or `None` if it is the described-type marker.
    pub fn of(code: EncodingCodes) -> Option<Self> {
        use EncodingCodes::*;
        let cat = match code {
            DescribedType => return None,

            Null => Category::Fixed(0),
            Boolean => Category::Fixed(1),
            BooleanTrue | BooleanFalse => Category::Fixed(0),

            UByte => Category::Fixed(1),
            UShort => Category::Fixed(2),
            UInt => Category::Fixed(4),
            SmallUint | Uint0 => Category::Fixed(if code == Uint0 { 0 } else { 1 }),
            ULong => Category::Fixed(8),
            SmallUlong | Ulong0 => Category::Fixed(if code == Ulong0 { 0 } else { 1 }),

            Byte => Category::Fixed(1),
            Short => Category::Fixed(2),
            Int => Category::Fixed(4),
            SmallInt => Category::Fixed(1),
            Long => Category::Fixed(8),
            SmallLong => Category::Fixed(1),

            Float => Category::Fixed(4),
            Double => Category::Fixed(8),
            Decimal32 => Category::Fixed(4),
            Decimal64 => Category::Fixed(8),
            Decimal128 => Category::Fixed(16),
            Char => Category::Fixed(4),
            Timestamp => Category::Fixed(8),
            Uuid => Category::Fixed(16),

            VBin8 => Category::Variable(1),
            VBin32 => Category::Variable(4),
            Str8 => Category::Variable(1),
            Str32 => Category::Variable(4),
            Sym8 => Category::Variable(1),
            Sym32 => Category::Variable(4),

            List0 => Category::Fixed(0),
            List8 => Category::Compound(1),
            List32 => Category::Compound(4),
            Map8 => Category::Compound(1),
            Map32 => Category::Compound(4),

            Array8 => Category::Array(1),
            Array32 => Category::Array(4),
        };
        Some(cat)
    }
}

/// Why a [`Consumer`] read failed.
///
/// Mirrors the two codec failure modes of the type system: a short buffer
/// leaves the cursor untouched so the caller can feed more bytes and retry,
/// while an illegal typecode is a hard decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeError {
    /// Fewer bytes are available than the encoding requires.
    NotEnoughData,
    /// The encoded typecode is not a legal AMQP format code.
    Invalid,
}

/// A read cursor over a borrowed byte region.
///
/// `position` only advances on success; a failed `read_*` call leaves it
/// exactly where it was, so callers may re-invoke `Consumer` methods against
/// a growing buffer without losing their place.
#[derive(Debug, Clone)]
pub struct Consumer<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Consumer<'a> {
    /// Wrap a byte slice for cursor-based reading.
    pub fn new(input: &'a [u8]) -> Self {
        Consumer { input, position: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Rewind to a previously observed position (e.g. after a partial decode).
    pub fn rewind_to(&mut self, position: usize) {
        self.position = position;
    }

    /// Number of unread bytes remaining.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.position
    }

    /// Peek the next format code without consuming it.
    pub fn peek_code(&self) -> Result<EncodingCodes, ConsumeError> {
        let byte = *self
            .input
            .get(self.position)
            .ok_or(ConsumeError::NotEnoughData)?;
        EncodingCodes::try_from(byte).map_err(|_| ConsumeError::Invalid)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ConsumeError> {
        let end = self.position + n;
        let slice = self
            .input
            .get(self.position..end)
            .ok_or(ConsumeError::NotEnoughData)?;
        self.position = end;
        Ok(slice)
    }

    /// Read one octet (`readf8`).
    pub fn readf8(&mut self) -> Result<u8, ConsumeError> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian `u16` (`readf16`).
    pub fn readf16(&mut self) -> Result<u16, ConsumeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `u32` (`readf32`).
    pub fn readf32(&mut self) -> Result<u32, ConsumeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian `u64` (`readf64`).
    pub fn readf64(&mut self) -> Result<u64, ConsumeError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// Read `n` raw bytes without interpreting them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ConsumeError> {
        self.take(n)
    }

    /// Read a one-byte-length-prefixed region (`readv8`).
    pub fn readv8(&mut self) -> Result<&'a [u8], ConsumeError> {
        let start = self.position;
        let len = match self.readf8() {
            Ok(l) => l as usize,
            Err(e) => {
                self.position = start;
                return Err(e);
            }
        };
        match self.take(len) {
            Ok(s) => Ok(s),
            Err(e) => {
                self.position = start;
                Err(e)
            }
        }
    }

    /// Read a four-byte-length-prefixed region (`readv32`).
    pub fn readv32(&mut self) -> Result<&'a [u8], ConsumeError> {
        let start = self.position;
        let len = match self.readf32() {
            Ok(l) => l as usize,
            Err(e) => {
                self.position = start;
                return Err(e);
            }
        };
        match self.take(len) {
            Ok(s) => Ok(s),
            Err(e) => {
                self.position = start;
                Err(e)
            }
        }
    }

    /// Skip the encoded value the cursor is currently positioned at, without
    /// decoding it. Used for unknown typecodes accepted as "any value".
    pub fn skip_value(&mut self) -> Result<(), ConsumeError> {
        let start = self.position;
        match self.skip_value_inner() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.position = start;
                Err(e)
            }
        }
    }

    fn skip_value_inner(&mut self) -> Result<(), ConsumeError> {
        let code = self.peek_code()?;
        self.position += 1;
        if code == EncodingCodes::DescribedType {
            self.skip_value_inner()?; // descriptor
            return self.skip_value_inner(); // value
        }
        match Category::of(code).expect("non-described code has a category") {
            Category::Fixed(w) => {
                self.take(w)?;
            }
            Category::Variable(1) => {
                let len = self.readf8()? as usize;
                self.take(len)?;
            }
            Category::Variable(_) => {
                let len = self.readf32()? as usize;
                self.take(len)?;
            }
            Category::Compound(1) => {
                let size = self.readf8()? as usize;
                self.take(size.saturating_sub(1))?;
            }
            Category::Compound(_) => {
                let size = self.readf32()? as usize;
                self.take(size.saturating_sub(4))?;
            }
            Category::Array(1) => {
                let size = self.readf8()? as usize;
                self.take(size.saturating_sub(1))?;
            }
            Category::Array(_) => {
                let size = self.readf32()? as usize;
                self.take(size.saturating_sub(4))?;
            }
        }
        Ok(())
    }
}

/// A write cursor over a caller-provided byte region.
///
/// Writes past the end of the region do not panic: `position` keeps advancing
/// so the caller can compare it against the region length, allocate a bigger
/// region, and retry the whole encode in a single pass.
#[derive(Debug)]
pub struct Emitter<'a> {
    buf: &'a mut [u8],
    position: usize,
}

impl<'a> Emitter<'a> {
    /// Wrap a byte region for cursor-based writing.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Emitter { buf, position: 0 }
    }

    /// Bytes written (or that would have been written had the region been
    /// large enough).
    pub fn position(&self) -> usize {
        self.position
    }

    /// `true` once `position` has exceeded the region's capacity.
    pub fn overflowed(&self) -> bool {
        self.position > self.buf.len()
    }

    /// Write a single byte.
    pub fn put_u8(&mut self, b: u8) {
        if let Some(slot) = self.buf.get_mut(self.position) {
            *slot = b;
        }
        self.position += 1;
    }

    /// Write a big-endian `u16`.
    pub fn put_u16(&mut self, v: u16) {
        for b in v.to_be_bytes() {
            self.put_u8(b);
        }
    }

    /// Write a big-endian `u32`.
    pub fn put_u32(&mut self, v: u32) {
        for b in v.to_be_bytes() {
            self.put_u8(b);
        }
    }

    /// Write a big-endian `u64`.
    pub fn put_u64(&mut self, v: u64) {
        for b in v.to_be_bytes() {
            self.put_u8(b);
        }
    }

    /// Write raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_u8(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_overflow_does_not_panic_and_counts_bytes() {
        let mut small = [0u8; 2];
        let mut emitter = Emitter::new(&mut small);
        emitter.put_u32(0xdeadbeef);
        assert_eq!(emitter.position(), 4);
        assert!(emitter.overflowed());

        let mut big = [0u8; 4];
        let mut emitter = Emitter::new(&mut big);
        emitter.put_u32(0xdeadbeef);
        assert_eq!(emitter.position(), 4);
        assert!(!emitter.overflowed());
        assert_eq!(big, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn consumer_rewinds_on_short_read() {
        let data = [0x50u8];
        let mut consumer = Consumer::new(&data);
        let start = consumer.position();
        assert_eq!(consumer.readf16(), Err(ConsumeError::NotEnoughData));
        assert_eq!(consumer.position(), start);
    }

    #[test]
    fn consumer_readv8_roundtrip() {
        let data = [0x03u8, b'a', b'b', b'c'];
        let mut consumer = Consumer::new(&data);
        assert_eq!(consumer.readv8().unwrap(), b"abc");
    }

    #[test]
    fn consumer_skip_value_handles_compound() {
        // LIST8 with size=3 (count byte + one ubyte element), count=1
        let data = [EncodingCodes::List8 as u8, 0x03, 0x01, EncodingCodes::UByte as u8, 0x07];
        let mut consumer = Consumer::new(&data);
        consumer.skip_value().unwrap();
        assert_eq!(consumer.position(), data.len());
    }
}
