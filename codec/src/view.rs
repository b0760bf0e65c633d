//! Zero-copy views over encoded AMQP values.
//!
//! [`ValueRef`] borrows from the buffer it was decoded from instead of
//! materializing nested lists/maps/arrays eagerly. Compound values keep only
//! their raw encoded bytes and hand out a restartable [`CompoundIter`] that
//! decodes one element at a time.

use crate::cursor::{Category, ConsumeError, Consumer};
use crate::descriptor::Descriptor;
use crate::format_code::EncodingCodes;
use crate::primitives::{Dec128, Dec32, Dec64};

/// A decoded AMQP value that borrows from the buffer it came from.
///
/// Valid only as long as the buffer backing it is alive -- this mirrors the
/// borrowed-view invariant of the wire-level compound types: decoding never
/// copies string/binary/compound payloads.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef<'a> {
    /// The AMQP null value.
    Null,
    /// Boolean.
    Bool(bool),
    UByte(u8),
    UShort(u16),
    UInt(u32),
    ULong(u64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal32(Dec32),
    Decimal64(Dec64),
    Decimal128(Dec128),
    Char(char),
    Timestamp(i64),
    Uuid([u8; 16]),
    /// Borrowed binary payload.
    Binary(&'a [u8]),
    /// Borrowed UTF-8 string payload.
    String(&'a str),
    /// Borrowed symbol payload (ASCII, but stored as `str` like the owned `Symbol`).
    Symbol(&'a str),
    /// A described value: descriptor followed by the underlying value.
    Described(Descriptor, Box<ValueRef<'a>>),
    /// A list, decodable element-by-element via [`CompoundRef::iter`].
    List(CompoundRef<'a>),
    /// A map, decodable key/value-by-key/value via [`CompoundRef::iter`].
    Map(CompoundRef<'a>),
    /// An array of a single element type.
    Array(ArrayRef<'a>),
    /// Placeholder for a format code that failed to classify; never produced
    /// by [`decode_value`] (which returns `Err` instead), reserved for
    /// call sites that want an explicit "nothing decoded yet" sentinel.
    Invalid,
}

/// A borrowed view over the body bytes of a list or map (post format-code,
/// post size/count prefix).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundRef<'a> {
    is_map: bool,
    count: u32,
    body: &'a [u8],
}

impl<'a> CompoundRef<'a> {
    /// Construct a view directly over already-parsed header fields and body
    /// bytes, without going through [`decode_value`]. Used by
    /// [`crate::compound::OwnedCompound`] to iterate its own item bytes.
    pub(crate) fn new(is_map: bool, count: u32, body: &'a [u8]) -> Self {
        CompoundRef { is_map, count, body }
    }

    /// Number of elements (list) or key+value entries*2 (map).
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether this compound is a map (keys/values alternate) vs a list.
    pub fn is_map(&self) -> bool {
        self.is_map
    }

    /// A fresh, restartable iterator over the compound's elements.
    pub fn iter(&self) -> CompoundIter<'a> {
        CompoundIter {
            start: self.body,
            size: self.body.len(),
            position: 0,
            remaining: self.count,
        }
    }
}

/// A cursor over the raw bytes of a list/map: `{start, size, position}`.
///
/// Advancing decodes the next element in place and yields a value that
/// borrows from `start`. The iterator is restartable (reconstruct via
/// [`CompoundRef::iter`]) and finite (bounded by the element count recorded
/// in the header).
#[derive(Debug, Clone)]
pub struct CompoundIter<'a> {
    start: &'a [u8],
    size: usize,
    position: usize,
    remaining: u32,
}

impl<'a> Iterator for CompoundIter<'a> {
    type Item = Result<ValueRef<'a>, ConsumeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.position >= self.size {
            return None;
        }
        let mut consumer = Consumer::new(&self.start[self.position..]);
        match decode_value(&mut consumer) {
            Ok(value) => {
                self.position += consumer.position();
                self.remaining -= 1;
                Some(Ok(value))
            }
            Err(e) => {
                // Do not advance; a malformed element ends iteration.
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

/// A borrowed view over an array's elements, which share a single element
/// type code (and, for described elements, a single descriptor) read once
/// up front rather than repeated per element.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRef<'a> {
    descriptor: Option<Descriptor>,
    element_code: EncodingCodes,
    count: u32,
    body: &'a [u8],
}

impl<'a> ArrayRef<'a> {
    /// Number of elements in the array.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The shared element format code (the primitive code following the
    /// shared descriptor, for arrays of described elements).
    pub fn element_code(&self) -> EncodingCodes {
        self.element_code.clone()
    }

    /// The shared descriptor, for arrays of described elements.
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    /// A fresh, restartable iterator over the array's elements.
    pub fn iter(&self) -> ArrayIter<'a> {
        ArrayIter {
            descriptor: self.descriptor.clone(),
            element_code: self.element_code.clone(),
            start: self.body,
            size: self.body.len(),
            position: 0,
            remaining: self.count,
        }
    }
}

/// Iterator over [`ArrayRef`] elements: the element typecode (and shared
/// descriptor, if any) is read once at [`ArrayRef`] construction and then
/// used to decode every following item tag-lessly.
#[derive(Debug, Clone)]
pub struct ArrayIter<'a> {
    descriptor: Option<Descriptor>,
    element_code: EncodingCodes,
    start: &'a [u8],
    size: usize,
    position: usize,
    remaining: u32,
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Result<ValueRef<'a>, ConsumeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.position >= self.size {
            return None;
        }
        let mut consumer = Consumer::new(&self.start[self.position..]);
        let result = decode_tagless(&mut consumer, self.element_code.clone())
            .map(|value| match &self.descriptor {
                Some(d) => ValueRef::Described(d.clone(), Box::new(value)),
                None => value,
            });
        match result {
            Ok(value) => {
                self.position += consumer.position();
                self.remaining -= 1;
                Some(Ok(value))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

/// Decode one value (with its leading format code) from `consumer`.
pub fn decode_value<'a>(consumer: &mut Consumer<'a>) -> Result<ValueRef<'a>, ConsumeError> {
    let code = consumer.peek_code()?;
    consumer.readf8()?;
    if code == EncodingCodes::DescribedType {
        let descriptor = decode_descriptor(consumer)?;
        let value = decode_value(consumer)?;
        return Ok(ValueRef::Described(descriptor, Box::new(value)));
    }
    decode_tagless(consumer, code)
}

fn decode_descriptor<'a>(consumer: &mut Consumer<'a>) -> Result<Descriptor, ConsumeError> {
    match decode_value(consumer)? {
        ValueRef::ULong(code) => Ok(Descriptor::Code(code)),
        ValueRef::Symbol(s) => Ok(Descriptor::Name(s.into())),
        _ => Err(ConsumeError::Invalid),
    }
}

/// Decode one value assuming `code` has already been consumed (used both for
/// the top-level value and for tag-less array elements).
fn decode_tagless<'a>(
    consumer: &mut Consumer<'a>,
    code: EncodingCodes,
) -> Result<ValueRef<'a>, ConsumeError> {
    use EncodingCodes::*;
    let value = match code {
        DescribedType => return decode_value(consumer),
        Null => ValueRef::Null,
        Boolean => ValueRef::Bool(consumer.readf8()? != 0),
        BooleanTrue => ValueRef::Bool(true),
        BooleanFalse => ValueRef::Bool(false),
        UByte => ValueRef::UByte(consumer.readf8()?),
        UShort => ValueRef::UShort(consumer.readf16()?),
        UInt => ValueRef::UInt(consumer.readf32()?),
        SmallUint => ValueRef::UInt(consumer.readf8()? as u32),
        Uint0 => ValueRef::UInt(0),
        ULong => ValueRef::ULong(consumer.readf64()?),
        SmallUlong => ValueRef::ULong(consumer.readf8()? as u64),
        Ulong0 => ValueRef::ULong(0),
        Byte => ValueRef::Byte(consumer.readf8()? as i8),
        Short => ValueRef::Short(consumer.readf16()? as i16),
        Int => ValueRef::Int(consumer.readf32()? as i32),
        SmallInt => ValueRef::Int(consumer.readf8()? as i8 as i32),
        Long => ValueRef::Long(consumer.readf64()? as i64),
        SmallLong => ValueRef::Long(consumer.readf8()? as i8 as i64),
        Float => ValueRef::Float(f32::from_bits(consumer.readf32()?)),
        Double => ValueRef::Double(f64::from_bits(consumer.readf64()?)),
        Decimal32 => {
            let mut arr = [0u8; 4];
            arr.copy_from_slice(consumer.read_bytes(4)?);
            ValueRef::Decimal32(Dec32::from(arr))
        }
        Decimal64 => {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(consumer.read_bytes(8)?);
            ValueRef::Decimal64(Dec64::from(arr))
        }
        Decimal128 => {
            let mut arr = [0u8; 16];
            arr.copy_from_slice(consumer.read_bytes(16)?);
            ValueRef::Decimal128(Dec128::from(arr))
        }
        Char => {
            let bits = consumer.readf32()?;
            ValueRef::Char(char::from_u32(bits).ok_or(ConsumeError::Invalid)?)
        }
        Timestamp => ValueRef::Timestamp(consumer.readf64()? as i64),
        Uuid => {
            let mut arr = [0u8; 16];
            arr.copy_from_slice(consumer.read_bytes(16)?);
            ValueRef::Uuid(arr)
        }
        VBin8 => ValueRef::Binary(consumer.readv8()?),
        VBin32 => ValueRef::Binary(consumer.readv32()?),
        Str8 => {
            let bytes = consumer.readv8()?;
            ValueRef::String(std::str::from_utf8(bytes).map_err(|_| ConsumeError::Invalid)?)
        }
        Str32 => {
            let bytes = consumer.readv32()?;
            ValueRef::String(std::str::from_utf8(bytes).map_err(|_| ConsumeError::Invalid)?)
        }
        Sym8 => {
            let bytes = consumer.readv8()?;
            ValueRef::Symbol(std::str::from_utf8(bytes).map_err(|_| ConsumeError::Invalid)?)
        }
        Sym32 => {
            let bytes = consumer.readv32()?;
            ValueRef::Symbol(std::str::from_utf8(bytes).map_err(|_| ConsumeError::Invalid)?)
        }
        List0 => ValueRef::List(CompoundRef {
            is_map: false,
            count: 0,
            body: &[],
        }),
        List8 | List32 => decode_compound(consumer, code, false)?,
        Map8 | Map32 => decode_compound(consumer, code, true)?,
        Array8 | Array32 => decode_array(consumer, code)?,
    };
    Ok(value)
}

fn decode_compound<'a>(
    consumer: &mut Consumer<'a>,
    code: EncodingCodes,
    is_map: bool,
) -> Result<ValueRef<'a>, ConsumeError> {
    let width = match Category::of(code.clone()) {
        Some(Category::Compound(w)) => w,
        _ => return Err(ConsumeError::Invalid),
    };
    let (size, count) = if width == 1 {
        let size = consumer.readf8()? as usize;
        let count = consumer.readf8()? as u32;
        (size, count)
    } else {
        let size = consumer.readf32()? as usize;
        let count = consumer.readf32()?;
        (size, count)
    };
    let body_len = size.checked_sub(width).ok_or(ConsumeError::Invalid)?;
    let body = consumer.read_bytes(body_len)?;
    if is_map {
        Ok(ValueRef::Map(CompoundRef {
            is_map: true,
            count,
            body,
        }))
    } else {
        Ok(ValueRef::List(CompoundRef {
            is_map: false,
            count,
            body,
        }))
    }
}

fn decode_array<'a>(
    consumer: &mut Consumer<'a>,
    code: EncodingCodes,
) -> Result<ValueRef<'a>, ConsumeError> {
    let width = match Category::of(code.clone()) {
        Some(Category::Array(w)) => w,
        _ => return Err(ConsumeError::Invalid),
    };
    let (size, count) = if width == 1 {
        let size = consumer.readf8()? as usize;
        let count = consumer.readf8()? as u32;
        (size, count)
    } else {
        let size = consumer.readf32()? as usize;
        let count = consumer.readf32()?;
        (size, count)
    };
    let header_start = consumer.position();
    let mut constructor_code = consumer.peek_code()?;
    consumer.readf8()?;
    let descriptor = if constructor_code == EncodingCodes::DescribedType {
        let descriptor = decode_descriptor(consumer)?;
        constructor_code = consumer.peek_code()?;
        consumer.readf8()?;
        Some(descriptor)
    } else {
        None
    };
    let consumed_header = consumer.position() - header_start;
    let body_len = size
        .checked_sub(width + consumed_header)
        .ok_or(ConsumeError::Invalid)?;
    let body = consumer.read_bytes(body_len)?;
    Ok(ValueRef::Array(ArrayRef {
        descriptor,
        element_code: constructor_code,
        count,
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_vec;

    #[test]
    fn decode_scalar_values() {
        let bytes = to_vec(&42u32).unwrap();
        let mut consumer = Consumer::new(&bytes);
        assert_eq!(decode_value(&mut consumer).unwrap(), ValueRef::UInt(42));
    }

    #[test]
    fn decode_string() {
        let bytes = to_vec(&"hello").unwrap();
        let mut consumer = Consumer::new(&bytes);
        assert_eq!(
            decode_value(&mut consumer).unwrap(),
            ValueRef::String("hello")
        );
    }

    #[test]
    fn iterate_list_elements() {
        let bytes = to_vec(&(1u32, 2u32, 3u32)).unwrap();
        let mut consumer = Consumer::new(&bytes);
        let value = decode_value(&mut consumer).unwrap();
        let ValueRef::List(list) = value else {
            panic!("expected list")
        };
        assert_eq!(list.count(), 3);
        let items: Vec<_> = list.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            items,
            vec![ValueRef::UInt(1), ValueRef::UInt(2), ValueRef::UInt(3)]
        );
        // restartable
        let items2: Vec<_> = list.iter().map(|r| r.unwrap()).collect();
        assert_eq!(items, items2);
    }

    #[test]
    fn iterate_array_elements_tagless() {
        use crate::primitives::Array;
        let bytes = to_vec(&Array(vec![10u8, 20u8, 30u8])).unwrap();
        let mut consumer = Consumer::new(&bytes);
        let value = decode_value(&mut consumer).unwrap();
        let ValueRef::Array(arr) = value else {
            panic!("expected array")
        };
        assert_eq!(arr.count(), 3);
        let items: Vec<_> = arr.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            items,
            vec![ValueRef::UByte(10), ValueRef::UByte(20), ValueRef::UByte(30)]
        );
    }

    #[test]
    fn not_enough_data_does_not_panic() {
        let bytes = [EncodingCodes::UInt as u8, 0x00, 0x00];
        let mut consumer = Consumer::new(&bytes);
        assert_eq!(decode_value(&mut consumer), Err(ConsumeError::NotEnoughData));
    }
}
