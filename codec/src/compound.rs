//! Owned, incrementally-built compound values and the typed map/array
//! iterators layered on top of [`crate::view`].
//!
//! [`OwnedCompound`] is the mutable counterpart to [`crate::view::CompoundRef`]:
//! it owns its encoded bytes so new lists/maps can be assembled item by item
//! without re-encoding what was already appended, choosing the small or
//! large header form based on the running total at the point `bytes()` is
//! called.

use crate::cursor::{Category, ConsumeError, Consumer};
use crate::format_code::EncodingCodes;
use crate::view::{decode_value, ArrayRef, CompoundIter, CompoundRef, ValueRef};

/// Whether an [`OwnedCompound`] is a list or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    /// An AMQP list.
    List,
    /// An AMQP map.
    Map,
}

/// An incrementally-built list or map that owns its encoded item bytes.
///
/// `bytes()` re-encodes the size/count header into a scratch buffer on every
/// call and returns a view into it; the returned slice is valid only until
/// the next call to `bytes()` or any mutating method.
#[derive(Debug, Clone)]
pub struct OwnedCompound {
    kind: CompoundKind,
    count: u32,
    items: Vec<u8>,
    scratch: Vec<u8>,
}

impl OwnedCompound {
    /// Parse the header of an already-encoded list or map (including its
    /// leading format code) and take ownership of a copy of its item bytes.
    pub fn compound_make(raw: &[u8]) -> Result<Self, ConsumeError> {
        let mut consumer = Consumer::new(raw);
        let code = consumer.peek_code()?;
        consumer.readf8()?;
        let kind = match code {
            EncodingCodes::List0 | EncodingCodes::List8 | EncodingCodes::List32 => {
                CompoundKind::List
            }
            EncodingCodes::Map8 | EncodingCodes::Map32 => CompoundKind::Map,
            _ => return Err(ConsumeError::Invalid),
        };
        if code == EncodingCodes::List0 {
            return Ok(OwnedCompound {
                kind,
                count: 0,
                items: Vec::new(),
                scratch: Vec::new(),
            });
        }
        let width = match Category::of(code) {
            Some(Category::Compound(w)) => w,
            _ => return Err(ConsumeError::Invalid),
        };
        let (size, count) = if width == 1 {
            (consumer.readf8()? as usize, consumer.readf8()? as u32)
        } else {
            (consumer.readf32()? as usize, consumer.readf32()?)
        };
        let body_len = size.checked_sub(width).ok_or(ConsumeError::Invalid)?;
        let body = consumer.read_bytes(body_len)?;
        Ok(OwnedCompound {
            kind,
            count,
            items: body.to_vec(),
            scratch: Vec::new(),
        })
    }

    /// Start building a new, empty list.
    pub fn compound_build(kind: CompoundKind) -> Self {
        OwnedCompound {
            kind,
            count: 0,
            items: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Append one already-encoded item (its own format code plus body).
    /// For a map, items alternate key, value, key, value, ...
    pub fn push_item(&mut self, encoded_item: &[u8]) {
        self.items.extend_from_slice(encoded_item);
        self.count += 1;
    }

    /// Number of items (list) or key+value entries*2 (map) appended so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Re-encode the header for the current item bytes and return the
    /// canonical on-wire slice. Valid until the next call to `bytes()` or
    /// any mutating method.
    pub fn bytes(&mut self) -> &[u8] {
        self.scratch.clear();
        if self.count == 0 && self.kind == CompoundKind::List {
            self.scratch.push(EncodingCodes::List0 as u8);
            return &self.scratch;
        }
        let body_len = self.items.len();
        let small_fits = self.count <= u8::MAX as u32 && body_len + 1 <= u8::MAX as usize;
        if small_fits {
            let (list_code, map_code) = (EncodingCodes::List8, EncodingCodes::Map8);
            self.scratch
                .push(if self.kind == CompoundKind::List {
                    list_code
                } else {
                    map_code
                } as u8);
            self.scratch.push((body_len + 1) as u8);
            self.scratch.push(self.count as u8);
        } else {
            let (list_code, map_code) = (EncodingCodes::List32, EncodingCodes::Map32);
            self.scratch
                .push(if self.kind == CompoundKind::List {
                    list_code
                } else {
                    map_code
                } as u8);
            self.scratch
                .extend_from_slice(&((body_len + 4) as u32).to_be_bytes());
            self.scratch.extend_from_slice(&self.count.to_be_bytes());
        }
        self.scratch.extend_from_slice(&self.items);
        &self.scratch
    }

    /// A restartable iterator over the compound's items.
    pub fn iter(&self) -> CompoundIter<'_> {
        CompoundRef::new(self.kind == CompoundKind::Map, self.count, &self.items).iter()
    }
}

impl<'a> CompoundRef<'a> {
    /// Iterate a map's entries as `(key, value)`, skipping entries whose key
    /// is not a string. Used for the AMQP "message properties" style maps.
    pub fn message_properties(&self) -> TypedMapIter<'a> {
        TypedMapIter {
            inner: self.iter(),
            key_filter: KeyFilter::String,
        }
    }

    /// Iterate a map's entries as `(key, value)`, skipping entries whose key
    /// is not a symbol. Used for annotations/"fields" style maps.
    pub fn annotations(&self) -> TypedMapIter<'a> {
        TypedMapIter {
            inner: self.iter(),
            key_filter: KeyFilter::Symbol,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum KeyFilter {
    String,
    Symbol,
}

/// Iterator produced by [`CompoundRef::message_properties`] /
/// [`CompoundRef::annotations`]: yields `(key, value)` pairs and silently
/// skips entries whose key does not match the expected type.
#[derive(Debug, Clone)]
pub struct TypedMapIter<'a> {
    inner: CompoundIter<'a>,
    key_filter: KeyFilter,
}

impl<'a> Iterator for TypedMapIter<'a> {
    type Item = Result<(&'a str, ValueRef<'a>), ConsumeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.inner.next()?;
            let key = match key {
                Ok(k) => k,
                Err(e) => return Some(Err(e)),
            };
            let value = match self.inner.next() {
                Some(Ok(v)) => v,
                Some(Err(e)) => return Some(Err(e)),
                None => return Some(Err(ConsumeError::Invalid)),
            };
            let matched = match (self.key_filter, &key) {
                (KeyFilter::String, ValueRef::String(s)) => Some(*s),
                (KeyFilter::Symbol, ValueRef::Symbol(s)) => Some(*s),
                _ => None,
            };
            if let Some(s) = matched {
                return Some(Ok((s, value)));
            }
            // wrong-typed key: skip this entry and move to the next one
        }
    }
}

/// Result of [`SymbolArrayBuilder::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The symbol was appended in full.
    Appended,
    /// The array uses the small (`sym8`) element form, so the symbol was
    /// truncated to 255 bytes before being appended.
    Truncated {
        /// The symbol's length before truncation.
        original_len: usize,
    },
}

/// Incremental builder for an AMQP array of symbols.
///
/// Mirrors [`OwnedCompound`] but specialized for arrays, whose elements
/// share a single format code chosen once for the whole array. Once a
/// builder has picked the small (`sym8`) element form it cannot widen an
/// individual element past 255 bytes without re-encoding every element
/// already appended; [`SymbolArrayBuilder::append`] truncates instead, and
/// [`SymbolArrayBuilder::buildn`] looks at the whole input up front to
/// avoid that entirely.
#[derive(Debug, Clone)]
pub struct SymbolArrayBuilder {
    large_elements: bool,
    count: u32,
    items: Vec<u8>,
    scratch: Vec<u8>,
}

impl Default for SymbolArrayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolArrayBuilder {
    /// An empty builder that starts in the small (`sym8`) element form.
    pub fn new() -> Self {
        SymbolArrayBuilder {
            large_elements: false,
            count: 0,
            items: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Build a symbol array from a full batch of symbols, choosing the large
    /// (`sym32`) element form up front if any symbol would not fit in the
    /// small form, so no symbol is truncated.
    pub fn buildn(symbols: &[&str]) -> Self {
        let large_elements = symbols.iter().any(|s| s.len() > u8::MAX as usize);
        let mut builder = SymbolArrayBuilder {
            large_elements,
            count: 0,
            items: Vec::new(),
            scratch: Vec::new(),
        };
        for s in symbols {
            builder.push_full(s);
        }
        builder
    }

    /// Append one symbol. If the builder is in the small element form and
    /// `symbol` is longer than 255 bytes, it is truncated and the original
    /// length is reported back so the caller can log or reject it.
    pub fn append(&mut self, symbol: &str) -> AppendOutcome {
        if !self.large_elements && symbol.len() > u8::MAX as usize {
            let original_len = symbol.len();
            let truncated = &symbol.as_bytes()[..u8::MAX as usize];
            // Symbols are ASCII in practice; truncating on a byte boundary
            // here never splits a multi-byte sequence for valid input.
            self.push_bytes(truncated);
            tracing::warn!(original_len, "truncated long symbol in small-form array");
            return AppendOutcome::Truncated { original_len };
        }
        self.push_full(symbol);
        AppendOutcome::Appended
    }

    fn push_full(&mut self, symbol: &str) {
        self.push_bytes(symbol.as_bytes());
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        if self.large_elements {
            self.items
                .extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        } else {
            self.items.push(bytes.len() as u8);
        }
        self.items.extend_from_slice(bytes);
        self.count += 1;
    }

    /// Number of symbols appended so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Re-encode the array header and return the canonical on-wire slice.
    /// Valid until the next call to `bytes()` or any mutating method.
    pub fn bytes(&mut self) -> &[u8] {
        self.scratch.clear();
        let element_code = if self.large_elements {
            EncodingCodes::Sym32
        } else {
            EncodingCodes::Sym8
        };
        let body_len = 1 + self.items.len(); // element format code + items
        let small_fits = self.count <= u8::MAX as u32 && body_len + 1 <= u8::MAX as usize;
        if small_fits {
            self.scratch.push(EncodingCodes::Array8 as u8);
            self.scratch.push((body_len + 1) as u8);
            self.scratch.push(self.count as u8);
        } else {
            self.scratch.push(EncodingCodes::Array32 as u8);
            self.scratch
                .extend_from_slice(&((body_len + 4) as u32).to_be_bytes());
            self.scratch.extend_from_slice(&self.count.to_be_bytes());
        }
        self.scratch.push(element_code as u8);
        self.scratch.extend_from_slice(&self.items);
        &self.scratch
    }

    /// Decode the built array back into a borrowed [`ArrayRef`]. Mostly
    /// useful for tests and round-trip checks.
    pub fn as_array_ref(&mut self) -> Result<ArrayRef<'_>, ConsumeError> {
        let bytes = self.bytes();
        let mut consumer = Consumer::new(bytes);
        match decode_value(&mut consumer)? {
            ValueRef::Array(arr) => Ok(arr),
            _ => Err(ConsumeError::Invalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_vec;

    #[test]
    fn owned_compound_round_trips_list() {
        let a = to_vec(&1u32).unwrap();
        let b = to_vec(&2u32).unwrap();
        let mut compound = OwnedCompound::compound_build(CompoundKind::List);
        compound.push_item(&a);
        compound.push_item(&b);
        let bytes = compound.bytes().to_vec();

        let mut consumer = Consumer::new(&bytes);
        let value = decode_value(&mut consumer).unwrap();
        let ValueRef::List(list) = value else {
            panic!("expected list")
        };
        let items: Vec<_> = list.iter().map(|r| r.unwrap()).collect();
        assert_eq!(items, vec![ValueRef::UInt(1), ValueRef::UInt(2)]);
    }

    #[test]
    fn owned_compound_make_reparses_existing_bytes() {
        let encoded = to_vec(&(1u32, 2u32, 3u32)).unwrap();
        let owned = OwnedCompound::compound_make(&encoded).unwrap();
        assert_eq!(owned.count(), 3);
        let items: Vec<_> = owned.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            items,
            vec![ValueRef::UInt(1), ValueRef::UInt(2), ValueRef::UInt(3)]
        );
    }

    #[test]
    fn symbol_array_builder_small_form_round_trips() {
        let mut builder = SymbolArrayBuilder::new();
        assert_eq!(builder.append("amqp:accepted:list"), AppendOutcome::Appended);
        assert_eq!(builder.append("amqp:rejected:list"), AppendOutcome::Appended);
        let arr = builder.as_array_ref().unwrap();
        assert_eq!(arr.count(), 2);
        let items: Vec<_> = arr.iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            items,
            vec![
                ValueRef::Symbol("amqp:accepted:list"),
                ValueRef::Symbol("amqp:rejected:list"),
            ]
        );
    }

    #[test]
    fn symbol_array_builder_truncates_long_symbol_in_small_form() {
        let long = "x".repeat(300);
        let mut builder = SymbolArrayBuilder::new();
        let outcome = builder.append(&long);
        assert_eq!(outcome, AppendOutcome::Truncated { original_len: 300 });
        let arr = builder.as_array_ref().unwrap();
        let items: Vec<_> = arr.iter().map(|r| r.unwrap()).collect();
        match &items[0] {
            ValueRef::Symbol(s) => assert_eq!(s.len(), 255),
            other => panic!("expected symbol, got {other:?}"),
        }
    }

    #[test]
    fn symbol_array_builder_buildn_avoids_truncation() {
        let long = "y".repeat(300);
        let mut builder = SymbolArrayBuilder::buildn(&[long.as_str(), "short"]);
        let arr = builder.as_array_ref().unwrap();
        let items: Vec<_> = arr.iter().map(|r| r.unwrap()).collect();
        match &items[0] {
            ValueRef::Symbol(s) => assert_eq!(s.len(), 300),
            other => panic!("expected symbol, got {other:?}"),
        }
    }

    #[test]
    fn message_properties_skips_non_string_keys() {
        use crate::primitives::Symbol;
        // Map with one (Symbol, UInt) entry and one (String, UInt) entry.
        let mut compound = OwnedCompound::compound_build(CompoundKind::Map);
        compound.push_item(&to_vec(&Symbol::from("not-a-string-key")).unwrap());
        compound.push_item(&to_vec(&1u32).unwrap());
        compound.push_item(&to_vec(&"real-key").unwrap());
        compound.push_item(&to_vec(&2u32).unwrap());
        let bytes = compound.bytes().to_vec();

        let mut consumer = Consumer::new(&bytes);
        let value = decode_value(&mut consumer).unwrap();
        let ValueRef::Map(map) = value else {
            panic!("expected map")
        };
        let entries: Vec<_> = map.message_properties().map(|r| r.unwrap()).collect();
        assert_eq!(entries, vec![("real-key", ValueRef::UInt(2))]);
    }
}
