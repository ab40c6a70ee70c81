//! Primitive encoding/decoding for the Tezos binary format.
//!
//! Integers are big-endian, booleans are `0x00`/`0xff`, variable-size
//! fields carry a 4-byte big-endian length prefix, and arbitrary-precision
//! numbers use the zarith encoding (7 bits per byte, least significant
//! group first, continuation in the high bit).

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_BYTES_LEN, MAX_LIST_LEN};
use crate::model::{Address, AddressKind, KeyKind, N, PublicKey, Signature, Z};

const CONTRACT_IMPLICIT_TAG: u8 = 0;
const CONTRACT_ORIGINATED_TAG: u8 = 1;
const CONTRACT_ROLLUP_TAG: u8 = 3;

// =============================================================================
// DECODING
// =============================================================================

/// Cursor over a byte slice.
///
/// Every read checks bounds and returns `UnexpectedEof` instead of
/// panicking. The position can be saved and restored with [`Reader::seek`],
/// which is how decoders give a tag byte back after a mismatch.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to an earlier saved position.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Returns the remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the next byte without consuming it.
    pub fn peek_byte(&self, context: &'static str) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof { context })
    }

    /// Fails unless at least `n` bytes remain.
    pub fn ensure(&self, n: usize, context: &'static str) -> Result<(), DecodeError> {
        if self.remaining_len() < n {
            return Err(DecodeError::UnexpectedEof { context });
        }
        Ok(())
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let byte = self.peek_byte(context)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        self.ensure(n, context)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads a fixed-size array.
    #[inline]
    pub fn read_array<const LEN: usize>(
        &mut self,
        context: &'static str,
    ) -> Result<[u8; LEN], DecodeError> {
        let bytes = self.read_bytes(LEN, context)?;
        let mut out = [0u8; LEN];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_i32(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_i64(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array(context)?))
    }

    /// Reads a boolean (`0x00` false, `0xff` true).
    pub fn read_bool(&mut self, context: &'static str) -> Result<bool, DecodeError> {
        match self.read_byte(context)? {
            0x00 => Ok(false),
            0xff => Ok(true),
            value => Err(DecodeError::InvalidBool { value }),
        }
    }

    /// Reads the 7-bit groups of a zarith number, continuation bits stripped.
    fn read_groups(&mut self, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        let mut groups = Vec::new();
        loop {
            let byte = self.read_byte(context)?;
            groups.push(byte & 0x7f);
            if byte & 0x80 == 0 {
                break;
            }
        }
        if groups.len() > 1 && groups.last() == Some(&0) {
            return Err(DecodeError::NonCanonicalVarint { context });
        }
        Ok(groups)
    }

    /// Reads an unsigned zarith number.
    pub fn read_n(&mut self, context: &'static str) -> Result<N, DecodeError> {
        let groups = self.read_groups(context)?;
        BigUint::from_radix_le(&groups, 0x80)
            .map(N::new)
            .ok_or(DecodeError::MalformedEncoding { context })
    }

    /// Reads a signed zarith number.
    pub fn read_z(&mut self, context: &'static str) -> Result<Z, DecodeError> {
        let first = self.read_byte(context)?;
        let negative = first & 0x40 != 0;
        let mut magnitude = BigUint::from(first & 0x3f);
        if first & 0x80 != 0 {
            let groups = self.read_groups(context)?;
            if groups == [0] {
                return Err(DecodeError::NonCanonicalVarint { context });
            }
            let high = BigUint::from_radix_le(&groups, 0x80)
                .ok_or(DecodeError::MalformedEncoding { context })?;
            magnitude += high << 6u32;
        }
        if negative && magnitude.is_zero() {
            return Err(DecodeError::NonCanonicalVarint { context });
        }
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(Z::new(BigInt::from_biguint(sign, magnitude)))
    }

    /// Reads a 4-byte length prefix and checks it against `max`.
    pub fn read_length(&mut self, max: usize, field: &'static str) -> Result<usize, DecodeError> {
        let len = self.read_u32(field)? as usize;
        if len > max {
            return Err(DecodeError::LengthExceedsLimit { field, len, max });
        }
        Ok(len)
    }

    /// Reads a length-prefixed byte array.
    pub fn read_bytes_prefixed(
        &mut self,
        max_len: usize,
        field: &'static str,
    ) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_length(max_len, field)?;
        Ok(self.read_bytes(len, field)?.to_vec())
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string_prefixed(
        &mut self,
        max_len: usize,
        field: &'static str,
    ) -> Result<String, DecodeError> {
        let len = self.read_length(max_len, field)?;
        let bytes = self.read_bytes(len, field)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    /// Decodes a length-prefixed sub-structure with `f`, which must consume
    /// exactly the declared bytes.
    pub fn read_prefixed_with<T>(
        &mut self,
        field: &'static str,
        f: impl FnOnce(&mut Reader<'a>) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let len = self.read_length(MAX_BYTES_LEN, field)?;
        let mut inner = Reader::new(self.read_bytes(len, field)?);
        let value = f(&mut inner)?;
        if !inner.is_empty() {
            return Err(DecodeError::LengthMismatch {
                field,
                declared: len,
                consumed: inner.position(),
            });
        }
        Ok(value)
    }

    /// Decodes a length-prefixed sequence of items until its bytes run out.
    pub fn read_list_prefixed<T>(
        &mut self,
        field: &'static str,
        mut f: impl FnMut(&mut Reader<'a>) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        self.read_prefixed_with(field, |r| {
            let mut items = Vec::new();
            while !r.is_empty() {
                if items.len() >= MAX_LIST_LEN {
                    return Err(DecodeError::LengthExceedsLimit {
                        field,
                        len: items.len() + 1,
                        max: MAX_LIST_LEN,
                    });
                }
                items.push(f(r)?);
            }
            Ok(items)
        })
    }

    /// Reads a 21-byte implicit account address (key tag + hash).
    pub fn read_implicit_address(&mut self, context: &'static str) -> Result<Address, DecodeError> {
        let tag = self.read_byte(context)?;
        let kind = KeyKind::from_tag(tag).ok_or(DecodeError::InvalidAddressTag { tag, context })?;
        Ok(Address::new(AddressKind::Implicit(kind), self.read_array(context)?))
    }

    /// Reads a 22-byte contract address (implicit, originated or rollup).
    pub fn read_contract_address(&mut self, context: &'static str) -> Result<Address, DecodeError> {
        let tag = self.read_byte(context)?;
        let kind = match tag {
            CONTRACT_IMPLICIT_TAG => return self.read_implicit_address(context),
            CONTRACT_ORIGINATED_TAG => AddressKind::Originated,
            CONTRACT_ROLLUP_TAG => AddressKind::SmartRollup,
            _ => return Err(DecodeError::InvalidAddressTag { tag, context }),
        };
        let hash = self.read_array(context)?;
        if self.read_byte(context)? != 0 {
            return Err(DecodeError::InvalidPadding { context });
        }
        Ok(Address::new(kind, hash))
    }

    /// Reads the 22-byte form of an originated contract only.
    pub fn read_originated_address(&mut self, context: &'static str) -> Result<Address, DecodeError> {
        let tag = self.peek_byte(context)?;
        if tag != CONTRACT_ORIGINATED_TAG {
            return Err(DecodeError::InvalidAddressTag { tag, context });
        }
        self.read_contract_address(context)
    }

    /// Reads a raw 20-byte smart rollup address.
    pub fn read_rollup_address(&mut self, context: &'static str) -> Result<Address, DecodeError> {
        Ok(Address::new(AddressKind::SmartRollup, self.read_array(context)?))
    }

    /// Reads a tagged public key.
    pub fn read_public_key(&mut self, context: &'static str) -> Result<PublicKey, DecodeError> {
        let tag = self.read_byte(context)?;
        let kind = KeyKind::from_tag(tag).ok_or(DecodeError::InvalidKeyTag { tag })?;
        let bytes = self.read_bytes(kind.public_key_len(), context)?;
        PublicKey::from_bytes(kind, bytes).map_err(|_| DecodeError::MalformedEncoding { context })
    }

    /// Reads a raw 64-byte signature.
    pub fn read_signature(&mut self, context: &'static str) -> Result<Signature, DecodeError> {
        Ok(Signature::new(self.read_array(context)?))
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(if value { 0xff } else { 0x00 });
    }

    /// Writes 7-bit groups, setting the continuation bit on all but the last.
    fn write_groups(&mut self, value: &BigUint) {
        let groups = value.to_radix_le(0x80);
        let last = groups.len().saturating_sub(1);
        for (i, group) in groups.into_iter().enumerate() {
            self.buf.push(if i < last { group | 0x80 } else { group });
        }
    }

    /// Writes an unsigned zarith number.
    pub fn write_n(&mut self, value: &N) {
        self.write_groups(value.as_biguint());
    }

    /// Writes a signed zarith number.
    pub fn write_z(&mut self, value: &Z) {
        let magnitude = value.magnitude();
        let low = magnitude.iter_u32_digits().next().unwrap_or(0) as u8 & 0x3f;
        let high: BigUint = magnitude >> 6u32;
        let mut first = low;
        if value.is_negative() {
            first |= 0x40;
        }
        if high.is_zero() {
            self.buf.push(first);
        } else {
            self.buf.push(first | 0x80);
            self.write_groups(&high);
        }
    }

    /// Writes a length-prefixed byte array.
    pub fn write_bytes_prefixed(
        &mut self,
        bytes: &[u8],
        field: &'static str,
    ) -> Result<(), EncodeError> {
        if bytes.len() > MAX_BYTES_LEN {
            return Err(EncodeError::LengthExceedsLimit {
                field,
                len: bytes.len(),
                max: MAX_BYTES_LEN,
            });
        }
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string_prefixed(&mut self, s: &str, field: &'static str) -> Result<(), EncodeError> {
        self.write_bytes_prefixed(s.as_bytes(), field)
    }

    /// Writes a sub-structure produced by `f` behind a 4-byte length prefix.
    pub fn write_prefixed_with(
        &mut self,
        field: &'static str,
        f: impl FnOnce(&mut Writer) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        let start = self.buf.len();
        self.buf.extend_from_slice(&[0u8; 4]);
        f(self)?;
        let len = self.buf.len() - start - 4;
        if len > MAX_BYTES_LEN {
            return Err(EncodeError::LengthExceedsLimit {
                field,
                len,
                max: MAX_BYTES_LEN,
            });
        }
        self.buf[start..start + 4].copy_from_slice(&(len as u32).to_be_bytes());
        Ok(())
    }

    /// Writes the 21-byte form of an implicit account address.
    pub fn write_implicit_address(&mut self, address: &Address) -> Result<(), EncodeError> {
        match address.kind() {
            AddressKind::Implicit(kind) => {
                self.buf.push(kind.tag());
                self.buf.extend_from_slice(address.hash());
                Ok(())
            }
            _ => Err(EncodeError::InvalidAddress {
                address: address.to_base58(),
                form: "implicit address",
            }),
        }
    }

    /// Writes the 22-byte contract form of any address.
    pub fn write_contract_address(&mut self, address: &Address) {
        match address.kind() {
            AddressKind::Implicit(kind) => {
                self.buf.push(CONTRACT_IMPLICIT_TAG);
                self.buf.push(kind.tag());
                self.buf.extend_from_slice(address.hash());
            }
            AddressKind::Originated | AddressKind::SmartRollup => {
                self.buf.push(if address.is_originated() {
                    CONTRACT_ORIGINATED_TAG
                } else {
                    CONTRACT_ROLLUP_TAG
                });
                self.buf.extend_from_slice(address.hash());
                self.buf.push(0);
            }
        }
    }

    /// Writes the 22-byte form of an originated contract only.
    pub fn write_originated_address(&mut self, address: &Address) -> Result<(), EncodeError> {
        if !address.is_originated() {
            return Err(EncodeError::InvalidAddress {
                address: address.to_base58(),
                form: "originated contract",
            });
        }
        self.write_contract_address(address);
        Ok(())
    }

    /// Writes the raw 20-byte form of a smart rollup address.
    pub fn write_rollup_address(&mut self, address: &Address) -> Result<(), EncodeError> {
        if !address.is_rollup() {
            return Err(EncodeError::InvalidAddress {
                address: address.to_base58(),
                form: "smart rollup address",
            });
        }
        self.buf.extend_from_slice(address.hash());
        Ok(())
    }

    /// Writes a tagged public key.
    pub fn write_public_key(&mut self, key: &PublicKey) {
        self.buf.push(key.kind().tag());
        self.buf.extend_from_slice(key.as_bytes());
    }

    /// Writes a raw 64-byte signature.
    pub fn write_signature(&mut self, signature: &Signature) {
        self.buf.extend_from_slice(signature.as_bytes());
    }
}
