//! Low-level pieces of the protobuf binary encoding: varints, field keys,
//! length-delimited records and zig-zag integers.
//!
//! See <https://protobuf.dev/programming-guides/encoding>. Readers take a
//! `&mut &[u8]` and advance it past what they consumed.

use bytes::BufMut;

use crate::Error;

/// Largest length prefix a reader accepts (64 MiB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// A `u64` needs at most ten 7-bit groups.
const MAX_VARINT_BYTES: usize = 10;

/// Smallest valid field number.
pub const MINIMUM_TAG_VAL: u32 = 1;
/// Largest valid field number, `2^29 - 1`.
pub const MAXIMUM_TAG_VAL: u32 = (1 << 29) - 1;

/// How the payload following a field key is laid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    /// `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// `string`, `bytes`, messages and packed repeated scalars.
    Len = 2,
    SGroup = 3,
    EGroup = 4,
    /// `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        let wire_type = match value {
            0 => WireType::Varint,
            1 => WireType::I64,
            2 => WireType::Len,
            3 => WireType::SGroup,
            4 => WireType::EGroup,
            5 => WireType::I32,
            other => return Err(Error::InvalidWireType(other)),
        };
        Ok(wire_type)
    }
}

pub fn encode_varint<B: BufMut>(mut value: u64, buf: &mut B) {
    while value >= 0x80 {
        buf.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Number of bytes [`encode_varint`] writes for `value`.
pub fn encoded_varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Read a LEB128 varint.
///
/// Rejects encodings longer than ten bytes and a tenth byte carrying more
/// than the single remaining bit.
pub fn decode_varint(buf: &mut &[u8]) -> Result<u64, Error> {
    let bytes: &[u8] = *buf;
    let mut value = 0u64;
    for (idx, &byte) in bytes.iter().take(MAX_VARINT_BYTES).enumerate() {
        if idx == MAX_VARINT_BYTES - 1 && byte > 1 {
            return Err(Error::InvalidVarint);
        }
        value |= u64::from(byte & 0x7F) << (7 * idx);
        if byte < 0x80 {
            *buf = &bytes[idx + 1..];
            return Ok(value);
        }
    }
    Err(Error::UnexpectedEof)
}

/// Write the key of field `tag`.
pub fn encode_key<B: BufMut>(wire_type: WireType, tag: u32, buf: &mut B) {
    encode_varint((u64::from(tag) << 3) | wire_type as u64, buf);
}

/// Read a field key, returning `(field number, wire type)`.
pub fn decode_key(buf: &mut &[u8]) -> Result<(u32, WireType), Error> {
    let key = decode_varint(buf)?;
    let wire_type = WireType::try_from((key & 0b111) as u8)?;
    let number = key >> 3;
    match u32::try_from(number) {
        Ok(number) if (MINIMUM_TAG_VAL..=MAXIMUM_TAG_VAL).contains(&number) => Ok((number, wire_type)),
        _ => Err(Error::InvalidFieldNumber(number)),
    }
}

/// Split `len` bytes off the front of `buf`.
fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], Error> {
    if buf.len() < len {
        return Err(Error::UnexpectedEof);
    }
    let slice: &'a [u8] = *buf;
    let (head, rest) = slice.split_at(len);
    *buf = rest;
    Ok(head)
}

/// Read a length prefix and return the payload it covers.
pub fn decode_len_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], Error> {
    let len = decode_varint(buf)?;
    if len > MAX_MESSAGE_SIZE as u64 {
        return Err(Error::LengthTooLarge(len));
    }
    take(buf, len as usize)
}

/// Read a length-delimited UTF-8 string.
pub fn decode_string(buf: &mut &[u8]) -> Result<String, Error> {
    let data = decode_len_delimited(buf)?;
    std::str::from_utf8(data)
        .map(str::to_owned)
        .map_err(|_| Error::InvalidUtf8)
}

/// Step over the payload of a field that isn't being read. Groups are an error.
pub fn skip_field(buf: &mut &[u8], wire_type: WireType) -> Result<(), Error> {
    match wire_type {
        WireType::Varint => decode_varint(buf).map(drop),
        WireType::I64 => take(buf, 8).map(drop),
        WireType::I32 => take(buf, 4).map(drop),
        WireType::Len => decode_len_delimited(buf).map(drop),
        WireType::SGroup | WireType::EGroup => Err(Error::InvalidWireType(wire_type as u8)),
    }
}

/// ZigZag-encode a `sint32`.
pub fn encode_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn decode_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// ZigZag-encode a `sint64`.
pub fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
