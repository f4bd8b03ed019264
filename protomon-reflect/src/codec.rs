//! Binary encoding of [`DynamicMessage`]s.
//!
//! Used to pack and unpack `google.protobuf.Any` payloads. Fields are written
//! in field number order; repeated scalars honor the field's packed flag and
//! map fields are written as a sequence of entry messages.

use bytes::{Buf, BufMut};

use crate::pool::{Cardinality, DescriptorPool, FieldDescriptor, Kind, MessageDescriptor};
use crate::value::{DynamicMessage, MapKey, Value};
use crate::wire::{
    decode_key, decode_len_delimited, decode_varint, decode_zigzag32, decode_zigzag64,
    encode_key, encode_varint, encode_zigzag32, encode_zigzag64, skip_field, WireType,
};
use crate::Error;

/// Maximum depth of nested messages [`decode_message`] will follow.
pub const RECURSION_LIMIT: usize = 100;

/// Encode `message` in the binary wire format.
pub fn encode_message(message: &DynamicMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_message_into(message, &mut buf);
    buf
}

fn encode_message_into(message: &DynamicMessage, buf: &mut Vec<u8>) {
    for (field, value) in message.fields_by_number() {
        encode_field(field, value, buf);
    }
}

fn encode_field(field: &FieldDescriptor, value: &Value, buf: &mut Vec<u8>) {
    match (field.cardinality(), value) {
        (Cardinality::Repeated, Value::List(items)) if field.is_packed() => {
            if items.is_empty() {
                return;
            }
            let mut body = Vec::new();
            for item in items {
                encode_scalar(item, field.kind(), &mut body);
            }
            encode_key(WireType::Len, field.number(), buf);
            encode_varint(body.len() as u64, buf);
            buf.extend_from_slice(&body);
        }
        (Cardinality::Repeated, Value::List(items)) => {
            for item in items {
                encode_single(field.number(), field.kind(), item, buf);
            }
        }
        (Cardinality::Map, Value::Map(map)) => {
            let Some(entry) = field.map_entry() else {
                return;
            };
            for (key, value) in map.iter() {
                let mut body = Vec::new();
                encode_single(1, entry.key.kind(), &key.clone().into_value(), &mut body);
                encode_single(2, entry.value.kind(), value, &mut body);
                encode_key(WireType::Len, field.number(), buf);
                encode_varint(body.len() as u64, buf);
                buf.extend_from_slice(&body);
            }
        }
        _ => encode_single(field.number(), field.kind(), value, buf),
    }
}

/// Encode one value with its key.
fn encode_single(number: u32, kind: Kind, value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Message(message) => {
            let body = encode_message(message);
            encode_key(WireType::Len, number, buf);
            encode_varint(body.len() as u64, buf);
            buf.extend_from_slice(&body);
        }
        Value::String(s) => {
            encode_key(WireType::Len, number, buf);
            encode_varint(s.len() as u64, buf);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            encode_key(WireType::Len, number, buf);
            encode_varint(b.len() as u64, buf);
            buf.extend_from_slice(b);
        }
        scalar => {
            encode_key(kind.wire_type(), number, buf);
            encode_scalar(scalar, kind, buf);
        }
    }
}

/// Encode the payload of a fixed-size or varint value, without a key.
fn encode_scalar(value: &Value, kind: Kind, buf: &mut Vec<u8>) {
    match (value, kind) {
        (Value::Bool(v), _) => encode_varint(u64::from(*v), buf),
        (Value::I32(v), Kind::Sint32) => encode_varint(u64::from(encode_zigzag32(*v)), buf),
        (Value::I32(v), Kind::Sfixed32) => buf.put_i32_le(*v),
        // Negative int32 values are sign-extended to ten bytes.
        (Value::I32(v), _) => encode_varint(i64::from(*v) as u64, buf),
        (Value::I64(v), Kind::Sint64) => encode_varint(encode_zigzag64(*v), buf),
        (Value::I64(v), Kind::Sfixed64) => buf.put_i64_le(*v),
        (Value::I64(v), _) => encode_varint(*v as u64, buf),
        (Value::U32(v), Kind::Fixed32) => buf.put_u32_le(*v),
        (Value::U32(v), _) => encode_varint(u64::from(*v), buf),
        (Value::U64(v), Kind::Fixed64) => buf.put_u64_le(*v),
        (Value::U64(v), _) => encode_varint(*v, buf),
        (Value::F32(v), _) => buf.put_f32_le(*v),
        (Value::F64(v), _) => buf.put_f64_le(*v),
        (Value::EnumNumber(v), _) => encode_varint(i64::from(*v) as u64, buf),
        // Length-delimited and composite values go through `encode_single`.
        _ => {}
    }
}

/// Decode a message of type `descriptor` from its binary encoding.
///
/// Unknown fields are skipped. A singular message field that occurs more than
/// once is merged, other singular fields keep the last value.
pub fn decode_message(
    pool: &DescriptorPool,
    descriptor: &std::sync::Arc<MessageDescriptor>,
    data: &[u8],
) -> Result<DynamicMessage, Error> {
    let mut message = DynamicMessage::new(descriptor.clone());
    merge_message(pool, &mut message, data, 0)?;
    Ok(message)
}

fn merge_message(
    pool: &DescriptorPool,
    message: &mut DynamicMessage,
    data: &[u8],
    depth: usize,
) -> Result<(), Error> {
    if depth > RECURSION_LIMIT {
        return Err(Error::RecursionLimitExceeded);
    }
    let descriptor = message.descriptor().clone();
    let mut buf = data;

    while buf.has_remaining() {
        let (number, wire_type) = decode_key(&mut buf)?;
        let Some(field) = descriptor.get_field(number) else {
            skip_field(&mut buf, wire_type)?;
            continue;
        };

        match field.cardinality() {
            Cardinality::Map => {
                if wire_type != WireType::Len {
                    return Err(mismatch(field, wire_type));
                }
                let entry = decode_len_delimited(&mut buf)?;
                let (key, value) = decode_map_entry(pool, field, entry, depth + 1)?;
                message.insert_map_entry(field, key, value)?;
            }
            Cardinality::Repeated
                if wire_type == WireType::Len && field.kind().is_packable() =>
            {
                let mut packed = decode_len_delimited(&mut buf)?;
                while packed.has_remaining() {
                    let value = decode_scalar(field, field.kind().wire_type(), &mut packed)?;
                    message.push_value(field, value)?;
                }
            }
            Cardinality::Repeated => {
                let value = decode_value(pool, field, wire_type, &mut buf, depth)?;
                message.push_value(field, value)?;
            }
            Cardinality::Singular if field.kind() == Kind::Message => {
                if wire_type != WireType::Len {
                    return Err(mismatch(field, wire_type));
                }
                let body = decode_len_delimited(&mut buf)?;
                match message.get_field_mut(field) {
                    Some(Value::Message(existing)) => {
                        merge_message(pool, existing, body, depth + 1)?;
                    }
                    _ => {
                        let nested = nested_message(pool, field, body, depth)?;
                        message.set_field(field, Value::Message(nested))?;
                    }
                }
            }
            Cardinality::Singular => {
                let value = decode_value(pool, field, wire_type, &mut buf, depth)?;
                message.set_field(field, value)?;
            }
        }
    }
    Ok(())
}

fn decode_map_entry(
    pool: &DescriptorPool,
    field: &FieldDescriptor,
    data: &[u8],
    depth: usize,
) -> Result<(MapKey, Value), Error> {
    let entry = field
        .map_entry()
        .ok_or_else(|| Error::InvalidMapEntry(field.full_name().to_string()))?;
    let mut key = None;
    let mut value = None;
    let mut buf = data;

    while buf.has_remaining() {
        let (number, wire_type) = decode_key(&mut buf)?;
        match number {
            1 => key = Some(decode_value(pool, &entry.key, wire_type, &mut buf, depth)?),
            2 => value = Some(decode_value(pool, &entry.value, wire_type, &mut buf, depth)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    let key = match key {
        Some(key) => MapKey::from_value(key),
        None => MapKey::default_for_kind(entry.key.kind()),
    }
    .ok_or_else(|| Error::InvalidMapEntry(field.full_name().to_string()))?;
    let value = match value {
        Some(value) => value,
        None => Value::default_for_kind(entry.value.kind(), entry.value.type_name(), pool)?,
    };
    Ok((key, value))
}

/// Decode one element of `field`, checking its wire type.
fn decode_value(
    pool: &DescriptorPool,
    field: &FieldDescriptor,
    wire_type: WireType,
    buf: &mut &[u8],
    depth: usize,
) -> Result<Value, Error> {
    if wire_type != field.kind().wire_type() {
        return Err(mismatch(field, wire_type));
    }
    match field.kind() {
        Kind::Message => {
            let body = decode_len_delimited(buf)?;
            Ok(Value::Message(nested_message(pool, field, body, depth)?))
        }
        Kind::String => {
            let body = decode_len_delimited(buf)?;
            let text = std::str::from_utf8(body).map_err(|_| Error::InvalidUtf8)?;
            Ok(Value::String(text.to_string()))
        }
        Kind::Bytes => {
            let body = decode_len_delimited(buf)?;
            Ok(Value::Bytes(bytes::Bytes::copy_from_slice(body)))
        }
        _ => decode_scalar(field, wire_type, buf),
    }
}

fn nested_message(
    pool: &DescriptorPool,
    field: &FieldDescriptor,
    body: &[u8],
    depth: usize,
) -> Result<DynamicMessage, Error> {
    let descriptor = pool.expect_message(field.type_name().unwrap_or_default())?;
    let mut nested = DynamicMessage::new(descriptor);
    merge_message(pool, &mut nested, body, depth + 1)?;
    Ok(nested)
}

/// Decode a varint or fixed-width value of `field`'s kind.
fn decode_scalar(field: &FieldDescriptor, wire_type: WireType, buf: &mut &[u8]) -> Result<Value, Error> {
    let need = match wire_type {
        WireType::I32 => 4,
        WireType::I64 => 8,
        _ => 0,
    };
    if buf.remaining() < need {
        return Err(Error::UnexpectedEof);
    }

    let value = match field.kind() {
        Kind::Bool => Value::Bool(decode_varint(buf)? != 0),
        Kind::Int32 => Value::I32(decode_varint(buf)? as i32),
        Kind::Int64 => Value::I64(decode_varint(buf)? as i64),
        Kind::Uint32 => Value::U32(decode_varint(buf)? as u32),
        Kind::Uint64 => Value::U64(decode_varint(buf)?),
        Kind::Sint32 => Value::I32(decode_zigzag32(decode_varint(buf)? as u32)),
        Kind::Sint64 => Value::I64(decode_zigzag64(decode_varint(buf)?)),
        Kind::Enum => Value::EnumNumber(decode_varint(buf)? as i32),
        Kind::Fixed32 => Value::U32(buf.get_u32_le()),
        Kind::Sfixed32 => Value::I32(buf.get_i32_le()),
        Kind::Float => Value::F32(buf.get_f32_le()),
        Kind::Fixed64 => Value::U64(buf.get_u64_le()),
        Kind::Sfixed64 => Value::I64(buf.get_i64_le()),
        Kind::Double => Value::F64(buf.get_f64_le()),
        Kind::String | Kind::Bytes | Kind::Message => return Err(mismatch(field, wire_type)),
    };
    Ok(value)
}

fn mismatch(field: &FieldDescriptor, wire_type: WireType) -> Error {
    Error::WireTypeMismatch {
        field: field.full_name().to_string(),
        wire_type,
    }
}
