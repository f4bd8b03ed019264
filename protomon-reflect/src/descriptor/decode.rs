//! Binary decoding of `FileDescriptorSet`s, as written by
//! `protoc --descriptor_set_out`.
//!
//! Fields this crate has no use for (source info, most options) are skipped.

use bytes::Buf;

use super::*;
use crate::wire::{decode_key, decode_len_delimited, decode_string, decode_varint, skip_field, WireType};
use crate::Error;

/// Decode a serialized `FileDescriptorSet`.
pub fn decode_file_descriptor_set(data: &[u8]) -> Result<FileDescriptorSet, Error> {
    decode(data)
}

/// A descriptor message that can be read one field at a time.
trait Decode: Default {
    /// Message name used in error reports.
    const NAME: &'static str;

    /// Consume the value of the field `key` introduces. Unknown fields must be skipped.
    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error>;
}

/// The key of the field being read.
#[derive(Debug, Clone, Copy)]
struct Key {
    message: &'static str,
    number: u32,
    wire_type: WireType,
}

impl Key {
    fn expect(self, wire_type: WireType) -> Result<(), Error> {
        if self.wire_type == wire_type {
            return Ok(());
        }
        Err(Error::WireTypeMismatch {
            field: format!("{}.{}", self.message, self.number),
            wire_type: self.wire_type,
        })
    }

    fn skip(self, buf: &mut &[u8]) -> Result<(), Error> {
        skip_field(buf, self.wire_type)
    }
}

fn decode<T: Decode>(mut buf: &[u8]) -> Result<T, Error> {
    let mut message = T::default();
    while buf.has_remaining() {
        let (number, wire_type) = decode_key(&mut buf)?;
        let key = Key {
            message: T::NAME,
            number,
            wire_type,
        };
        message.merge_field(key, &mut buf)?;
    }
    Ok(message)
}

/// Decode a length-delimited embedded message.
fn nested<T: Decode>(key: Key, buf: &mut &[u8]) -> Result<T, Error> {
    key.expect(WireType::Len)?;
    decode(decode_len_delimited(buf)?)
}

fn string(key: Key, buf: &mut &[u8]) -> Result<String, Error> {
    key.expect(WireType::Len)?;
    decode_string(buf)
}

fn int32(key: Key, buf: &mut &[u8]) -> Result<i32, Error> {
    key.expect(WireType::Varint)?;
    // int32 is sign-extended to 64 bits on the wire; truncation recovers it.
    Ok(decode_varint(buf)? as i32)
}

fn boolean(key: Key, buf: &mut &[u8]) -> Result<bool, Error> {
    key.expect(WireType::Varint)?;
    Ok(decode_varint(buf)? != 0)
}

impl Decode for FileDescriptorSet {
    const NAME: &'static str = "FileDescriptorSet";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.file.push(nested(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for FileDescriptorProto {
    const NAME: &'static str = "FileDescriptorProto";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.name = Some(string(key, buf)?),
            2 => self.package = Some(string(key, buf)?),
            3 => self.dependency.push(string(key, buf)?),
            4 => self.message_type.push(nested(key, buf)?),
            5 => self.enum_type.push(nested(key, buf)?),
            12 => self.syntax = Some(string(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for DescriptorProto {
    const NAME: &'static str = "DescriptorProto";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.name = Some(string(key, buf)?),
            2 => self.field.push(nested(key, buf)?),
            3 => self.nested_type.push(nested(key, buf)?),
            4 => self.enum_type.push(nested(key, buf)?),
            7 => self.options = Some(nested(key, buf)?),
            8 => self.oneof_decl.push(nested(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for FieldDescriptorProto {
    const NAME: &'static str = "FieldDescriptorProto";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.name = Some(string(key, buf)?),
            3 => self.number = Some(int32(key, buf)?),
            4 => self.label = Some(int32(key, buf)?),
            5 => self.r#type = Some(int32(key, buf)?),
            6 => self.type_name = Some(string(key, buf)?),
            7 => self.default_value = Some(string(key, buf)?),
            8 => self.options = Some(nested(key, buf)?),
            9 => self.oneof_index = Some(int32(key, buf)?),
            10 => self.json_name = Some(string(key, buf)?),
            17 => self.proto3_optional = Some(boolean(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for FieldOptions {
    const NAME: &'static str = "FieldOptions";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            2 => self.packed = Some(boolean(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for MessageOptions {
    const NAME: &'static str = "MessageOptions";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            7 => self.map_entry = Some(boolean(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for EnumDescriptorProto {
    const NAME: &'static str = "EnumDescriptorProto";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.name = Some(string(key, buf)?),
            2 => self.value.push(nested(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for EnumValueDescriptorProto {
    const NAME: &'static str = "EnumValueDescriptorProto";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.name = Some(string(key, buf)?),
            2 => self.number = Some(int32(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

impl Decode for OneofDescriptorProto {
    const NAME: &'static str = "OneofDescriptorProto";

    fn merge_field(&mut self, key: Key, buf: &mut &[u8]) -> Result<(), Error> {
        match key.number {
            1 => self.name = Some(string(key, buf)?),
            _ => key.skip(buf)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{encode_key, encode_varint};

    fn put_string(tag: u32, value: &str, buf: &mut Vec<u8>) {
        encode_key(WireType::Len, tag, buf);
        encode_varint(value.len() as u64, buf);
        buf.extend_from_slice(value.as_bytes());
    }

    fn put_varint(tag: u32, value: u64, buf: &mut Vec<u8>) {
        encode_key(WireType::Varint, tag, buf);
        encode_varint(value, buf);
    }

    fn put_message(tag: u32, body: &[u8], buf: &mut Vec<u8>) {
        encode_key(WireType::Len, tag, buf);
        encode_varint(body.len() as u64, buf);
        buf.extend_from_slice(body);
    }

    #[test]
    fn test_decode_minimal_file() {
        // message Person { string name = 1; repeated int32 ids = 2 [packed = false]; }
        let mut name_field = Vec::new();
        put_string(1, "name", &mut name_field);
        put_varint(3, 1, &mut name_field);
        put_varint(4, 1, &mut name_field);
        put_varint(5, 9, &mut name_field);
        put_string(10, "name", &mut name_field);

        let mut options = Vec::new();
        put_varint(2, 0, &mut options);

        let mut ids_field = Vec::new();
        put_string(1, "ids", &mut ids_field);
        put_varint(3, 2, &mut ids_field);
        put_varint(4, 3, &mut ids_field);
        put_varint(5, 5, &mut ids_field);
        put_message(8, &options, &mut ids_field);

        let mut message = Vec::new();
        put_string(1, "Person", &mut message);
        put_message(2, &name_field, &mut message);
        put_message(2, &ids_field, &mut message);

        let mut file = Vec::new();
        put_string(1, "person.proto", &mut file);
        put_string(2, "example", &mut file);
        put_message(4, &message, &mut file);
        put_string(12, "proto3", &mut file);
        // Unknown field (source_code_info) must be skipped.
        put_message(9, b"\x08\x01", &mut file);

        let mut fds_bytes = Vec::new();
        put_message(1, &file, &mut fds_bytes);

        let fds = decode_file_descriptor_set(&fds_bytes).unwrap();
        assert_eq!(fds.file.len(), 1);
        let file = &fds.file[0];
        assert_eq!(file.name.as_deref(), Some("person.proto"));
        assert_eq!(file.package.as_deref(), Some("example"));
        assert_eq!(file.syntax.as_deref(), Some("proto3"));

        let person = &file.message_type[0];
        assert_eq!(person.name.as_deref(), Some("Person"));
        assert_eq!(person.field.len(), 2);
        assert_eq!(person.field[0].r#type, Some(Type::String as i32));
        assert_eq!(person.field[0].json_name.as_deref(), Some("name"));
        assert_eq!(person.field[1].label, Some(Label::Repeated as i32));
        assert_eq!(
            person.field[1].options.as_ref().and_then(|o| o.packed),
            Some(false)
        );
    }

    #[test]
    fn test_decode_truncated_file() {
        let mut fds_bytes = Vec::new();
        encode_key(WireType::Len, 1, &mut fds_bytes);
        encode_varint(10, &mut fds_bytes);
        fds_bytes.extend_from_slice(b"abc");

        assert!(matches!(
            decode_file_descriptor_set(&fds_bytes),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_wire_type_mismatch() {
        // FieldDescriptorProto.number written as a string.
        let mut field = Vec::new();
        put_string(1, "id", &mut field);
        put_string(3, "7", &mut field);

        let mut message = Vec::new();
        put_string(1, "Broken", &mut message);
        put_message(2, &field, &mut message);

        let mut file = Vec::new();
        put_message(4, &message, &mut file);
        let mut fds_bytes = Vec::new();
        put_message(1, &file, &mut fds_bytes);

        assert_eq!(
            decode_file_descriptor_set(&fds_bytes).unwrap_err(),
            Error::WireTypeMismatch {
                field: "FieldDescriptorProto.3".to_string(),
                wire_type: WireType::Len,
            }
        );

        // A file entry that is a varint instead of a message.
        let mut fds_bytes = Vec::new();
        put_varint(1, 5, &mut fds_bytes);
        assert!(matches!(
            decode_file_descriptor_set(&fds_bytes),
            Err(Error::WireTypeMismatch { wire_type: WireType::Varint, .. })
        ));
    }
}
