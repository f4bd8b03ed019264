//! Error types for protomon-reflect.

use crate::wire::WireType;

/// Errors raised while building descriptors or converting dynamic messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A length prefix above [`MAX_MESSAGE_SIZE`](crate::wire::MAX_MESSAGE_SIZE).
    LengthTooLarge(u64),
    /// A varint longer than ten bytes or overflowing 64 bits.
    InvalidVarint,
    /// Input ended in the middle of a record.
    UnexpectedEof,
    /// A wire type other than 0 to 5, or a group.
    InvalidWireType(u8),
    /// Field number zero or above the protobuf maximum.
    InvalidFieldNumber(u64),
    /// Invalid UTF-8 in string field.
    InvalidUtf8,
    /// Nested messages exceeded the recursion limit.
    RecursionLimitExceeded,
    /// A known field arrived with a wire type its kind can't have.
    WireTypeMismatch { field: String, wire_type: WireType },
    /// Missing name field in descriptor.
    MissingName,
    /// Missing field number.
    MissingFieldNumber,
    /// Invalid field type.
    InvalidFieldType(i32),
    /// Invalid label.
    InvalidLabel(i32),
    /// Group fields are not supported.
    UnsupportedGroup(String),
    /// Two types registered under the same fully-qualified name.
    DuplicateType(String),
    /// Two fields of one message share a name.
    DuplicateField { message: String, field: String },
    /// Two fields of one message share a number.
    DuplicateFieldNumber { message: String, number: i32 },
    /// A field's oneof index points past the message's oneof declarations.
    InvalidOneofIndex {
        message: String,
        field: String,
        index: i32,
    },
    /// A message or enum field references a type that is not in the pool.
    UnresolvedType { field: String, type_name: String },
    /// A map entry type without key (1) and value (2) fields.
    InvalidMapEntry(String),
    /// Lookup of a message type that is not in the pool.
    UnknownMessage(String),
    /// A field that does not belong to the message it is used with.
    UnknownField { message: String, field: String },
    /// A value whose kind disagrees with the field it is assigned to.
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthTooLarge(len) => write!(f, "Length prefix {} exceeds the maximum record size", len),
            Self::InvalidVarint => write!(f, "Invalid varint encoding"),
            Self::UnexpectedEof => write!(f, "Unexpected end of buffer"),
            Self::InvalidWireType(w) => write!(f, "Invalid wire type: {}", w),
            Self::InvalidFieldNumber(n) => write!(f, "Invalid field number: {}", n),
            Self::InvalidUtf8 => write!(f, "Invalid UTF-8 in string field"),
            Self::RecursionLimitExceeded => write!(f, "Message nesting exceeds recursion limit"),
            Self::WireTypeMismatch { field, wire_type } => {
                write!(f, "Field '{}' cannot be encoded as {:?}", field, wire_type)
            }
            Self::MissingName => write!(f, "Missing name in descriptor"),
            Self::MissingFieldNumber => write!(f, "Missing field number in descriptor"),
            Self::InvalidFieldType(t) => write!(f, "Invalid field type: {} (expected 1-18)", t),
            Self::InvalidLabel(l) => write!(f, "Invalid field label: {} (expected 1-3)", l),
            Self::UnsupportedGroup(field) => write!(f, "Group field '{}' is not supported", field),
            Self::DuplicateType(name) => write!(f, "Type '{}' is defined more than once", name),
            Self::DuplicateField { message, field } => {
                write!(f, "Message '{}' declares field '{}' twice", message, field)
            }
            Self::DuplicateFieldNumber { message, number } => {
                write!(f, "Message '{}' declares field number {} twice", message, number)
            }
            Self::InvalidOneofIndex {
                message,
                field,
                index,
            } => write!(
                f,
                "Field '{}.{}' has out of range oneof index {}",
                message, field, index
            ),
            Self::UnresolvedType { field, type_name } => {
                write!(f, "Field '{}' references unknown type '{}'", field, type_name)
            }
            Self::InvalidMapEntry(name) => {
                write!(f, "Map entry '{}' must have key = 1 and value = 2", name)
            }
            Self::UnknownMessage(name) => write!(f, "Unknown message type '{}'", name),
            Self::UnknownField { message, field } => {
                write!(f, "Message '{}' has no field '{}'", message, field)
            }
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "Field '{}' expects {} but was given {}",
                field, expected, found
            ),
        }
    }
}

impl std::error::Error for Error {}
