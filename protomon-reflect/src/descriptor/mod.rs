//! The subset of `google/protobuf/descriptor.proto` needed to interpret
//! text and JSON documents.
//!
//! Values are kept exactly as protoc wrote them (`Option`s, raw `i32`
//! enums, dotted type names). [`DescriptorPool`](crate::DescriptorPool)
//! resolves and validates them.

mod decode;

pub use decode::decode_file_descriptor_set;

#[derive(Debug, Clone, Default)]
pub struct FileDescriptorSet {
    pub file: Vec<FileDescriptorProto>,
}

/// One `.proto` file. Unset `syntax` means proto2.
#[derive(Debug, Clone, Default)]
pub struct FileDescriptorProto {
    pub name: Option<String>,
    pub package: Option<String>,
    pub dependency: Vec<String>,
    pub message_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub syntax: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorProto {
    pub name: Option<String>,
    pub field: Vec<FieldDescriptorProto>,
    pub nested_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub options: Option<MessageOptions>,
    pub oneof_decl: Vec<OneofDescriptorProto>,
}

impl DescriptorProto {
    /// Whether protoc synthesized this message for a `map<K, V>` field.
    pub fn is_map_entry(&self) -> bool {
        matches!(
            self.options,
            Some(MessageOptions {
                map_entry: Some(true)
            })
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldDescriptorProto {
    pub name: Option<String>,
    pub number: Option<i32>,
    /// A [`Label`] value.
    pub label: Option<i32>,
    /// A [`Type`] value.
    pub r#type: Option<i32>,
    /// Fully-qualified with a leading dot, e.g. `.google.protobuf.Any`.
    pub type_name: Option<String>,
    /// proto2 `[default = ...]`, in text form.
    pub default_value: Option<String>,
    pub options: Option<FieldOptions>,
    pub oneof_index: Option<i32>,
    /// protoc always fills this in; hand-built descriptors may leave it out.
    pub json_name: Option<String>,
    pub proto3_optional: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDescriptorProto {
    pub name: Option<String>,
    pub value: Vec<EnumValueDescriptorProto>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumValueDescriptorProto {
    pub name: Option<String>,
    pub number: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct OneofDescriptorProto {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageOptions {
    pub map_entry: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    /// Overrides the syntax's default packing of repeated scalars.
    pub packed: Option<bool>,
}

/// Declares a descriptor.proto enum together with its `TryFrom<i32>`.
macro_rules! proto_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl TryFrom<i32> for $name {
            /// The unrecognized value.
            type Error = i32;

            fn try_from(value: i32) -> Result<Self, i32> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    other => Err(other),
                }
            }
        }
    };
}

proto_enum! {
    /// `FieldDescriptorProto.Type`.
    Type {
        Double = 1,
        Float = 2,
        Int64 = 3,
        Uint64 = 4,
        Int32 = 5,
        Fixed64 = 6,
        Fixed32 = 7,
        Bool = 8,
        String = 9,
        Group = 10,
        Message = 11,
        Bytes = 12,
        Uint32 = 13,
        Enum = 14,
        Sfixed32 = 15,
        Sfixed64 = 16,
        Sint32 = 17,
        Sint64 = 18,
    }
}

proto_enum! {
    /// `FieldDescriptorProto.Label`.
    Label {
        Optional = 1,
        Required = 2,
        Repeated = 3,
    }
}
