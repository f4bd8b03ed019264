//! `cel.expr.conformance.proto2` and `proto3` `TestAllTypes`, the messages
//! conformance documents embed in `object_value` as `Any` payloads.
//!
//! Both flavours declare the same fields. proto2 adds declared defaults and
//! `TestRequired`; proto3 marks the `optional_*` fields as proto3 `optional`.

use protomon_reflect::descriptor::{FileDescriptorProto, Type};

use super::{enumeration, field, file, MapValueType, Message};

const LABEL_REQUIRED: i32 = 2;

pub(super) fn files() -> Vec<FileDescriptorProto> {
    vec![test_all_types(Flavour::Proto2), test_all_types(Flavour::Proto3)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavour {
    Proto2,
    Proto3,
}

impl Flavour {
    fn package(self) -> &'static str {
        match self {
            Flavour::Proto2 => "cel.expr.conformance.proto2",
            Flavour::Proto3 => "cel.expr.conformance.proto3",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            Flavour::Proto2 => "cel/expr/conformance/proto2/test_all_types.proto",
            Flavour::Proto3 => "cel/expr/conformance/proto3/test_all_types.proto",
        }
    }
}

/// Scalar types by field-name suffix, numbered 1.. as `single_*` and 31.. as `repeated_*`.
const SCALARS: [(&str, Type); 15] = [
    ("int32", Type::Int32),
    ("int64", Type::Int64),
    ("uint32", Type::Uint32),
    ("uint64", Type::Uint64),
    ("sint32", Type::Sint32),
    ("sint64", Type::Sint64),
    ("fixed32", Type::Fixed32),
    ("fixed64", Type::Fixed64),
    ("sfixed32", Type::Sfixed32),
    ("sfixed64", Type::Sfixed64),
    ("float", Type::Float),
    ("double", Type::Double),
    ("bool", Type::Bool),
    ("string", Type::String),
    ("bytes", Type::Bytes),
];

/// proto2 `[default = ...]` of each `single_*` scalar, in [`SCALARS`] order.
const PROTO2_DEFAULTS: [&str; 15] = [
    "-32", "-64", "32", "64", "-32", "-64", "32", "64", "-32", "-64", "3", "6.4", "true", "empty",
    "none",
];

const WRAPPERS: [(&str, &str); 9] = [
    ("int64", ".google.protobuf.Int64Value"),
    ("int32", ".google.protobuf.Int32Value"),
    ("double", ".google.protobuf.DoubleValue"),
    ("float", ".google.protobuf.FloatValue"),
    ("uint64", ".google.protobuf.UInt64Value"),
    ("uint32", ".google.protobuf.UInt32Value"),
    ("string", ".google.protobuf.StringValue"),
    ("bool", ".google.protobuf.BoolValue"),
    ("bytes", ".google.protobuf.BytesValue"),
];

const MAP_KEYS: [(&str, Type); 6] = [
    ("bool", Type::Bool),
    ("int32", Type::Int32),
    ("int64", Type::Int64),
    ("uint32", Type::Uint32),
    ("uint64", Type::Uint64),
    ("string", Type::String),
];

/// First field number of the `map_<key>_<value>` block.
const FIRST_MAP_FIELD: i32 = 500;

const NULL_VALUE: &str = ".google.protobuf.NullValue";

fn test_all_types(flavour: Flavour) -> FileDescriptorProto {
    let package = flavour.package();
    let scope = format!("{package}.TestAllTypes");
    let nested_message = format!(".{scope}.NestedMessage");
    let nested_enum = format!(".{scope}.NestedEnum");
    let nested_test_all_types = format!(".{package}.NestedTestAllTypes");
    let test_all_types = format!(".{scope}");

    let mut message = Message::new("TestAllTypes")
        .nested(Message::new("NestedMessage").scalar("bb", 1, Type::Int32))
        .nested_enum(enumeration("NestedEnum", &[("FOO", 0), ("BAR", 1), ("BAZ", 2)]));

    for (idx, ((suffix, ty), default)) in SCALARS.iter().zip(PROTO2_DEFAULTS).enumerate() {
        let name = format!("single_{suffix}");
        let number = idx as i32 + 1;
        message = match flavour {
            Flavour::Proto2 => message.scalar_with_default(&name, number, *ty, default),
            Flavour::Proto3 => message.scalar(&name, number, *ty),
        };
    }
    message = match flavour {
        Flavour::Proto2 => message
            .scalar("optional_bool", 16, Type::Bool)
            .scalar("optional_string", 17, Type::String),
        Flavour::Proto3 => message
            .proto3_optional("optional_bool", 16, Type::Bool, None)
            .proto3_optional("optional_string", 17, Type::String, None),
    };
    message = message.scalar("in", 18, Type::Bool);

    message = message
        .oneof("nested_type", |m| {
            m.message("single_nested_message", 21, &nested_message)
                .enumeration("single_nested_enum", 22, &nested_enum)
        })
        .message("standalone_message", 23, &nested_message)
        .enumeration("standalone_enum", 24, &nested_enum);

    for (idx, (suffix, ty)) in SCALARS.iter().enumerate() {
        message = message.repeated_scalar(&format!("repeated_{suffix}"), idx as i32 + 31, *ty);
    }
    message = message
        .repeated_message("repeated_nested_message", 51, &nested_message)
        .repeated_enumeration("repeated_nested_enum", 52, &nested_enum)
        .repeated_scalar("repeated_string_piece", 53, Type::String)
        .repeated_scalar("repeated_cord", 54, Type::String)
        .repeated_message("repeated_lazy_message", 55, &nested_message);

    message = message.map(
        "map_int64_nested_type",
        62,
        &scope,
        Type::Int64,
        MapValueType::Message(&nested_test_all_types),
    );

    message = message
        .message("single_any", 100, ".google.protobuf.Any")
        .message("single_duration", 101, ".google.protobuf.Duration")
        .message("single_timestamp", 102, ".google.protobuf.Timestamp")
        .message("single_struct", 103, ".google.protobuf.Struct")
        .message("single_value", 104, ".google.protobuf.Value");
    for (idx, (suffix, type_name)) in WRAPPERS.iter().enumerate() {
        message = message.message(&format!("single_{suffix}_wrapper"), idx as i32 + 105, type_name);
    }
    message = message
        .message("list_value", 114, ".google.protobuf.ListValue")
        .enumeration("null_value", 115, NULL_VALUE);
    message = match flavour {
        Flavour::Proto2 => message.enumeration("optional_null_value", 116, NULL_VALUE),
        Flavour::Proto3 => {
            message.proto3_optional("optional_null_value", 116, Type::Enum, Some(NULL_VALUE))
        }
    };
    message = message
        .message("field_mask", 117, ".google.protobuf.FieldMask")
        .message("empty", 118, ".google.protobuf.Empty");

    message = message
        .repeated_message("repeated_any", 120, ".google.protobuf.Any")
        .repeated_message("repeated_duration", 121, ".google.protobuf.Duration")
        .repeated_message("repeated_timestamp", 122, ".google.protobuf.Timestamp")
        .repeated_message("repeated_struct", 123, ".google.protobuf.Struct")
        .repeated_message("repeated_value", 124, ".google.protobuf.Value");
    for (idx, (suffix, type_name)) in WRAPPERS.iter().enumerate() {
        message =
            message.repeated_message(&format!("repeated_{suffix}_wrapper"), idx as i32 + 125, type_name);
    }
    message = message
        .repeated_message("repeated_list_value", 134, ".google.protobuf.ListValue")
        .repeated_enumeration("repeated_null_value", 135, NULL_VALUE);

    let mut number = FIRST_MAP_FIELD;
    for (key_name, key) in MAP_KEYS {
        for (value_name, value) in map_values(&nested_message, &nested_enum) {
            let name = format!("map_{key_name}_{value_name}");
            message = message.map(&name, number, &scope, key, value);
            number += 1;
        }
    }

    message = message.oneof("kind", |m| {
        m.message("oneof_type", 400, &nested_test_all_types)
            .message("oneof_msg", 401, &nested_message)
            .scalar("oneof_bool", 402, Type::Bool)
    });

    let mut messages = vec![
        message.build(),
        Message::new("NestedTestAllTypes")
            .message("child", 1, &nested_test_all_types)
            .message("payload", 2, &test_all_types)
            .build(),
    ];
    if flavour == Flavour::Proto2 {
        messages.push(
            Message::new("TestRequired")
                .push(field("required_int32", 1, LABEL_REQUIRED, Type::Int32, None))
                .build(),
        );
    }

    let mut file = file(
        flavour.file_name(),
        package,
        &[
            "google/protobuf/any.proto",
            "google/protobuf/duration.proto",
            "google/protobuf/empty.proto",
            "google/protobuf/field_mask.proto",
            "google/protobuf/struct.proto",
            "google/protobuf/timestamp.proto",
            "google/protobuf/wrappers.proto",
        ],
        messages,
        vec![enumeration("GlobalEnum", &[("GOO", 0), ("GAR", 1), ("GAZ", 2)])],
    );
    if flavour == Flavour::Proto2 {
        file.syntax = Some("proto2".to_string());
    }
    file
}

/// Value types of the `map_<key>_<value>` fields, by name suffix.
fn map_values<'a>(nested_message: &'a str, nested_enum: &'a str) -> Vec<(&'static str, MapValueType<'a>)> {
    let mut values: Vec<(&'static str, MapValueType<'a>)> = vec![
        ("bool", MapValueType::Scalar(Type::Bool)),
        ("string", MapValueType::Scalar(Type::String)),
        ("bytes", MapValueType::Scalar(Type::Bytes)),
        ("int32", MapValueType::Scalar(Type::Int32)),
        ("int64", MapValueType::Scalar(Type::Int64)),
        ("uint32", MapValueType::Scalar(Type::Uint32)),
        ("uint64", MapValueType::Scalar(Type::Uint64)),
        ("float", MapValueType::Scalar(Type::Float)),
        ("double", MapValueType::Scalar(Type::Double)),
        ("enum", MapValueType::Enum(nested_enum)),
        ("message", MapValueType::Message(nested_message)),
        ("duration", MapValueType::Message(".google.protobuf.Duration")),
        ("timestamp", MapValueType::Message(".google.protobuf.Timestamp")),
        ("null_value", MapValueType::Enum(NULL_VALUE)),
        ("any", MapValueType::Message(".google.protobuf.Any")),
        ("struct", MapValueType::Message(".google.protobuf.Struct")),
        ("value", MapValueType::Message(".google.protobuf.Value")),
        ("list_value", MapValueType::Message(".google.protobuf.ListValue")),
    ];
    const WRAPPER_SUFFIXES: [&str; 9] = [
        "int64_wrapper",
        "int32_wrapper",
        "double_wrapper",
        "float_wrapper",
        "uint64_wrapper",
        "uint32_wrapper",
        "string_wrapper",
        "bool_wrapper",
        "bytes_wrapper",
    ];
    for (suffix, (_, type_name)) in WRAPPER_SUFFIXES.into_iter().zip(WRAPPERS) {
        values.push((suffix, MapValueType::Message(type_name)));
    }
    values
}
