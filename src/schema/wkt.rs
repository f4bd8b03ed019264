//! `google.protobuf` well-known types.

use protomon_reflect::descriptor::{FileDescriptorProto, Type};

use super::{enumeration, file, MapValueType, Message};

pub(super) fn files() -> Vec<FileDescriptorProto> {
    let wrappers = [
        ("DoubleValue", Type::Double),
        ("FloatValue", Type::Float),
        ("Int64Value", Type::Int64),
        ("UInt64Value", Type::Uint64),
        ("Int32Value", Type::Int32),
        ("UInt32Value", Type::Uint32),
        ("BoolValue", Type::Bool),
        ("StringValue", Type::String),
        ("BytesValue", Type::Bytes),
    ]
    .into_iter()
    .map(|(name, ty)| Message::new(name).scalar("value", 1, ty).build())
    .collect();

    vec![
        file(
            "google/protobuf/any.proto",
            "google.protobuf",
            &[],
            vec![Message::new("Any")
                .scalar("type_url", 1, Type::String)
                .scalar("value", 2, Type::Bytes)
                .build()],
            vec![],
        ),
        file(
            "google/protobuf/duration.proto",
            "google.protobuf",
            &[],
            vec![Message::new("Duration")
                .scalar("seconds", 1, Type::Int64)
                .scalar("nanos", 2, Type::Int32)
                .build()],
            vec![],
        ),
        file(
            "google/protobuf/timestamp.proto",
            "google.protobuf",
            &[],
            vec![Message::new("Timestamp")
                .scalar("seconds", 1, Type::Int64)
                .scalar("nanos", 2, Type::Int32)
                .build()],
            vec![],
        ),
        file("google/protobuf/wrappers.proto", "google.protobuf", &[], wrappers, vec![]),
        file(
            "google/protobuf/empty.proto",
            "google.protobuf",
            &[],
            vec![Message::new("Empty").build()],
            vec![],
        ),
        file(
            "google/protobuf/field_mask.proto",
            "google.protobuf",
            &[],
            vec![Message::new("FieldMask")
                .repeated_scalar("paths", 1, Type::String)
                .build()],
            vec![],
        ),
        file(
            "google/protobuf/struct.proto",
            "google.protobuf",
            &[],
            vec![
                Message::new("Struct")
                    .map(
                        "fields",
                        1,
                        "google.protobuf.Struct",
                        Type::String,
                        MapValueType::Message(".google.protobuf.Value"),
                    )
                    .build(),
                Message::new("Value")
                    .oneof("kind", |m| {
                        m.enumeration("null_value", 1, ".google.protobuf.NullValue")
                            .scalar("number_value", 2, Type::Double)
                            .scalar("string_value", 3, Type::String)
                            .scalar("bool_value", 4, Type::Bool)
                            .message("struct_value", 5, ".google.protobuf.Struct")
                            .message("list_value", 6, ".google.protobuf.ListValue")
                    })
                    .build(),
                Message::new("ListValue")
                    .repeated_message("values", 1, ".google.protobuf.Value")
                    .build(),
            ],
            vec![enumeration("NullValue", &[("NULL_VALUE", 0)])],
        ),
    ]
}
