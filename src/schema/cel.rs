//! `cel.expr` value, checked and eval types plus the conformance test files.

use protomon_reflect::descriptor::{FileDescriptorProto, Type};

use super::{enumeration, file, MapValueType, Message};

pub(super) fn files() -> Vec<FileDescriptorProto> {
    vec![value(), syntax(), checked(), eval(), simple()]
}

fn value() -> FileDescriptorProto {
    file(
        "cel/expr/value.proto",
        "cel.expr",
        &["google/protobuf/any.proto", "google/protobuf/struct.proto"],
        vec![
            Message::new("Value")
                .oneof("kind", |m| {
                    m.enumeration("null_value", 1, ".google.protobuf.NullValue")
                        .scalar("bool_value", 2, Type::Bool)
                        .scalar("int64_value", 3, Type::Int64)
                        .scalar("uint64_value", 4, Type::Uint64)
                        .scalar("double_value", 5, Type::Double)
                        .scalar("string_value", 6, Type::String)
                        .scalar("bytes_value", 7, Type::Bytes)
                        .message("enum_value", 9, ".cel.expr.EnumValue")
                        .message("object_value", 10, ".google.protobuf.Any")
                        .message("map_value", 11, ".cel.expr.MapValue")
                        .message("list_value", 12, ".cel.expr.ListValue")
                        .scalar("type_value", 15, Type::String)
                })
                .build(),
            Message::new("EnumValue")
                .scalar("type", 1, Type::String)
                .scalar("value", 2, Type::Int32)
                .build(),
            Message::new("ListValue")
                .repeated_message("values", 1, ".cel.expr.Value")
                .build(),
            Message::new("MapValue")
                .nested(
                    Message::new("Entry")
                        .message("key", 1, ".cel.expr.Value")
                        .message("value", 2, ".cel.expr.Value"),
                )
                .repeated_message("entries", 1, ".cel.expr.MapValue.Entry")
                .build(),
        ],
        vec![],
    )
}

fn syntax() -> FileDescriptorProto {
    file(
        "cel/expr/syntax.proto",
        "cel.expr",
        &[
            "google/protobuf/duration.proto",
            "google/protobuf/struct.proto",
            "google/protobuf/timestamp.proto",
        ],
        vec![Message::new("Constant")
            .oneof("constant_kind", |m| {
                m.enumeration("null_value", 1, ".google.protobuf.NullValue")
                    .scalar("bool_value", 2, Type::Bool)
                    .scalar("int64_value", 3, Type::Int64)
                    .scalar("uint64_value", 4, Type::Uint64)
                    .scalar("double_value", 5, Type::Double)
                    .scalar("string_value", 6, Type::String)
                    .scalar("bytes_value", 7, Type::Bytes)
                    .message("duration_value", 8, ".google.protobuf.Duration")
                    .message("timestamp_value", 9, ".google.protobuf.Timestamp")
            })
            .build()],
        vec![],
    )
}

fn checked() -> FileDescriptorProto {
    let primitive = enumeration(
        "PrimitiveType",
        &[
            ("PRIMITIVE_TYPE_UNSPECIFIED", 0),
            ("BOOL", 1),
            ("INT64", 2),
            ("UINT64", 3),
            ("DOUBLE", 4),
            ("STRING", 5),
            ("BYTES", 6),
        ],
    );
    let well_known = enumeration(
        "WellKnownType",
        &[
            ("WELL_KNOWN_TYPE_UNSPECIFIED", 0),
            ("ANY", 1),
            ("TIMESTAMP", 2),
            ("DURATION", 3),
        ],
    );

    let ty = Message::new("Type")
        .nested(Message::new("ListType").message("elem_type", 1, ".cel.expr.Type"))
        .nested(
            Message::new("MapType")
                .message("key_type", 1, ".cel.expr.Type")
                .message("value_type", 2, ".cel.expr.Type"),
        )
        .nested(
            Message::new("FunctionType")
                .message("result_type", 1, ".cel.expr.Type")
                .repeated_message("arg_types", 2, ".cel.expr.Type"),
        )
        .nested(
            Message::new("AbstractType")
                .scalar("name", 1, Type::String)
                .repeated_message("parameter_types", 2, ".cel.expr.Type"),
        )
        .nested_enum(primitive)
        .nested_enum(well_known)
        .oneof("type_kind", |m| {
            m.message("dyn", 1, ".google.protobuf.Empty")
                .enumeration("null", 2, ".google.protobuf.NullValue")
                .enumeration("primitive", 3, ".cel.expr.Type.PrimitiveType")
                .enumeration("wrapper", 4, ".cel.expr.Type.PrimitiveType")
                .enumeration("well_known", 5, ".cel.expr.Type.WellKnownType")
                .message("list_type", 6, ".cel.expr.Type.ListType")
                .message("map_type", 7, ".cel.expr.Type.MapType")
                .message("function", 8, ".cel.expr.Type.FunctionType")
                .scalar("message_type", 9, Type::String)
                .scalar("type_param", 10, Type::String)
                .message("type", 11, ".cel.expr.Type")
                .message("error", 12, ".google.protobuf.Empty")
                .message("abstract_type", 14, ".cel.expr.Type.AbstractType")
        })
        .build();

    let overload = Message::new("Overload")
        .scalar("overload_id", 1, Type::String)
        .repeated_message("params", 2, ".cel.expr.Type")
        .repeated_scalar("type_params", 3, Type::String)
        .message("result_type", 4, ".cel.expr.Type")
        .scalar("is_instance_function", 5, Type::Bool)
        .scalar("doc", 6, Type::String);
    let decl = Message::new("Decl")
        .nested(
            Message::new("IdentDecl")
                .message("type", 1, ".cel.expr.Type")
                .message("value", 2, ".cel.expr.Constant")
                .scalar("doc", 3, Type::String),
        )
        .nested(
            Message::new("FunctionDecl")
                .nested(overload)
                .repeated_message("overloads", 1, ".cel.expr.Decl.FunctionDecl.Overload")
                .scalar("doc", 2, Type::String),
        )
        .scalar("name", 1, Type::String)
        .oneof("decl_kind", |m| {
            m.message("ident", 2, ".cel.expr.Decl.IdentDecl")
                .message("function", 3, ".cel.expr.Decl.FunctionDecl")
        })
        .build();

    file(
        "cel/expr/checked.proto",
        "cel.expr",
        &[
            "cel/expr/syntax.proto",
            "google/protobuf/empty.proto",
            "google/protobuf/struct.proto",
        ],
        vec![ty, decl],
        vec![],
    )
}

fn eval() -> FileDescriptorProto {
    file(
        "cel/expr/eval.proto",
        "cel.expr",
        &["google/protobuf/any.proto", "cel/expr/value.proto"],
        vec![
            Message::new("ExprValue")
                .oneof("kind", |m| {
                    m.message("value", 1, ".cel.expr.Value")
                        .message("error", 2, ".cel.expr.ErrorSet")
                        .message("unknown", 3, ".cel.expr.UnknownSet")
                })
                .build(),
            Message::new("ErrorSet")
                .repeated_message("errors", 1, ".cel.expr.Status")
                .build(),
            Message::new("Status")
                .scalar("code", 1, Type::Int32)
                .scalar("message", 2, Type::String)
                .repeated_message("details", 3, ".google.protobuf.Any")
                .build(),
            Message::new("UnknownSet")
                .repeated_scalar("exprs", 1, Type::Int64)
                .build(),
        ],
        vec![],
    )
}

fn simple() -> FileDescriptorProto {
    const PACKAGE: &str = "cel.expr.conformance.test";

    file(
        "cel/expr/conformance/test/simple.proto",
        PACKAGE,
        &[
            "cel/expr/checked.proto",
            "cel/expr/eval.proto",
            "cel/expr/value.proto",
        ],
        vec![
            Message::new("SimpleTestFile")
                .scalar("name", 1, Type::String)
                .scalar("description", 2, Type::String)
                .repeated_message("section", 3, ".cel.expr.conformance.test.SimpleTestSection")
                .repeated_message("test", 4, ".cel.expr.conformance.test.SimpleTest")
                .build(),
            Message::new("SimpleTestSection")
                .scalar("name", 1, Type::String)
                .scalar("description", 2, Type::String)
                .repeated_message("test", 3, ".cel.expr.conformance.test.SimpleTest")
                .build(),
            Message::new("SimpleTest")
                .scalar("name", 1, Type::String)
                .scalar("description", 2, Type::String)
                .scalar("expr", 3, Type::String)
                .scalar("disable_macros", 4, Type::Bool)
                .scalar("disable_check", 5, Type::Bool)
                .scalar("check_only", 15, Type::Bool)
                .repeated_message("type_env", 6, ".cel.expr.Decl")
                .scalar("container", 13, Type::String)
                .scalar("locale", 14, Type::String)
                .map(
                    "bindings",
                    7,
                    "cel.expr.conformance.test.SimpleTest",
                    Type::String,
                    MapValueType::Message(".cel.expr.ExprValue"),
                )
                .oneof("result_matcher", |m| {
                    m.message("value", 8, ".cel.expr.Value")
                        .message("typed_result", 16, ".cel.expr.conformance.test.TypedResult")
                        .message("eval_error", 9, ".cel.expr.ErrorSet")
                        .message(
                            "any_eval_errors",
                            10,
                            ".cel.expr.conformance.test.ErrorSetMatcher",
                        )
                        .message("unknown", 11, ".cel.expr.UnknownSet")
                        .message(
                            "any_unknowns",
                            12,
                            ".cel.expr.conformance.test.UnknownSetMatcher",
                        )
                })
                .build(),
            Message::new("TypedResult")
                .message("result", 1, ".cel.expr.Value")
                .message("deduced_type", 2, ".cel.expr.Type")
                .build(),
            Message::new("ErrorSetMatcher")
                .repeated_message("errors", 1, ".cel.expr.ErrorSet")
                .build(),
            Message::new("UnknownSetMatcher")
                .repeated_message("unknowns", 1, ".cel.expr.UnknownSet")
                .build(),
        ],
        vec![],
    )
}
