//! Integration tests for pool resolution, dynamic messages and the binary codec.

use bytes::Bytes;
use protomon_reflect::codec::{decode_message, encode_message};
use protomon_reflect::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, OneofDescriptorProto, Type,
};
use protomon_reflect::{
    Cardinality, DescriptorPool, DynamicMessage, Error, MapKey, MapValue, Value,
};

const OPTIONAL: i32 = 1;
const REPEATED: i32 = 3;

fn field(name: &str, number: i32, label: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, label: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, label, ty)
    }
}

/// package demo;
/// enum Color { RED = 0; GREEN = 1; }
/// message Inner { int64 id = 1; }
/// message Outer {
///   string name = 1;
///   repeated sint32 deltas = 2;
///   map<string, Inner> children = 3;
///   oneof choice { Inner inner = 4; bool flag = 5; }
///   Color color = 6;
///   repeated string tags = 7;
///   Inner single = 8;
/// }
fn demo_pool() -> DescriptorPool {
    let entry = DescriptorProto {
        name: Some("ChildrenEntry".to_string()),
        field: vec![
            field("key", 1, OPTIONAL, Type::String),
            typed("value", 2, OPTIONAL, Type::Message, ".demo.Inner"),
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
        }),
        ..Default::default()
    };
    let mut inner_choice = typed("inner", 4, OPTIONAL, Type::Message, ".demo.Inner");
    inner_choice.oneof_index = Some(0);
    let mut flag = field("flag", 5, OPTIONAL, Type::Bool);
    flag.oneof_index = Some(0);

    let outer = DescriptorProto {
        name: Some("Outer".to_string()),
        field: vec![
            field("name", 1, OPTIONAL, Type::String),
            field("deltas", 2, REPEATED, Type::Sint32),
            typed("children", 3, REPEATED, Type::Message, ".demo.Outer.ChildrenEntry"),
            inner_choice,
            flag,
            typed("color", 6, OPTIONAL, Type::Enum, ".demo.Color"),
            field("tags", 7, REPEATED, Type::String),
            typed("single", 8, OPTIONAL, Type::Message, ".demo.Inner"),
        ],
        nested_type: vec![entry],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("choice".to_string()),
        }],
        ..Default::default()
    };
    let inner = DescriptorProto {
        name: Some("Inner".to_string()),
        field: vec![field("id", 1, OPTIONAL, Type::Int64)],
        ..Default::default()
    };
    let color = EnumDescriptorProto {
        name: Some("Color".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("RED".to_string()),
                number: Some(0),
            },
            EnumValueDescriptorProto {
                name: Some("GREEN".to_string()),
                number: Some(1),
            },
        ],
    };

    let mut pool = DescriptorPool::new();
    pool.add_file(FileDescriptorProto {
        name: Some("demo.proto".to_string()),
        package: Some("demo".to_string()),
        message_type: vec![inner, outer],
        enum_type: vec![color],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    })
    .unwrap();
    pool
}

fn inner(pool: &DescriptorPool, id: i64) -> DynamicMessage {
    let mut msg = DynamicMessage::new(pool.expect_message("demo.Inner").unwrap());
    msg.set_field_by_name("id", Value::I64(id)).unwrap();
    msg
}

#[test]
fn test_pool_resolves_fields() {
    let pool = demo_pool();
    let outer = pool.expect_message(".demo.Outer").unwrap();

    let children = outer.get_field_by_name("children").unwrap();
    assert_eq!(children.cardinality(), Cardinality::Map);
    assert_eq!(children.json_name(), "children");
    let entry = children.map_entry().unwrap();
    assert_eq!(entry.value.type_name(), Some("demo.Inner"));

    let deltas = outer.get_field(2).unwrap();
    assert!(deltas.is_list());
    assert!(deltas.is_packed());
    assert!(!outer.get_field(7).unwrap().is_packed());

    assert_eq!(outer.oneofs().len(), 1);
    assert!(!outer.oneofs()[0].is_synthetic());
    assert!(pool.get_enum("demo.Color").is_some());
    assert!(pool.get_message("demo.Missing").is_none());
}

#[test]
fn test_pool_rejects_duplicate_type() {
    let mut pool = demo_pool();
    let again = FileDescriptorProto {
        name: Some("other.proto".to_string()),
        package: Some("demo".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Inner".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    assert_eq!(
        pool.add_file(again),
        Err(Error::DuplicateType("demo.Inner".to_string()))
    );
}

#[test]
fn test_pool_rejects_unresolved_reference() {
    let broken = FileDescriptorProto {
        name: Some("broken.proto".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Broken".to_string()),
            field: vec![typed("missing", 1, OPTIONAL, Type::Message, ".nowhere.Gone")],
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut pool = DescriptorPool::new();
    assert!(matches!(
        pool.add_file(broken),
        Err(Error::UnresolvedType { .. })
    ));
    // A failed add leaves the pool untouched.
    assert!(pool.file_names().is_empty());
    assert!(pool.get_message("Broken").is_none());
}

#[test]
fn test_pool_skips_already_registered_file() {
    let mut pool = demo_pool();
    let same = FileDescriptorProto {
        name: Some("demo.proto".to_string()),
        package: Some("demo".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Inner".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    pool.add_file(same).unwrap();
    assert_eq!(pool.file_names(), &["demo.proto".to_string()]);
}

/// Add a file holding just `message` to an empty pool.
fn add_message(message: DescriptorProto) -> Result<DescriptorPool, Error> {
    let mut pool = DescriptorPool::new();
    pool.add_file(FileDescriptorProto {
        name: Some("broken.proto".to_string()),
        message_type: vec![message],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    })?;
    Ok(pool)
}

fn broken(field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some("Broken".to_string()),
        field,
        ..Default::default()
    }
}

#[test]
fn test_pool_rejects_duplicate_field_name() {
    let message = broken(vec![
        field("id", 1, OPTIONAL, Type::Int64),
        field("id", 2, OPTIONAL, Type::String),
    ]);
    assert_eq!(
        add_message(message).unwrap_err(),
        Error::DuplicateField {
            message: "Broken".to_string(),
            field: "id".to_string(),
        }
    );
}

#[test]
fn test_pool_rejects_duplicate_field_number() {
    let message = broken(vec![
        field("first", 3, OPTIONAL, Type::Int64),
        field("second", 3, OPTIONAL, Type::Bool),
    ]);
    assert_eq!(
        add_message(message).unwrap_err(),
        Error::DuplicateFieldNumber {
            message: "Broken".to_string(),
            number: 3,
        }
    );
}

#[test]
fn test_pool_rejects_invalid_oneof_index() {
    let mut member = field("flag", 1, OPTIONAL, Type::Bool);
    member.oneof_index = Some(1);
    let message = DescriptorProto {
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("choice".to_string()),
        }],
        ..broken(vec![member])
    };
    assert_eq!(
        add_message(message).unwrap_err(),
        Error::InvalidOneofIndex {
            message: "Broken".to_string(),
            field: "flag".to_string(),
            index: 1,
        }
    );

    let mut negative = field("flag", 1, OPTIONAL, Type::Bool);
    negative.oneof_index = Some(-1);
    assert!(matches!(
        add_message(broken(vec![negative])),
        Err(Error::InvalidOneofIndex { index: -1, .. })
    ));
}

#[test]
fn test_pool_rejects_invalid_field_number() {
    assert_eq!(
        add_message(broken(vec![field("zero", 0, OPTIONAL, Type::Bool)])).unwrap_err(),
        Error::InvalidFieldNumber(0)
    );
    assert_eq!(
        add_message(broken(vec![field("huge", 1 << 29, OPTIONAL, Type::Bool)])).unwrap_err(),
        Error::InvalidFieldNumber(1 << 29)
    );
    // The largest valid number is accepted.
    add_message(broken(vec![field("max", (1 << 29) - 1, OPTIONAL, Type::Bool)])).unwrap();
}

#[test]
fn test_pool_rejects_invalid_map_entry() {
    let entry = |value: Vec<FieldDescriptorProto>| DescriptorProto {
        name: Some("ValuesEntry".to_string()),
        field: value,
        options: Some(MessageOptions {
            map_entry: Some(true),
        }),
        ..Default::default()
    };
    let with_entry = |entry: DescriptorProto| DescriptorProto {
        nested_type: vec![entry],
        ..broken(vec![typed("values", 1, REPEATED, Type::Message, ".Broken.ValuesEntry")])
    };

    // No value field.
    let missing_value = entry(vec![field("key", 1, OPTIONAL, Type::String)]);
    assert_eq!(
        add_message(with_entry(missing_value)).unwrap_err(),
        Error::InvalidMapEntry("Broken.ValuesEntry".to_string())
    );

    // Floating point keys are not allowed.
    let double_key = entry(vec![
        field("key", 1, OPTIONAL, Type::Double),
        field("value", 2, OPTIONAL, Type::String),
    ]);
    assert_eq!(
        add_message(with_entry(double_key)).unwrap_err(),
        Error::InvalidMapEntry("Broken.ValuesEntry".to_string())
    );

    let valid = entry(vec![
        field("key", 1, OPTIONAL, Type::Int32),
        field("value", 2, OPTIONAL, Type::String),
    ]);
    let pool = add_message(with_entry(valid)).unwrap();
    let values = pool.expect_message("Broken").unwrap();
    assert!(values.get_field_by_name("values").unwrap().is_map());
}

#[test]
fn test_pool_rejects_group() {
    let message = broken(vec![typed("legacy", 1, OPTIONAL, Type::Group, ".Broken")]);
    assert_eq!(
        add_message(message).unwrap_err(),
        Error::UnsupportedGroup("Broken.legacy".to_string())
    );
}

#[test]
fn test_set_field_type_checked() {
    let pool = demo_pool();
    let mut outer = DynamicMessage::new(pool.expect_message("demo.Outer").unwrap());

    let err = outer
        .set_field_by_name("name", Value::I32(3))
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { found: "i32", .. }));

    let err = outer
        .set_field_by_name("nope", Value::Bool(true))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownField { .. }));

    // A message of the wrong type is rejected too.
    let wrong = DynamicMessage::new(pool.expect_message("demo.Outer").unwrap());
    assert!(outer
        .set_field_by_name("single", Value::Message(wrong))
        .is_err());
    assert!(outer.is_empty());
}

#[test]
fn test_oneof_members_exclusive() {
    let pool = demo_pool();
    let descriptor = pool.expect_message("demo.Outer").unwrap();
    let mut outer = DynamicMessage::new(descriptor.clone());

    outer
        .set_field_by_name("inner", Value::Message(inner(&pool, 1)))
        .unwrap();
    outer.set_field_by_name("flag", Value::Bool(true)).unwrap();

    let oneof = &descriptor.oneofs()[0];
    assert_eq!(outer.oneof_case(oneof).map(|f| f.name()), Some("flag"));
    assert!(outer.get_field_by_name("inner").is_none());
}

#[test]
fn test_map_insert_replaces_in_place() {
    let pool = demo_pool();
    let descriptor = pool.expect_message("demo.Outer").unwrap();
    let children = descriptor.get_field_by_name("children").unwrap();
    let mut outer = DynamicMessage::new(descriptor.clone());

    for (key, id) in [("b", 1), ("a", 2), ("b", 3)] {
        outer
            .insert_map_entry(
                children,
                MapKey::String(key.to_string()),
                Value::Message(inner(&pool, id)),
            )
            .unwrap();
    }

    let map = outer.get_field(children).and_then(Value::as_map).unwrap();
    let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert_eq!(
        map.get(&MapKey::String("b".to_string())),
        Some(&Value::Message(inner(&pool, 3)))
    );

    // Equality ignores insertion order.
    let mut entries: Vec<(MapKey, Value)> =
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    entries.reverse();
    let reversed: MapValue = entries.into_iter().collect();
    assert_eq!(&reversed, map);
}

#[test]
fn test_default_for_field() {
    let pool = demo_pool();
    let outer = pool.expect_message("demo.Outer").unwrap();
    let value = |name: &str| Value::default_for_field(outer.get_field_by_name(name).unwrap(), &pool);

    assert_eq!(value("name").unwrap(), Value::String(String::new()));
    assert_eq!(value("deltas").unwrap(), Value::List(Vec::new()));
    assert_eq!(value("children").unwrap(), Value::Map(MapValue::new()));
    assert_eq!(value("color").unwrap(), Value::EnumNumber(0));
}

#[test]
fn test_codec_roundtrip() {
    let pool = demo_pool();
    let descriptor = pool.expect_message("demo.Outer").unwrap();
    let mut outer = DynamicMessage::new(descriptor.clone());

    outer
        .set_field_by_name("name", Value::String("outer".to_string()))
        .unwrap();
    outer
        .set_field_by_name(
            "deltas",
            Value::List(vec![Value::I32(-1), Value::I32(0), Value::I32(150)]),
        )
        .unwrap();
    outer
        .set_field_by_name(
            "children",
            Value::Map(
                [
                    (MapKey::String("x".to_string()), Value::Message(inner(&pool, -7))),
                    (MapKey::String("y".to_string()), Value::Message(inner(&pool, 0))),
                ]
                .into_iter()
                .collect(),
            ),
        )
        .unwrap();
    outer.set_field_by_name("flag", Value::Bool(true)).unwrap();
    outer.set_field_by_name("color", Value::EnumNumber(1)).unwrap();
    outer
        .set_field_by_name(
            "tags",
            Value::List(vec![Value::String("a".into()), Value::String("b".into())]),
        )
        .unwrap();

    let bytes = encode_message(&outer);
    let decoded = decode_message(&pool, &descriptor, &bytes).unwrap();
    assert_eq!(decoded, outer);
}

#[test]
fn test_decode_known_bytes() {
    let pool = demo_pool();
    let descriptor = pool.expect_message("demo.Inner").unwrap();

    // id = 150
    let decoded = decode_message(&pool, &descriptor, &[0x08, 0x96, 0x01]).unwrap();
    assert_eq!(decoded.get_field_by_name("id"), Some(&Value::I64(150)));

    // Unknown field 9 (varint) is skipped.
    let decoded = decode_message(&pool, &descriptor, &[0x48, 0x01, 0x08, 0x02]).unwrap();
    assert_eq!(decoded.get_field_by_name("id"), Some(&Value::I64(2)));

    // Field 1 with a length-delimited wire type is malformed.
    let err = decode_message(&pool, &descriptor, &[0x0A, 0x00]).unwrap_err();
    assert!(matches!(err, Error::WireTypeMismatch { .. }));
}

#[test]
fn test_decode_merges_repeated_singular_message() {
    let pool = demo_pool();
    let descriptor = pool.expect_message("demo.Outer").unwrap();

    // single { id: 1 } then single {} again: the second occurrence merges.
    let bytes = [0x42, 0x02, 0x08, 0x01, 0x42, 0x00];
    let decoded = decode_message(&pool, &descriptor, &bytes).unwrap();
    assert_eq!(
        decoded.get_field_by_name("single"),
        Some(&Value::Message(inner(&pool, 1)))
    );
}

#[test]
fn test_decode_unpacked_repeated_scalars() {
    let pool = demo_pool();
    let descriptor = pool.expect_message("demo.Outer").unwrap();

    // deltas written one varint record at a time: zigzag(1) = 2, zigzag(-2) = 3.
    let decoded = decode_message(&pool, &descriptor, &[0x10, 0x02, 0x10, 0x03]).unwrap();
    assert_eq!(
        decoded.get_field_by_name("deltas"),
        Some(&Value::List(vec![Value::I32(1), Value::I32(-2)]))
    );
}

#[test]
fn test_bytes_value_kind() {
    assert!(Value::Bytes(Bytes::from_static(b"x"))
        .matches_kind(protomon_reflect::Kind::Bytes, None));
    assert!(!Value::String("x".into()).matches_kind(protomon_reflect::Kind::Bytes, None));
}
