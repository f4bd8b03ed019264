//! Decoder for the protobuf text format.
//!
//! ```text
//! name: "basic"
//! test {
//!   name: "eq_test"
//!   expr: "1 == 1"
//!   bindings { key: "x" value { value { int64_value: 1 } } }
//! }
//! ```
//!
//! Decoding is strict: unknown field names, a second value for a singular
//! field and a second member of a oneof are all errors. Only fields that
//! appear in the source are set on the resulting message.

mod error;
mod lexer;
mod parser;

use std::sync::Arc;

use protomon_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};

pub use error::{ParseError, ParseErrorKind, Position};

/// Bounds on the input a single document may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest accepted input, in bytes.
    pub max_input_bytes: usize,
    /// Deepest accepted nesting of message bodies.
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 64 * 1024 * 1024,
            max_depth: 100,
        }
    }
}

/// Decode `input` as the body of a `descriptor` message.
pub fn decode(
    pool: &DescriptorPool,
    descriptor: &Arc<MessageDescriptor>,
    input: &[u8],
    limits: &DecodeLimits,
) -> Result<DynamicMessage, ParseError> {
    if input.len() > limits.max_input_bytes {
        return Err(ParseError::new(
            ParseErrorKind::InputTooLarge {
                size: input.len(),
                limit: limits.max_input_bytes,
            },
            Position::start(),
        ));
    }
    parser::Parser::new(input, pool, limits).parse_document(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, SIMPLE_TEST_FILE};
    use bytes::Bytes;
    use protomon_reflect::codec::decode_message;
    use protomon_reflect::{MapKey, Value};

    fn decode_test_file(input: &str) -> Result<DynamicMessage, ParseError> {
        let pool = schema::builtin_pool().unwrap();
        let descriptor = pool.expect_message(SIMPLE_TEST_FILE).unwrap();
        decode(&pool, &descriptor, input.as_bytes(), &DecodeLimits::default())
    }

    fn decode_as(type_name: &str, input: &str) -> Result<DynamicMessage, ParseError> {
        let pool = schema::builtin_pool().unwrap();
        let descriptor = pool.expect_message(type_name).unwrap();
        decode(&pool, &descriptor, input.as_bytes(), &DecodeLimits::default())
    }

    fn first_test(file: &DynamicMessage) -> &DynamicMessage {
        file.get_field_by_name("test")
            .and_then(Value::as_list)
            .and_then(|tests| tests.first())
            .and_then(Value::as_message)
            .unwrap()
    }

    #[test]
    fn test_decode_basic() {
        let file = decode_test_file(
            r#"
            name: "basic"
            test { name: "eq_test" expr: "1 == 1" }
            "#,
        )
        .unwrap();
        assert_eq!(
            file.get_field_by_name("name"),
            Some(&Value::String("basic".into()))
        );
        let test = first_test(&file);
        let set: Vec<&str> = test.fields().map(|(field, _)| field.name()).collect();
        assert_eq!(set, vec!["name", "expr"]);
    }

    #[test]
    fn test_decode_separators_and_delimiters() {
        let file = decode_test_file(
            "name: 'a', description: \"b\" \"c\"; test < name: \"t\" >, test: { name: \"u\" }",
        )
        .unwrap();
        assert_eq!(
            file.get_field_by_name("description"),
            Some(&Value::String("bc".into()))
        );
        assert_eq!(
            file.get_field_by_name("test").and_then(Value::as_list).map(<[Value]>::len),
            Some(2)
        );
    }

    #[test]
    fn test_decode_oneof_and_nested_value() {
        let file = decode_test_file(
            r#"
            test {
              name: "ints"
              expr: "-1 + 2u"
              disable_check: true
              value: { int64_value: -1 }
            }
            "#,
        )
        .unwrap();
        let test = first_test(&file);
        assert_eq!(test.get_field_by_name("disable_check"), Some(&Value::Bool(true)));
        let value = test
            .get_field_by_name("value")
            .and_then(Value::as_message)
            .unwrap();
        assert_eq!(value.get_field_by_name("int64_value"), Some(&Value::I64(-1)));
    }

    #[test]
    fn test_decode_map_collapses_entries() {
        let file = decode_test_file(
            r#"
            test {
              bindings { key: "y" value { value { string_value: "first" } } }
              bindings { key: "x" value { value { bool_value: true } } }
              bindings { key: "y" value { value { string_value: "second" } } }
              bindings [{ key: "z" }]
            }
            "#,
        )
        .unwrap();
        let bindings = first_test(&file)
            .get_field_by_name("bindings")
            .and_then(Value::as_map)
            .unwrap();
        let keys: Vec<String> = bindings.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["y", "x", "z"]);

        let y = bindings
            .get(&MapKey::String("y".into()))
            .and_then(Value::as_message)
            .and_then(|expr| expr.get_field_by_name("value"))
            .and_then(Value::as_message)
            .and_then(|value| value.get_field_by_name("string_value"));
        assert_eq!(y, Some(&Value::String("second".into())));

        // An entry without a value holds the empty message.
        let z = bindings.get(&MapKey::String("z".into())).and_then(Value::as_message);
        assert!(z.is_some_and(DynamicMessage::is_empty));
    }

    #[test]
    fn test_decode_scalars() {
        let value = decode_as("cel.expr.Value", "uint64_value: 0xFFFFFFFFFFFFFFFF").unwrap();
        assert_eq!(value.get_field_by_name("uint64_value"), Some(&Value::U64(u64::MAX)));

        let value = decode_as("cel.expr.Value", "double_value: -inf").unwrap();
        assert_eq!(
            value.get_field_by_name("double_value"),
            Some(&Value::F64(f64::NEG_INFINITY))
        );

        let value = decode_as("cel.expr.Value", "double_value: 1.5e3").unwrap();
        assert_eq!(value.get_field_by_name("double_value"), Some(&Value::F64(1500.0)));

        let value = decode_as("cel.expr.Value", r#"bytes_value: "\000\xff""#).unwrap();
        assert_eq!(
            value.get_field_by_name("bytes_value"),
            Some(&Value::Bytes(Bytes::from_static(&[0, 0xff])))
        );

        let value = decode_as("cel.expr.Value", "null_value: NULL_VALUE").unwrap();
        assert_eq!(value.get_field_by_name("null_value"), Some(&Value::EnumNumber(0)));

        let status = decode_as("cel.expr.Status", "code: 010").unwrap();
        assert_eq!(status.get_field_by_name("code"), Some(&Value::I32(8)));

        let unknown = decode_as("cel.expr.UnknownSet", "exprs: [1, -2] exprs: 3").unwrap();
        assert_eq!(
            unknown.get_field_by_name("exprs"),
            Some(&Value::List(vec![Value::I64(1), Value::I64(-2), Value::I64(3)]))
        );
    }

    #[test]
    fn test_decode_any_expansion() {
        let pool = schema::builtin_pool().unwrap();
        let value = decode_as(
            "cel.expr.Value",
            r#"object_value { [type.googleapis.com/google.protobuf.Duration] { seconds: 5 } }"#,
        )
        .unwrap();
        let any = value
            .get_field_by_name("object_value")
            .and_then(Value::as_message)
            .unwrap();
        assert_eq!(
            any.get_field_by_name("type_url"),
            Some(&Value::String("type.googleapis.com/google.protobuf.Duration".into()))
        );
        let Some(Value::Bytes(payload)) = any.get_field_by_name("value") else {
            panic!("Any payload missing");
        };
        let duration = pool.expect_message("google.protobuf.Duration").unwrap();
        let decoded = decode_message(&pool, &duration, payload).unwrap();
        assert_eq!(decoded.get_field_by_name("seconds"), Some(&Value::I64(5)));
    }

    #[test]
    fn test_unknown_field() {
        let err = decode_test_file("name: \"x\"\nbogus: 1").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownField {
                message: SIMPLE_TEST_FILE.to_string(),
                field: "bogus".to_string(),
            }
        );
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_unterminated_body() {
        let err = decode_test_file("test { expr: \"1 ==\" ").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnterminatedBody {
                field: "test".to_string(),
                open_line: 1,
                close: '}',
            }
        );
        assert_eq!(err.offset, 20);
    }

    #[test]
    fn test_duplicate_singular_field() {
        let err = decode_test_file("name: \"a\" name: \"b\"").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateField("name".to_string()));
        assert_eq!(err.offset, 10);
    }

    #[test]
    fn test_second_oneof_member() {
        let err = decode_test_file(
            "test { value { bool_value: true } eval_error { } }",
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::OneofAlreadySet {
                oneof: "result_matcher".to_string(),
                field: "eval_error".to_string(),
                previous: "value".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_literals() {
        let err = decode_as("cel.expr.Value", "int64_value: 1.5").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidLiteral { .. }));

        let err = decode_as("cel.expr.Status", "code: 2147483648").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::IntegerOutOfRange { .. }));

        let err = decode_as("cel.expr.Value", "uint64_value: -1").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::IntegerOutOfRange { .. }));

        let err = decode_as("cel.expr.Value", "bool_value: yes").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidLiteral { kind: "bool", .. }));

        let err = decode_as("cel.expr.Value", "null_value: NOT_NULL").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownEnumValue { .. }));

        let err = decode_as("cel.expr.Value", r#"string_value: "\xff""#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidUtf8("string_value".to_string()));

        // A scalar field needs its colon.
        let err = decode_as("cel.expr.Value", "bool_value true").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn test_extensions_and_any_types() {
        let err = decode_test_file("[ext.field]: 1").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnsupportedExtension("ext.field".to_string())
        );

        let err = decode_as(
            "google.protobuf.Any",
            "[type.googleapis.com/no.Such] {}",
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownAnyType("type.googleapis.com/no.Such".to_string())
        );
    }

    #[test]
    fn test_limits() {
        let pool = schema::builtin_pool().unwrap();
        let descriptor = pool.expect_message("cel.expr.ListValue").unwrap();
        let limits = DecodeLimits {
            max_input_bytes: 1024,
            max_depth: 3,
        };

        let nested = "values { list_value { values { list_value { } } } }";
        let err = decode(&pool, &descriptor, nested.as_bytes(), &limits).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep(3));

        let huge = vec![b' '; 2048];
        let err = decode(&pool, &descriptor, &huge, &limits).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::InputTooLarge {
                size: 2048,
                limit: 1024
            }
        );
    }
}
