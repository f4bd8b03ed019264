//! Canonical proto3 JSON encoding of dynamic messages.
//!
//! Only fields that are set on a message are written, in schema declaration
//! order, under their camelCase JSON names. A set oneof member is written as
//! a plain field. Well-known types use their special JSON forms.

mod error;
mod wkt;

use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use protomon_reflect::{Cardinality, DescriptorPool, DynamicMessage, FieldDescriptor, Kind, Value};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value as Json};

pub use error::EncodeError;

/// Formatting switches for [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Pretty-print with one field per line.
    pub multiline: bool,
    /// Indentation unit used when `multiline` is set.
    pub indent: String,
    /// Use the schema's field names instead of their camelCase JSON names.
    pub use_proto_names: bool,
    /// Write unset fields with their default values. Oneof members are never
    /// written when unset.
    pub emit_unpopulated: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            multiline: true,
            indent: "  ".to_string(),
            use_proto_names: false,
            emit_unpopulated: false,
        }
    }
}

/// Encode `message` as JSON text.
pub fn encode(
    pool: &DescriptorPool,
    message: &DynamicMessage,
    options: &EncodeOptions,
) -> Result<String, EncodeError> {
    let value = to_json_value(pool, message, options)?;
    if !options.multiline {
        return Ok(serde_json::to_string(&value)?);
    }

    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(options.indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Convert `message` into a [`serde_json::Value`] tree.
pub fn to_json_value(
    pool: &DescriptorPool,
    message: &DynamicMessage,
    options: &EncodeOptions,
) -> Result<Json, EncodeError> {
    Encoder {
        pool,
        options,
        path: Vec::new(),
    }
    .message(message)
}

enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

struct Encoder<'a> {
    pool: &'a DescriptorPool,
    options: &'a EncodeOptions,
    path: Vec<Segment>,
}

impl Encoder<'_> {
    /// The current location, e.g. `test[0].bindings["x"]`.
    fn path(&self) -> String {
        if self.path.is_empty() {
            return "(root)".to_string();
        }
        let mut out = String::new();
        for segment in &self.path {
            // Writing to a String never fails.
            let _ = match segment {
                Segment::Field(name) if out.is_empty() => write!(out, "{name}"),
                Segment::Field(name) => write!(out, ".{name}"),
                Segment::Index(idx) => write!(out, "[{idx}]"),
                Segment::Key(key) => write!(out, "[{key:?}]"),
            };
        }
        out
    }

    fn message(&mut self, message: &DynamicMessage) -> Result<Json, EncodeError> {
        if let Some(result) = wkt::encode(self, message) {
            return result;
        }
        Ok(Json::Object(self.fields(message)?))
    }

    /// The JSON members of a message that has no special well-known form.
    fn fields(&mut self, message: &DynamicMessage) -> Result<Map<String, Json>, EncodeError> {
        let mut object = Map::new();
        for field in message.descriptor().fields() {
            let key = if self.options.use_proto_names {
                field.name()
            } else {
                field.json_name()
            };

            let json = match message.get_field(field) {
                Some(value) => {
                    self.path.push(Segment::Field(field.name().to_string()));
                    let json = self.field_value(field, value)?;
                    self.path.pop();
                    json
                }
                None if self.options.emit_unpopulated && field.oneof_index().is_none() => {
                    self.unpopulated(field)?
                }
                None => continue,
            };
            object.insert(key.to_string(), json);
        }
        Ok(object)
    }

    fn unpopulated(&mut self, field: &FieldDescriptor) -> Result<Json, EncodeError> {
        if field.cardinality() == Cardinality::Singular && field.kind() == Kind::Message {
            return Ok(Json::Null);
        }
        self.path.push(Segment::Field(field.name().to_string()));
        let default = Value::default_for_field(field, self.pool).map_err(|_| {
            EncodeError::SchemaMismatch {
                path: self.path(),
                expected: field.type_name().unwrap_or(field.kind().name()).to_string(),
                found: "unresolved type",
            }
        })?;
        let json = self.field_value(field, &default)?;
        self.path.pop();
        Ok(json)
    }

    fn field_value(&mut self, field: &FieldDescriptor, value: &Value) -> Result<Json, EncodeError> {
        match (field.cardinality(), value) {
            (Cardinality::Repeated, Value::List(items)) => {
                let mut array = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    self.path.push(Segment::Index(idx));
                    array.push(self.single(field.kind(), field.type_name(), item)?);
                    self.path.pop();
                }
                Ok(Json::Array(array))
            }
            (Cardinality::Map, Value::Map(map)) => {
                let Some(entry) = field.map_entry() else {
                    return Err(self.mismatch("map entry", value));
                };
                let mut object = Map::new();
                for (key, item) in map.iter() {
                    let key_text = key.to_string();
                    self.path.push(Segment::Key(key_text.clone()));
                    if !key.matches_kind(entry.key.kind()) {
                        return Err(self.mismatch(entry.key.kind().name(), &key.clone().into_value()));
                    }
                    let json = self.single(entry.value.kind(), entry.value.type_name(), item)?;
                    self.path.pop();
                    object.insert(key_text, json);
                }
                Ok(Json::Object(object))
            }
            (Cardinality::Singular, _) => self.single(field.kind(), field.type_name(), value),
            (Cardinality::Repeated, _) => Err(self.mismatch("list", value)),
            (Cardinality::Map, _) => Err(self.mismatch("map", value)),
        }
    }

    /// Encode one scalar or message value of `kind`.
    fn single(&mut self, kind: Kind, type_name: Option<&str>, value: &Value) -> Result<Json, EncodeError> {
        if !value.matches_kind(kind, type_name) {
            let expected = match kind {
                Kind::Message | Kind::Enum => type_name.unwrap_or(kind.name()),
                _ => kind.name(),
            };
            return Err(self.mismatch(expected, value));
        }
        let json = match value {
            Value::Bool(v) => Json::Bool(*v),
            Value::I32(v) => Json::from(*v),
            Value::U32(v) => Json::from(*v),
            // 64-bit integers are strings so JavaScript consumers don't lose precision.
            Value::I64(v) => Json::String(v.to_string()),
            Value::U64(v) => Json::String(v.to_string()),
            Value::F32(v) => float(f32_to_f64(*v)),
            Value::F64(v) => float(*v),
            Value::String(v) => Json::String(v.clone()),
            Value::Bytes(v) => Json::String(STANDARD.encode(v)),
            Value::EnumNumber(number) => self.enum_value(type_name.unwrap_or_default(), *number)?,
            Value::Message(message) => self.message(message)?,
            Value::List(_) | Value::Map(_) => return Err(self.mismatch(kind.name(), value)),
        };
        Ok(json)
    }

    fn enum_value(&self, enum_name: &str, number: i32) -> Result<Json, EncodeError> {
        if enum_name == "google.protobuf.NullValue" {
            return Ok(Json::Null);
        }
        let Some(enum_type) = self.pool.get_enum(enum_name) else {
            return Err(EncodeError::SchemaMismatch {
                path: self.path(),
                expected: enum_name.to_string(),
                found: "unresolved enum",
            });
        };
        match enum_type.get_value(number) {
            Some(value) => Ok(Json::String(value.name().to_string())),
            None if !enum_type.is_closed() => Ok(Json::from(number)),
            None => Err(EncodeError::UnknownEnumValue {
                path: self.path(),
                enum_name: enum_name.to_string(),
                number,
            }),
        }
    }

    fn mismatch(&self, expected: &str, found: &Value) -> EncodeError {
        EncodeError::SchemaMismatch {
            path: self.path(),
            expected: expected.to_string(),
            found: found.type_name(),
        }
    }

    fn invalid_well_known(&self, type_name: &'static str, reason: impl Into<String>) -> EncodeError {
        EncodeError::InvalidWellKnown {
            path: self.path(),
            type_name,
            reason: reason.into(),
        }
    }
}

/// Widen through the shortest decimal form, so `0.1f32` prints as `0.1`.
fn f32_to_f64(value: f32) -> f64 {
    if !value.is_finite() {
        return f64::from(value);
    }
    value.to_string().parse().unwrap_or(f64::from(value))
}

/// Integral values print without a fraction; non-finite values are strings.
fn float(value: f64) -> Json {
    if value.is_nan() {
        return Json::String("NaN".to_string());
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return Json::String(text.to_string());
    }
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_EXACT && !(value == 0.0 && value.is_sign_negative()) {
        return Json::from(value as i64);
    }
    Number::from_f64(value).map_or(Json::Null, Json::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, SIMPLE_TEST_FILE};
    use crate::text::{self, DecodeLimits};
    use serde_json::json;

    fn transcode(type_name: &str, input: &str, options: &EncodeOptions) -> Result<Json, EncodeError> {
        let pool = schema::builtin_pool().unwrap();
        let descriptor = pool.expect_message(type_name).unwrap();
        let message = text::decode(&pool, &descriptor, input.as_bytes(), &DecodeLimits::default())
            .unwrap();
        to_json_value(&pool, &message, options)
    }

    fn json_of(type_name: &str, input: &str) -> Json {
        transcode(type_name, input, &EncodeOptions::default()).unwrap()
    }

    #[test]
    fn test_basic_document() {
        let json = json_of(
            SIMPLE_TEST_FILE,
            r#"name: "basic" test { name: "eq_test" expr: "1 == 1" }"#,
        );
        assert_eq!(
            json,
            json!({"name": "basic", "test": [{"name": "eq_test", "expr": "1 == 1"}]})
        );
    }

    #[test]
    fn test_camel_case_and_oneof() {
        let json = json_of(
            SIMPLE_TEST_FILE,
            r#"test { disable_check: true check_only: false value { int64_value: 7 } }"#,
        );
        assert_eq!(
            json,
            json!({"test": [{
                "disableCheck": true,
                "checkOnly": false,
                "value": {"int64Value": "7"}
            }]})
        );
    }

    #[test]
    fn test_declaration_order() {
        // Source order differs from schema order.
        let json = json_of(SIMPLE_TEST_FILE, r#"test { expr: "x" name: "n" } name: "f""#);
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "test"]);
        let test_keys: Vec<&String> = json["test"][0].as_object().unwrap().keys().collect();
        assert_eq!(test_keys, vec!["name", "expr"]);
    }

    #[test]
    fn test_scalar_mapping() {
        let json = json_of("cel.expr.Value", "uint64_value: 18446744073709551615");
        assert_eq!(json, json!({"uint64Value": "18446744073709551615"}));

        let json = json_of("cel.expr.Value", "double_value: 2.0");
        assert_eq!(json, json!({"doubleValue": 2}));

        let json = json_of("cel.expr.Value", "double_value: 0.25");
        assert_eq!(json, json!({"doubleValue": 0.25}));

        let json = json_of("cel.expr.Value", "double_value: nan");
        assert_eq!(json, json!({"doubleValue": "NaN"}));

        let json = json_of("cel.expr.Value", "double_value: -inf");
        assert_eq!(json, json!({"doubleValue": "-Infinity"}));

        let json = json_of("cel.expr.Value", r#"bytes_value: "\x00\xffhi""#);
        assert_eq!(json, json!({"bytesValue": "AP9oaQ=="}));

        let json = json_of("cel.expr.Value", "null_value: NULL_VALUE");
        assert_eq!(json, json!({"nullValue": null}));

        let json = json_of("cel.expr.Type", "primitive: STRING");
        assert_eq!(json, json!({"primitive": "STRING"}));

        let json = json_of("google.protobuf.FloatValue", "value: 0.1");
        assert_eq!(json, json!(0.1));
    }

    #[test]
    fn test_map_keeps_source_order() {
        let json = json_of(
            SIMPLE_TEST_FILE,
            r#"test {
                bindings { key: "b" value { value { bool_value: true } } }
                bindings { key: "a" value { value { string_value: "s" } } }
            }"#,
        );
        let bindings = json["test"][0]["bindings"].as_object().unwrap();
        let keys: Vec<&String> = bindings.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(bindings["a"], json!({"value": {"stringValue": "s"}}));
    }

    #[test]
    fn test_well_known_types() {
        let json = json_of("google.protobuf.Duration", "seconds: 1 nanos: 500000000");
        assert_eq!(json, json!("1.500s"));

        let json = json_of("google.protobuf.Duration", "seconds: -3 nanos: -1");
        assert_eq!(json, json!("-3.000000001s"));

        let json = json_of("google.protobuf.Timestamp", "seconds: 0");
        assert_eq!(json, json!("1970-01-01T00:00:00Z"));

        let json = json_of("google.protobuf.Timestamp", "seconds: 1700000000 nanos: 120000");
        assert_eq!(json, json!("2023-11-14T22:13:20.000120Z"));

        let json = json_of("google.protobuf.Int64Value", "value: 5");
        assert_eq!(json, json!("5"));

        let json = json_of("google.protobuf.BoolValue", "");
        assert_eq!(json, json!(false));

        let json = json_of("google.protobuf.FieldMask", r#"paths: "a.b_c" paths: "d""#);
        assert_eq!(json, json!("a.bC,d"));

        let json = json_of("google.protobuf.Empty", "");
        assert_eq!(json, json!({}));

        let json = json_of(
            "google.protobuf.Struct",
            r#"fields { key: "k" value { list_value { values { number_value: 1 } values { null_value: NULL_VALUE } } } }"#,
        );
        assert_eq!(json, json!({"k": [1, null]}));
    }

    #[test]
    fn test_any_expansion() {
        let json = json_of(
            "cel.expr.Value",
            r#"object_value { [type.googleapis.com/cel.expr.EnumValue] { type: "t" value: 2 } }"#,
        );
        assert_eq!(
            json,
            json!({"objectValue": {
                "@type": "type.googleapis.com/cel.expr.EnumValue",
                "type": "t",
                "value": 2
            }})
        );

        let json = json_of(
            "google.protobuf.Any",
            "[type.googleapis.com/google.protobuf.Duration] { seconds: 2 }",
        );
        assert_eq!(
            json,
            json!({"@type": "type.googleapis.com/google.protobuf.Duration", "value": "2s"})
        );
    }

    #[test]
    fn test_invalid_well_known() {
        let err = transcode(
            "google.protobuf.Duration",
            "seconds: 1 nanos: -5",
            &EncodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::InvalidWellKnown { type_name: "google.protobuf.Duration", .. }));

        let err = transcode(
            SIMPLE_TEST_FILE,
            r#"test { bindings { key: "x" value { value { object_value { type_url: "type.googleapis.com/no.Such" } } } } }"#,
            &EncodeOptions::default(),
        )
        .unwrap_err();
        match err {
            EncodeError::UnknownAnyType { path, type_url } => {
                assert_eq!(path, r#"test[0].bindings["x"].value.object_value"#);
                assert_eq!(type_url, "type.googleapis.com/no.Such");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_emit_unpopulated() {
        let options = EncodeOptions {
            emit_unpopulated: true,
            ..Default::default()
        };
        let json = transcode("cel.expr.Status", "code: 3", &options).unwrap();
        assert_eq!(json, json!({"code": 3, "message": "", "details": []}));

        // Oneof members stay absent.
        let json = transcode("cel.expr.ExprValue", "", &options).unwrap();
        assert_eq!(json, json!({}));

        let json = transcode("cel.expr.conformance.test.TypedResult", "", &options).unwrap();
        assert_eq!(json, json!({"result": null, "deducedType": null}));
    }

    #[test]
    fn test_proto_names_and_compact_output() {
        let pool = schema::builtin_pool().unwrap();
        let descriptor = pool.expect_message(SIMPLE_TEST_FILE).unwrap();
        let message = text::decode(
            &pool,
            &descriptor,
            br#"test { disable_check: true }"#,
            &DecodeLimits::default(),
        )
        .unwrap();

        let options = EncodeOptions {
            multiline: false,
            use_proto_names: true,
            ..Default::default()
        };
        assert_eq!(
            encode(&pool, &message, &options).unwrap(),
            r#"{"test":[{"disable_check":true}]}"#
        );

        let pretty = encode(&pool, &message, &EncodeOptions::default()).unwrap();
        assert_eq!(
            pretty,
            "{\n  \"test\": [\n    {\n      \"disableCheck\": true\n    }\n  ]\n}"
        );
    }

    #[test]
    fn test_closed_enum_rejects_unknown_number() {
        let mut pool = schema::builtin_pool().unwrap();
        pool.add_file(protomon_reflect::descriptor::FileDescriptorProto {
            name: Some("closed.proto".to_string()),
            package: Some("closed".to_string()),
            message_type: vec![protomon_reflect::descriptor::DescriptorProto {
                name: Some("Holder".to_string()),
                field: vec![protomon_reflect::descriptor::FieldDescriptorProto {
                    name: Some("mode".to_string()),
                    number: Some(1),
                    label: Some(1),
                    r#type: Some(protomon_reflect::descriptor::Type::Enum as i32),
                    type_name: Some(".closed.Mode".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            enum_type: vec![protomon_reflect::descriptor::EnumDescriptorProto {
                name: Some("Mode".to_string()),
                value: vec![protomon_reflect::descriptor::EnumValueDescriptorProto {
                    name: Some("ON".to_string()),
                    number: Some(1),
                }],
            }],
            syntax: Some("proto2".to_string()),
            ..Default::default()
        })
        .unwrap();

        let holder = pool.expect_message("closed.Holder").unwrap();
        let mut message = DynamicMessage::new(holder);
        message.set_field_by_name("mode", Value::EnumNumber(7)).unwrap();
        let err = to_json_value(&pool, &message, &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownEnumValue { number: 7, .. }));
    }
}
