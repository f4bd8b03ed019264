//! JSON forms of the `google.protobuf` well-known types.

use protomon_reflect::codec::decode_message;
use protomon_reflect::pool::to_json_name;
use protomon_reflect::{DynamicMessage, Value};
use serde_json::{Map, Value as Json};
use time::macros::format_description;
use time::OffsetDateTime;

use super::{EncodeError, Encoder, Segment};

const ANY: &str = "google.protobuf.Any";
const DURATION: &str = "google.protobuf.Duration";
const TIMESTAMP: &str = "google.protobuf.Timestamp";
const EMPTY: &str = "google.protobuf.Empty";
const FIELD_MASK: &str = "google.protobuf.FieldMask";
const STRUCT: &str = "google.protobuf.Struct";
const VALUE: &str = "google.protobuf.Value";
const LIST_VALUE: &str = "google.protobuf.ListValue";

const WRAPPERS: [&str; 9] = [
    "google.protobuf.DoubleValue",
    "google.protobuf.FloatValue",
    "google.protobuf.Int64Value",
    "google.protobuf.UInt64Value",
    "google.protobuf.Int32Value",
    "google.protobuf.UInt32Value",
    "google.protobuf.BoolValue",
    "google.protobuf.StringValue",
    "google.protobuf.BytesValue",
];

/// ±10,000 years.
const MAX_DURATION_SECONDS: i64 = 315_576_000_000;
/// 0001-01-01T00:00:00Z
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Whether `full_name` has a special JSON form other than an object of fields.
fn is_special(full_name: &str) -> bool {
    matches!(
        full_name,
        ANY | DURATION | TIMESTAMP | EMPTY | FIELD_MASK | STRUCT | VALUE | LIST_VALUE
    ) || WRAPPERS.contains(&full_name)
}

/// The JSON form of `message` if it is a well-known type, `None` otherwise.
pub(super) fn encode(
    encoder: &mut Encoder<'_>,
    message: &DynamicMessage,
) -> Option<Result<Json, EncodeError>> {
    let result = match message.descriptor().full_name() {
        ANY => any(encoder, message),
        DURATION => duration(encoder, message),
        TIMESTAMP => timestamp(encoder, message),
        EMPTY => Ok(Json::Object(Map::new())),
        FIELD_MASK => field_mask(encoder, message),
        STRUCT => structure(encoder, message),
        VALUE => value(encoder, message),
        LIST_VALUE => list_value(encoder, message),
        name if WRAPPERS.contains(&name) => wrapper(encoder, message),
        _ => return None,
    };
    Some(result)
}

fn int64(message: &DynamicMessage, name: &str) -> i64 {
    match message.get_field_by_name(name) {
        Some(Value::I64(v)) => *v,
        _ => 0,
    }
}

fn int32(message: &DynamicMessage, name: &str) -> i32 {
    match message.get_field_by_name(name) {
        Some(Value::I32(v)) => *v,
        _ => 0,
    }
}

fn any(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let type_url = message
        .get_field_by_name("type_url")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let payload: &[u8] = match message.get_field_by_name("value") {
        Some(Value::Bytes(bytes)) => &bytes[..],
        _ => &[],
    };
    if type_url.is_empty() {
        if payload.is_empty() {
            return Ok(Json::Object(Map::new()));
        }
        return Err(encoder.invalid_well_known(ANY, "payload without a type URL"));
    }

    let type_name = type_url.rsplit_once('/').map_or(type_url, |(_, name)| name);
    let Some(descriptor) = encoder.pool.get_message(type_name) else {
        return Err(EncodeError::UnknownAnyType {
            path: encoder.path(),
            type_url: type_url.to_string(),
        });
    };
    let inner = decode_message(encoder.pool, &descriptor, payload).map_err(|source| {
        EncodeError::Wire {
            path: encoder.path(),
            source,
        }
    })?;

    let mut object = Map::new();
    object.insert("@type".to_string(), Json::String(type_url.to_string()));
    if is_special(descriptor.full_name()) {
        encoder.path.push(Segment::Field("value".to_string()));
        let value = encoder.message(&inner)?;
        encoder.path.pop();
        object.insert("value".to_string(), value);
    } else {
        object.extend(encoder.fields(&inner)?);
    }
    Ok(Json::Object(object))
}

fn duration(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let seconds = int64(message, "seconds");
    let nanos = int32(message, "nanos");
    if !(-MAX_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
        return Err(encoder.invalid_well_known(DURATION, format!("seconds {seconds} out of range")));
    }
    if nanos <= -NANOS_PER_SECOND || nanos >= NANOS_PER_SECOND {
        return Err(encoder.invalid_well_known(DURATION, format!("nanos {nanos} out of range")));
    }
    if (seconds < 0 && nanos > 0) || (seconds > 0 && nanos < 0) {
        return Err(encoder.invalid_well_known(DURATION, "seconds and nanos differ in sign"));
    }

    let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
    let text = format!(
        "{sign}{}{}s",
        seconds.unsigned_abs(),
        fraction(nanos.unsigned_abs())
    );
    Ok(Json::String(text))
}

fn timestamp(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let seconds = int64(message, "seconds");
    let nanos = int32(message, "nanos");
    if !(MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&seconds) {
        return Err(encoder.invalid_well_known(TIMESTAMP, format!("seconds {seconds} out of range")));
    }
    if !(0..NANOS_PER_SECOND).contains(&nanos) {
        return Err(encoder.invalid_well_known(TIMESTAMP, format!("nanos {nanos} out of range")));
    }

    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let text = OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|err| encoder.invalid_well_known(TIMESTAMP, err.to_string()))?
        .format(&format)
        .map_err(|err| encoder.invalid_well_known(TIMESTAMP, err.to_string()))?;
    Ok(Json::String(format!("{text}{}Z", fraction(nanos.unsigned_abs()))))
}

/// Fractional seconds with 0, 3, 6 or 9 digits, the fewest that are exact.
fn fraction(nanos: u32) -> String {
    if nanos == 0 {
        String::new()
    } else if nanos % 1_000_000 == 0 {
        format!(".{:03}", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!(".{:06}", nanos / 1_000)
    } else {
        format!(".{nanos:09}")
    }
}

fn wrapper(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let descriptor = message.descriptor();
    let Some(field) = descriptor.get_field(1) else {
        let name = WRAPPERS
            .into_iter()
            .find(|name| *name == descriptor.full_name())
            .unwrap_or("wrapper");
        return Err(encoder.invalid_well_known(name, "missing the value field"));
    };
    let value = match message.get_field(field) {
        Some(value) => value.clone(),
        None => Value::default_for_field(field, encoder.pool).map_err(|source| EncodeError::Wire {
            path: encoder.path(),
            source,
        })?,
    };
    encoder.single(field.kind(), field.type_name(), &value)
}

fn field_mask(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let paths = message
        .get_field_by_name("paths")
        .and_then(Value::as_list)
        .unwrap_or_default();
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_str().unwrap_or_default();
        if path.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(encoder.invalid_well_known(
                FIELD_MASK,
                format!("path '{path}' is not snake_case"),
            ));
        }
        out.push(to_json_name(path));
    }
    Ok(Json::String(out.join(",")))
}

fn structure(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let mut object = Map::new();
    let Some(fields) = message.get_field_by_name("fields").and_then(Value::as_map) else {
        return Ok(Json::Object(object));
    };
    encoder.path.push(Segment::Field("fields".to_string()));
    for (key, item) in fields.iter() {
        let key = key.to_string();
        encoder.path.push(Segment::Key(key.clone()));
        let Some(item) = item.as_message() else {
            return Err(encoder.mismatch(VALUE, item));
        };
        let json = encoder.message(item)?;
        encoder.path.pop();
        object.insert(key, json);
    }
    encoder.path.pop();
    Ok(Json::Object(object))
}

fn value(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let Some((field, kind)) = message.fields().next() else {
        return Err(encoder.invalid_well_known(VALUE, "no kind is set"));
    };
    match (field.name(), kind) {
        ("null_value", _) => Ok(Json::Null),
        ("number_value", Value::F64(number)) if !number.is_finite() => Err(encoder
            .invalid_well_known(VALUE, format!("number_value {number} is not finite"))),
        (name, kind) => {
            encoder.path.push(Segment::Field(name.to_string()));
            let json = encoder.single(field.kind(), field.type_name(), kind)?;
            encoder.path.pop();
            Ok(json)
        }
    }
}

fn list_value(encoder: &mut Encoder<'_>, message: &DynamicMessage) -> Result<Json, EncodeError> {
    let values = message
        .get_field_by_name("values")
        .and_then(Value::as_list)
        .unwrap_or_default();
    encoder.path.push(Segment::Field("values".to_string()));
    let mut array = Vec::with_capacity(values.len());
    for (idx, item) in values.iter().enumerate() {
        encoder.path.push(Segment::Index(idx));
        let Some(item) = item.as_message() else {
            return Err(encoder.mismatch(VALUE, item));
        };
        array.push(encoder.message(item)?);
        encoder.path.pop();
    }
    encoder.path.pop();
    Ok(Json::Array(array))
}
