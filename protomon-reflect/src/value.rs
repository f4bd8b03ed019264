//! Dynamic message values.
//!
//! A [`DynamicMessage`] stores only the fields that were explicitly set.
//! Unset fields are absent rather than defaulted, so an encoder can tell
//! "never assigned" apart from "assigned the zero value".

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::pool::{
    Cardinality, DescriptorPool, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor,
};
use crate::Error;

/// The value of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    EnumNumber(i32),
    Message(DynamicMessage),
    List(Vec<Value>),
    Map(MapValue),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Whether this value can be stored as one element of a field of `kind`.
    pub fn matches_kind(&self, kind: Kind, type_name: Option<&str>) -> bool {
        match (self, kind) {
            (Value::Bool(_), Kind::Bool)
            | (Value::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
            | (Value::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
            | (Value::U32(_), Kind::Uint32 | Kind::Fixed32)
            | (Value::U64(_), Kind::Uint64 | Kind::Fixed64)
            | (Value::F32(_), Kind::Float)
            | (Value::F64(_), Kind::Double)
            | (Value::String(_), Kind::String)
            | (Value::Bytes(_), Kind::Bytes)
            | (Value::EnumNumber(_), Kind::Enum) => true,
            (Value::Message(message), Kind::Message) => {
                Some(message.descriptor().full_name()) == type_name
            }
            _ => false,
        }
    }

    /// Whether this value can be assigned to `field` as a whole.
    pub fn is_valid_for_field(&self, field: &FieldDescriptor) -> bool {
        match (self, field.cardinality()) {
            (Value::List(items), Cardinality::Repeated) => items
                .iter()
                .all(|item| item.matches_kind(field.kind(), field.type_name())),
            (Value::Map(map), Cardinality::Map) => match field.map_entry() {
                Some(entry) => map.iter().all(|(key, value)| {
                    key.matches_kind(entry.key.kind())
                        && value.matches_kind(entry.value.kind(), entry.value.type_name())
                }),
                None => false,
            },
            (_, Cardinality::Singular) => self.matches_kind(field.kind(), field.type_name()),
            _ => false,
        }
    }

    /// The zero value of a singular field of `kind`.
    pub fn default_for_kind(
        kind: Kind,
        type_name: Option<&str>,
        pool: &DescriptorPool,
    ) -> Result<Value, Error> {
        let value = match kind {
            Kind::Bool => Value::Bool(false),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Float => Value::F32(0.0),
            Kind::Double => Value::F64(0.0),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Bytes::new()),
            Kind::Enum => {
                let name = type_name.unwrap_or_default();
                let number = pool
                    .get_enum(name)
                    .and_then(|e| e.default_value().map(|v| v.number()))
                    .unwrap_or(0);
                Value::EnumNumber(number)
            }
            Kind::Message => {
                let name = type_name.unwrap_or_default();
                Value::Message(DynamicMessage::new(pool.expect_message(name)?))
            }
        };
        Ok(value)
    }

    /// The value an unset `field` reads as: empty for lists and maps, the
    /// declared proto2 default if there is one, otherwise the zero value.
    pub fn default_for_field(field: &FieldDescriptor, pool: &DescriptorPool) -> Result<Value, Error> {
        match field.cardinality() {
            Cardinality::Repeated => return Ok(Value::List(Vec::new())),
            Cardinality::Map => return Ok(Value::Map(MapValue::new())),
            Cardinality::Singular => {}
        }
        let zero = Value::default_for_kind(field.kind(), field.type_name(), pool)?;
        let declared = field
            .default_value()
            .and_then(|text| parse_declared_default(field, text, pool));
        Ok(declared.unwrap_or(zero))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// Parse a proto2 `[default = ...]` string. Unparseable text yields `None`.
fn parse_declared_default(field: &FieldDescriptor, text: &str, pool: &DescriptorPool) -> Option<Value> {
    let float = |text: &str| -> Option<f64> {
        match text {
            "inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            "nan" => Some(f64::NAN),
            other => other.parse().ok(),
        }
    };
    let value = match field.kind() {
        Kind::Bool => Value::Bool(text.parse().ok()?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(text.parse().ok()?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(text.parse().ok()?),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(text.parse().ok()?),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(text.parse().ok()?),
        Kind::Float => Value::F32(float(text)? as f32),
        Kind::Double => Value::F64(float(text)?),
        Kind::String => Value::String(text.to_string()),
        // protoc stores bytes defaults C-escaped; only the unescaped common case is honored.
        Kind::Bytes if !text.contains('\\') => Value::Bytes(Bytes::copy_from_slice(text.as_bytes())),
        Kind::Bytes => return None,
        Kind::Enum => {
            let enum_type = pool.get_enum(field.type_name()?)?;
            Value::EnumNumber(enum_type.get_value_by_name(text)?.number())
        }
        Kind::Message => return None,
    };
    Some(value)
}

/// A scalar usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl MapKey {
    /// Convert a scalar [`Value`] into a key; floats, bytes, enums and messages can't be keys.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(MapKey::Bool(v)),
            Value::I32(v) => Some(MapKey::I32(v)),
            Value::I64(v) => Some(MapKey::I64(v)),
            Value::U32(v) => Some(MapKey::U32(v)),
            Value::U64(v) => Some(MapKey::U64(v)),
            Value::String(v) => Some(MapKey::String(v)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            MapKey::Bool(v) => Value::Bool(v),
            MapKey::I32(v) => Value::I32(v),
            MapKey::I64(v) => Value::I64(v),
            MapKey::U32(v) => Value::U32(v),
            MapKey::U64(v) => Value::U64(v),
            MapKey::String(v) => Value::String(v),
        }
    }

    pub fn matches_kind(&self, kind: Kind) -> bool {
        matches!(
            (self, kind),
            (MapKey::Bool(_), Kind::Bool)
                | (MapKey::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
                | (MapKey::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
                | (MapKey::U32(_), Kind::Uint32 | Kind::Fixed32)
                | (MapKey::U64(_), Kind::Uint64 | Kind::Fixed64)
                | (MapKey::String(_), Kind::String)
        )
    }

    /// The key a map entry without an explicit key gets.
    pub fn default_for_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Bool => Some(MapKey::Bool(false)),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Some(MapKey::I32(0)),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Some(MapKey::I64(0)),
            Kind::Uint32 | Kind::Fixed32 => Some(MapKey::U32(0)),
            Kind::Uint64 | Kind::Fixed64 => Some(MapKey::U64(0)),
            Kind::String => Some(MapKey::String(String::new())),
            _ => None,
        }
    }
}

/// Keys render the way JSON object keys spell them.
impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => write!(f, "{v}"),
            MapKey::I32(v) => write!(f, "{v}"),
            MapKey::I64(v) => write!(f, "{v}"),
            MapKey::U32(v) => write!(f, "{v}"),
            MapKey::U64(v) => write!(f, "{v}"),
            MapKey::String(v) => f.write_str(v),
        }
    }
}

/// Map field contents in insertion order.
///
/// Re-inserting a key replaces its value but keeps its original position.
/// Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct MapValue {
    entries: Vec<(MapKey, Value)>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the value it replaced.
    pub fn insert(&mut self, key: MapKey, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(MapKey, Value)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (MapKey, Value)>>(iter: I) -> Self {
        let mut map = MapValue::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// One instance of a message type, holding only explicitly set fields.
#[derive(Debug, Clone)]
pub struct DynamicMessage {
    descriptor: Arc<MessageDescriptor>,
    fields: BTreeMap<u32, Value>,
}

impl PartialEq for DynamicMessage {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.full_name() == other.descriptor.full_name() && self.fields == other.fields
    }
}

impl DynamicMessage {
    /// Create an empty message of the given type.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            fields: BTreeMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// No field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.fields.contains_key(&field.number())
    }

    pub fn get_field(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(&field.number())
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<&Value> {
        let field = self.descriptor.get_field_by_name(name)?;
        self.fields.get(&field.number())
    }

    pub fn get_field_mut(&mut self, field: &FieldDescriptor) -> Option<&mut Value> {
        self.fields.get_mut(&field.number())
    }

    /// Set `field` to `value`, replacing any previous value.
    ///
    /// Setting a member of a oneof clears the other members.
    pub fn set_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), Error> {
        self.check_owns(field)?;
        if !value.is_valid_for_field(field) {
            return Err(Error::TypeMismatch {
                field: field.full_name().to_string(),
                expected: expected_name(field),
                found: value.type_name(),
            });
        }
        if let Some(oneof) = field.oneof_index().and_then(|idx| self.descriptor.oneofs().get(idx)) {
            for number in oneof.field_numbers() {
                if *number != field.number() {
                    self.fields.remove(number);
                }
            }
        }
        self.fields.insert(field.number(), value);
        Ok(())
    }

    /// [`DynamicMessage::set_field`] by field name.
    pub fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let descriptor = Arc::clone(&self.descriptor);
        let field = descriptor
            .get_field_by_name(name)
            .ok_or_else(|| Error::UnknownField {
                message: descriptor.full_name().to_string(),
                field: name.to_string(),
            })?;
        self.set_field(field, value)
    }

    /// Append one element to a repeated field.
    pub fn push_value(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), Error> {
        self.check_owns(field)?;
        if !field.is_list() || !value.matches_kind(field.kind(), field.type_name()) {
            return Err(Error::TypeMismatch {
                field: field.full_name().to_string(),
                expected: expected_name(field),
                found: value.type_name(),
            });
        }
        match self
            .fields
            .entry(field.number())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(Error::TypeMismatch {
                field: field.full_name().to_string(),
                expected: "list",
                found: other.type_name(),
            }),
        }
    }

    /// Insert one entry into a map field, returning the value it replaced.
    pub fn insert_map_entry(
        &mut self,
        field: &FieldDescriptor,
        key: MapKey,
        value: Value,
    ) -> Result<Option<Value>, Error> {
        self.check_owns(field)?;
        let valid = field.map_entry().is_some_and(|entry| {
            key.matches_kind(entry.key.kind())
                && value.matches_kind(entry.value.kind(), entry.value.type_name())
        });
        if !valid {
            return Err(Error::TypeMismatch {
                field: field.full_name().to_string(),
                expected: expected_name(field),
                found: value.type_name(),
            });
        }
        match self
            .fields
            .entry(field.number())
            .or_insert_with(|| Value::Map(MapValue::new()))
        {
            Value::Map(map) => Ok(map.insert(key, value)),
            other => Err(Error::TypeMismatch {
                field: field.full_name().to_string(),
                expected: "map",
                found: other.type_name(),
            }),
        }
    }

    /// Unset `field`, returning its previous value.
    pub fn clear_field(&mut self, field: &FieldDescriptor) -> Option<Value> {
        self.fields.remove(&field.number())
    }

    /// The member of `oneof` that is currently set.
    pub fn oneof_case(&self, oneof: &OneofDescriptor) -> Option<&FieldDescriptor> {
        oneof
            .field_numbers()
            .iter()
            .find(|number| self.fields.contains_key(number))
            .and_then(|number| self.descriptor.get_field(*number))
    }

    /// Set fields in schema declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.descriptor
            .fields()
            .iter()
            .filter_map(|field| self.fields.get(&field.number()).map(|value| (field, value)))
    }

    /// Set fields in field number order, the order binary encoding uses.
    pub fn fields_by_number(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.fields.iter().filter_map(|(number, value)| {
            self.descriptor
                .get_field(*number)
                .map(|field| (field, value))
        })
    }

    fn check_owns(&self, field: &FieldDescriptor) -> Result<(), Error> {
        match self.descriptor.get_field(field.number()) {
            Some(own) if own.full_name() == field.full_name() => Ok(()),
            _ => Err(Error::UnknownField {
                message: self.descriptor.full_name().to_string(),
                field: field.name().to_string(),
            }),
        }
    }
}

fn expected_name(field: &FieldDescriptor) -> &'static str {
    match field.cardinality() {
        Cardinality::Singular => field.kind().name(),
        Cardinality::Repeated => "list",
        Cardinality::Map => "map",
    }
}
