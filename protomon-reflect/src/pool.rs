//! Resolved descriptors and the pool that owns them.
//!
//! A [`DescriptorPool`] is built from raw [`FileDescriptorProto`]s. Building
//! resolves every type reference, decides which repeated fields are maps and
//! validates the structural invariants of each message, so decoders and
//! encoders walking a [`MessageDescriptor`] never have to re-check them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::descriptor::{
    decode_file_descriptor_set, DescriptorProto, EnumDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, Label, Type,
};
use crate::wire::{WireType, MAXIMUM_TAG_VAL, MINIMUM_TAG_VAL};
use crate::Error;

/// Syntax of the `.proto` file a type was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

impl Syntax {
    fn from_file(file: &FileDescriptorProto) -> Self {
        match file.syntax.as_deref() {
            Some("proto3") => Syntax::Proto3,
            _ => Syntax::Proto2,
        }
    }
}

/// The value kind of a field, with groups rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
    Message,
    Enum,
}

impl Kind {
    fn from_type(ty: Type) -> Option<Self> {
        let kind = match ty {
            Type::Double => Kind::Double,
            Type::Float => Kind::Float,
            Type::Int64 => Kind::Int64,
            Type::Uint64 => Kind::Uint64,
            Type::Int32 => Kind::Int32,
            Type::Fixed64 => Kind::Fixed64,
            Type::Fixed32 => Kind::Fixed32,
            Type::Bool => Kind::Bool,
            Type::String => Kind::String,
            Type::Group => return None,
            Type::Message => Kind::Message,
            Type::Bytes => Kind::Bytes,
            Type::Uint32 => Kind::Uint32,
            Type::Enum => Kind::Enum,
            Type::Sfixed32 => Kind::Sfixed32,
            Type::Sfixed64 => Kind::Sfixed64,
            Type::Sint32 => Kind::Sint32,
            Type::Sint64 => Kind::Sint64,
        };
        Some(kind)
    }

    /// The `.proto` spelling of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Double => "double",
            Kind::Float => "float",
            Kind::Int64 => "int64",
            Kind::Uint64 => "uint64",
            Kind::Int32 => "int32",
            Kind::Fixed64 => "fixed64",
            Kind::Fixed32 => "fixed32",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Uint32 => "uint32",
            Kind::Sfixed32 => "sfixed32",
            Kind::Sfixed64 => "sfixed64",
            Kind::Sint32 => "sint32",
            Kind::Sint64 => "sint64",
            Kind::Message => "message",
            Kind::Enum => "enum",
        }
    }

    /// Whether repeated fields of this kind may use packed encoding.
    pub fn is_packable(self) -> bool {
        !matches!(self, Kind::String | Kind::Bytes | Kind::Message)
    }

    /// Whether this kind may be used as a map key.
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            Kind::Double | Kind::Float | Kind::Bytes | Kind::Message | Kind::Enum
        )
    }

    /// The wire type a single value of this kind is encoded with.
    pub fn wire_type(self) -> WireType {
        match self {
            Kind::Int64
            | Kind::Uint64
            | Kind::Int32
            | Kind::Bool
            | Kind::Uint32
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Enum => WireType::Varint,
            Kind::Double | Kind::Fixed64 | Kind::Sfixed64 => WireType::I64,
            Kind::Float | Kind::Fixed32 | Kind::Sfixed32 => WireType::I32,
            Kind::String | Kind::Bytes | Kind::Message => WireType::Len,
        }
    }
}

/// Whether a field holds one value, a sequence, or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Repeated,
    Map,
}

/// The key and value fields of a map field's synthetic entry message.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntryInfo {
    /// The key field descriptor (number 1).
    pub key: FieldDescriptor,
    /// The value field descriptor (number 2).
    pub value: FieldDescriptor,
}

/// A resolved field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    full_name: String,
    json_name: String,
    number: u32,
    kind: Kind,
    cardinality: Cardinality,
    type_name: Option<String>,
    oneof_index: Option<usize>,
    proto3_optional: bool,
    packed: bool,
    default_value: Option<String>,
    map_entry: Option<Box<MapEntryInfo>>,
}

impl FieldDescriptor {
    /// The name as declared in the schema, usually snake_case.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<message full name>.<field name>`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The public camelCase name used by JSON.
    pub fn json_name(&self) -> &str {
        &self.json_name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Map
    }

    /// Fully-qualified message or enum type name, without a leading dot.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Index into [`MessageDescriptor::oneofs`], including synthetic oneofs.
    pub fn oneof_index(&self) -> Option<usize> {
        self.oneof_index
    }

    /// Declared with the proto3 `optional` keyword.
    pub fn is_proto3_optional(&self) -> bool {
        self.proto3_optional
    }

    /// Repeated scalars written as a single length-delimited record.
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// The proto2 `[default = ...]` text, if any.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Key and value descriptors for map fields.
    pub fn map_entry(&self) -> Option<&MapEntryInfo> {
        self.map_entry.as_deref()
    }
}

/// A oneof declaration of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofDescriptor {
    name: String,
    fields: Vec<u32>,
    synthetic: bool,
}

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numbers of the member fields, in declaration order.
    pub fn field_numbers(&self) -> &[u32] {
        &self.fields
    }

    /// Synthesized by protoc for a single proto3 `optional` field.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// A resolved message type.
#[derive(Debug)]
pub struct MessageDescriptor {
    full_name: String,
    name: String,
    syntax: Syntax,
    fields: Vec<FieldDescriptor>,
    oneofs: Vec<OneofDescriptor>,
    map_entry: bool,
    by_name: HashMap<String, usize>,
    by_number: HashMap<u32, usize>,
}

impl MessageDescriptor {
    /// Fully-qualified name without a leading dot, e.g. `google.protobuf.Any`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get_field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.by_number.get(&number).map(|idx| &self.fields[*idx])
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|idx| &self.fields[*idx])
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// The oneof a field belongs to, if it is a member of a non-synthetic one.
    pub fn real_oneof_of(&self, field: &FieldDescriptor) -> Option<&OneofDescriptor> {
        field
            .oneof_index
            .and_then(|idx| self.oneofs.get(idx))
            .filter(|oneof| !oneof.synthetic)
    }

    pub fn is_map_entry(&self) -> bool {
        self.map_entry
    }
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDescriptor {
    name: String,
    number: i32,
}

impl EnumValueDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }
}

/// A resolved enum type.
#[derive(Debug)]
pub struct EnumDescriptor {
    full_name: String,
    name: String,
    values: Vec<EnumValueDescriptor>,
    closed: bool,
}

impl EnumDescriptor {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[EnumValueDescriptor] {
        &self.values
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.name == name)
    }

    /// First value declared with `number`; aliases resolve to the first name.
    pub fn get_value(&self, number: i32) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.number == number)
    }

    /// The first declared value, which is the default.
    pub fn default_value(&self) -> Option<&EnumValueDescriptor> {
        self.values.first()
    }

    /// proto2 enums reject numbers they don't declare.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A registry of resolved message and enum types, keyed by fully-qualified name.
#[derive(Debug, Clone, Default)]
pub struct DescriptorPool {
    files: Vec<String>,
    messages: HashMap<String, Arc<MessageDescriptor>>,
    enums: HashMap<String, Arc<EnumDescriptor>>,
}

/// A message proto awaiting resolution, with the name it is registered under.
struct PendingMessage<'a> {
    full_name: String,
    proto: &'a DescriptorProto,
    syntax: Syntax,
}

/// An enum proto awaiting resolution.
struct PendingEnum<'a> {
    full_name: String,
    proto: &'a EnumDescriptorProto,
    syntax: Syntax,
}

impl DescriptorPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from the binary output of `protoc --descriptor_set_out`.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_file_descriptor_set(decode_file_descriptor_set(bytes)?)
    }

    /// Build a pool from a FileDescriptorSet.
    pub fn from_file_descriptor_set(fds: FileDescriptorSet) -> Result<Self, Error> {
        let mut pool = Self::new();
        pool.add_file_descriptor_set(fds)?;
        Ok(pool)
    }

    /// Add a single file. See [`DescriptorPool::add_file_descriptor_set`].
    pub fn add_file(&mut self, file: FileDescriptorProto) -> Result<(), Error> {
        self.add_file_descriptor_set(FileDescriptorSet { file: vec![file] })
    }

    /// Register, resolve and validate every type in `fds`.
    ///
    /// Files whose name is already registered are skipped, so sets produced with
    /// `--include_imports` can be merged freely. On error the pool is unchanged.
    pub fn add_file_descriptor_set(&mut self, fds: FileDescriptorSet) -> Result<(), Error> {
        let mut seen_files: HashSet<String> = self.files.iter().cloned().collect();
        let files: Vec<FileDescriptorProto> = fds
            .file
            .into_iter()
            .filter(|file| match &file.name {
                Some(name) => seen_files.insert(name.clone()),
                None => true,
            })
            .collect();

        let mut pending_messages = Vec::new();
        let mut pending_enums = Vec::new();
        for file in &files {
            let package = file.package.as_deref().unwrap_or("");
            let prefix = if package.is_empty() {
                String::new()
            } else {
                format!("{}.", package)
            };
            let syntax = Syntax::from_file(file);

            for message in &file.message_type {
                collect_message(&mut pending_messages, &mut pending_enums, &prefix, syntax, message)?;
            }
            for enum_type in &file.enum_type {
                let name = enum_type.name.as_ref().ok_or(Error::MissingName)?;
                pending_enums.push(PendingEnum {
                    full_name: format!("{}{}", prefix, name),
                    proto: enum_type,
                    syntax,
                });
            }
        }

        // Every name must be unique, both within the new files and against the pool.
        let mut new_names = HashSet::new();
        let pending_names = pending_messages
            .iter()
            .map(|m| &m.full_name)
            .chain(pending_enums.iter().map(|e| &e.full_name));
        for name in pending_names {
            if self.contains_type(name) || !new_names.insert(name.clone()) {
                return Err(Error::DuplicateType(name.clone()));
            }
        }

        let map_entries: HashSet<&str> = pending_messages
            .iter()
            .filter(|m| m.proto.is_map_entry())
            .map(|m| m.full_name.as_str())
            .chain(
                self.messages
                    .values()
                    .filter(|m| m.map_entry)
                    .map(|m| m.full_name.as_str()),
            )
            .collect();

        let mut messages = HashMap::new();
        for pending in &pending_messages {
            let message = build_message(pending, &map_entries)?;
            messages.insert(pending.full_name.clone(), message);
        }

        let mut enums = HashMap::new();
        for pending in &pending_enums {
            let descriptor = build_enum(pending)?;
            enums.insert(pending.full_name.clone(), Arc::new(descriptor));
        }

        // Resolve type references against the new and existing types.
        for message in messages.values() {
            for field in &message.fields {
                self.check_reference(field, &messages, &enums)?;
            }
        }

        // Map fields carry copies of their entry's key and value descriptors.
        let entry_infos: HashMap<String, MapEntryInfo> = map_entries
            .iter()
            .map(|name| -> Result<(String, MapEntryInfo), Error> {
                let entry = messages
                    .get(*name)
                    .map(|m| (m.fields.as_slice(), m.full_name.as_str()))
                    .or_else(|| {
                        self.messages
                            .get(*name)
                            .map(|m| (m.fields.as_slice(), m.full_name.as_str()))
                    });
                let (fields, full_name) = entry.ok_or_else(|| Error::InvalidMapEntry(name.to_string()))?;
                let info = map_entry_info(full_name, fields)?;
                Ok((name.to_string(), info))
            })
            .collect::<Result<_, _>>()?;

        for message in messages.values_mut() {
            for field in &mut message.fields {
                if field.cardinality == Cardinality::Map {
                    let type_name = field.type_name.as_deref().unwrap_or_default();
                    let info = entry_infos
                        .get(type_name)
                        .ok_or_else(|| Error::InvalidMapEntry(type_name.to_string()))?;
                    field.map_entry = Some(Box::new(info.clone()));
                }
            }
        }

        // Commit.
        self.files
            .extend(files.iter().filter_map(|file| file.name.clone()));
        self.messages
            .extend(messages.into_iter().map(|(name, m)| (name, Arc::new(m))));
        self.enums.extend(enums);
        Ok(())
    }

    /// Look up a message by fully-qualified name; a leading dot is accepted.
    pub fn get_message(&self, name: &str) -> Option<Arc<MessageDescriptor>> {
        self.messages.get(name.trim_start_matches('.')).cloned()
    }

    /// Look up an enum by fully-qualified name; a leading dot is accepted.
    pub fn get_enum(&self, name: &str) -> Option<Arc<EnumDescriptor>> {
        self.enums.get(name.trim_start_matches('.')).cloned()
    }

    /// Look up a message, failing with [`Error::UnknownMessage`].
    pub fn expect_message(&self, name: &str) -> Result<Arc<MessageDescriptor>, Error> {
        self.get_message(name)
            .ok_or_else(|| Error::UnknownMessage(name.trim_start_matches('.').to_string()))
    }

    /// Iterate over every registered message.
    pub fn messages(&self) -> impl Iterator<Item = &Arc<MessageDescriptor>> {
        self.messages.values()
    }

    /// Names of the files registered so far, in insertion order.
    pub fn file_names(&self) -> &[String] {
        &self.files
    }

    fn contains_type(&self, name: &str) -> bool {
        self.messages.contains_key(name) || self.enums.contains_key(name)
    }

    fn check_reference(
        &self,
        field: &FieldDescriptor,
        messages: &HashMap<String, MessageDescriptor>,
        enums: &HashMap<String, Arc<EnumDescriptor>>,
    ) -> Result<(), Error> {
        let type_name = match &field.type_name {
            Some(type_name) => type_name.as_str(),
            None => return Ok(()),
        };
        let resolved = match field.kind {
            Kind::Message => messages.contains_key(type_name) || self.messages.contains_key(type_name),
            Kind::Enum => enums.contains_key(type_name) || self.enums.contains_key(type_name),
            _ => true,
        };
        if resolved {
            Ok(())
        } else {
            Err(Error::UnresolvedType {
                field: field.full_name.clone(),
                type_name: type_name.to_string(),
            })
        }
    }
}

/// Register a message and its nested types.
fn collect_message<'a>(
    messages: &mut Vec<PendingMessage<'a>>,
    enums: &mut Vec<PendingEnum<'a>>,
    prefix: &str,
    syntax: Syntax,
    message: &'a DescriptorProto,
) -> Result<(), Error> {
    let name = message.name.as_ref().ok_or(Error::MissingName)?;
    let full_name = format!("{}{}", prefix, name);
    let nested_prefix = format!("{}.", full_name);

    for nested in &message.nested_type {
        collect_message(messages, enums, &nested_prefix, syntax, nested)?;
    }
    for enum_type in &message.enum_type {
        let enum_name = enum_type.name.as_ref().ok_or(Error::MissingName)?;
        enums.push(PendingEnum {
            full_name: format!("{}{}", nested_prefix, enum_name),
            proto: enum_type,
            syntax,
        });
    }

    messages.push(PendingMessage {
        full_name,
        proto: message,
        syntax,
    });
    Ok(())
}

fn build_message(
    pending: &PendingMessage<'_>,
    map_entries: &HashSet<&str>,
) -> Result<MessageDescriptor, Error> {
    let proto = pending.proto;
    let mut fields = Vec::with_capacity(proto.field.len());
    let mut by_name = HashMap::new();
    let mut by_number = HashMap::new();

    for field_proto in &proto.field {
        let field = build_field(pending, field_proto, map_entries)?;
        if by_name.insert(field.name.clone(), fields.len()).is_some() {
            return Err(Error::DuplicateField {
                message: pending.full_name.clone(),
                field: field.name.clone(),
            });
        }
        if by_number.insert(field.number, fields.len()).is_some() {
            return Err(Error::DuplicateFieldNumber {
                message: pending.full_name.clone(),
                number: field.number as i32,
            });
        }
        fields.push(field);
    }

    let mut oneofs = Vec::with_capacity(proto.oneof_decl.len());
    for (idx, oneof) in proto.oneof_decl.iter().enumerate() {
        let name = oneof.name.clone().ok_or(Error::MissingName)?;
        let members: Vec<&FieldDescriptor> = fields
            .iter()
            .filter(|f| f.oneof_index == Some(idx))
            .collect();
        let synthetic = !members.is_empty() && members.iter().all(|f| f.proto3_optional);
        oneofs.push(OneofDescriptor {
            name,
            fields: members.iter().map(|f| f.number).collect(),
            synthetic,
        });
    }

    Ok(MessageDescriptor {
        full_name: pending.full_name.clone(),
        name: proto.name.clone().unwrap_or_default(),
        syntax: pending.syntax,
        fields,
        oneofs,
        map_entry: proto.is_map_entry(),
        by_name,
        by_number,
    })
}

fn build_field(
    pending: &PendingMessage<'_>,
    proto: &FieldDescriptorProto,
    map_entries: &HashSet<&str>,
) -> Result<FieldDescriptor, Error> {
    let name = proto.name.clone().ok_or(Error::MissingName)?;
    let full_name = format!("{}.{}", pending.full_name, name);

    let number = proto.number.ok_or(Error::MissingFieldNumber)?;
    if number < MINIMUM_TAG_VAL as i32 || number > MAXIMUM_TAG_VAL as i32 {
        return Err(Error::InvalidFieldNumber(number as u64));
    }

    let raw_type = proto.r#type.ok_or(Error::InvalidFieldType(0))?;
    let ty = Type::try_from(raw_type).map_err(Error::InvalidFieldType)?;
    let kind = Kind::from_type(ty).ok_or_else(|| Error::UnsupportedGroup(full_name.clone()))?;

    let label = match proto.label {
        Some(raw) => Label::try_from(raw).map_err(Error::InvalidLabel)?,
        None => Label::Optional,
    };

    let type_name = match kind {
        Kind::Message | Kind::Enum => {
            let type_name = proto
                .type_name
                .as_deref()
                .ok_or_else(|| Error::UnresolvedType {
                    field: full_name.clone(),
                    type_name: String::new(),
                })?;
            Some(type_name.trim_start_matches('.').to_string())
        }
        _ => None,
    };

    let cardinality = match label {
        Label::Repeated
            if kind == Kind::Message
                && type_name
                    .as_deref()
                    .map(|t| map_entries.contains(t))
                    .unwrap_or(false) =>
        {
            Cardinality::Map
        }
        Label::Repeated => Cardinality::Repeated,
        Label::Optional | Label::Required => Cardinality::Singular,
    };

    let oneof_index = match proto.oneof_index {
        Some(index) if index < 0 || index as usize >= pending.proto.oneof_decl.len() => {
            return Err(Error::InvalidOneofIndex {
                message: pending.full_name.clone(),
                field: name,
                index,
            });
        }
        Some(index) => Some(index as usize),
        None => None,
    };

    let packed = cardinality == Cardinality::Repeated
        && kind.is_packable()
        && proto
            .options
            .as_ref()
            .and_then(|o| o.packed)
            .unwrap_or(pending.syntax == Syntax::Proto3);

    let json_name = proto
        .json_name
        .clone()
        .unwrap_or_else(|| to_json_name(&name));

    Ok(FieldDescriptor {
        name,
        full_name,
        json_name,
        number: number as u32,
        kind,
        cardinality,
        type_name,
        oneof_index,
        proto3_optional: proto.proto3_optional.unwrap_or(false),
        packed,
        default_value: proto.default_value.clone(),
        map_entry: None,
    })
}

fn build_enum(pending: &PendingEnum<'_>) -> Result<EnumDescriptor, Error> {
    let values = pending
        .proto
        .value
        .iter()
        .map(|value| -> Result<EnumValueDescriptor, Error> {
            Ok(EnumValueDescriptor {
                name: value.name.clone().ok_or(Error::MissingName)?,
                number: value.number.ok_or(Error::MissingFieldNumber)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(EnumDescriptor {
        full_name: pending.full_name.clone(),
        name: pending.proto.name.clone().unwrap_or_default(),
        values,
        closed: pending.syntax == Syntax::Proto2,
    })
}

/// Extract key (tag 1) and value (tag 2) fields of a map entry.
fn map_entry_info(full_name: &str, fields: &[FieldDescriptor]) -> Result<MapEntryInfo, Error> {
    let key = fields.iter().find(|f| f.number == 1);
    let value = fields.iter().find(|f| f.number == 2);
    match (key, value) {
        (Some(key), Some(value))
            if fields.len() == 2
                && key.cardinality == Cardinality::Singular
                && key.kind.is_valid_map_key()
                && value.cardinality == Cardinality::Singular =>
        {
            Ok(MapEntryInfo {
                key: key.clone(),
                value: value.clone(),
            })
        }
        _ => Err(Error::InvalidMapEntry(full_name.to_string())),
    }
}

/// Convert a field name to its JSON name, following protoc: underscores are
/// dropped and the character after each one is upper-cased.
///
/// - "disable_check" -> "disableCheck"
/// - "type_env" -> "typeEnv"
/// - "int64_value" -> "int64Value"
pub fn to_json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
