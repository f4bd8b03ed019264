//! The built-in schema: protobuf well-known types and the CEL conformance
//! test messages.
//!
//! The descriptors are assembled as [`FileDescriptorProto`]s and go through
//! the same [`DescriptorPool`] validation as a descriptor set read from disk.

mod cel;
mod test_all_types;
mod wkt;

use protomon_reflect::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, OneofDescriptorProto, Type,
};
use protomon_reflect::DescriptorPool;

/// Top-level message of a conformance test document.
pub const SIMPLE_TEST_FILE: &str = "cel.expr.conformance.test.SimpleTestFile";

/// Every built-in file, dependencies first.
pub fn builtin_files() -> Vec<FileDescriptorProto> {
    let mut files = wkt::files();
    files.extend(cel::files());
    files.extend(test_all_types::files());
    files
}

/// A pool holding the built-in files.
pub fn builtin_pool() -> Result<DescriptorPool, protomon_reflect::Error> {
    let mut pool = DescriptorPool::new();
    for file in builtin_files() {
        pool.add_file(file)?;
    }
    Ok(pool)
}

const LABEL_OPTIONAL: i32 = 1;
const LABEL_REPEATED: i32 = 3;

fn file(
    name: &str,
    package: &str,
    dependency: &[&str],
    messages: Vec<DescriptorProto>,
    enums: Vec<EnumDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        dependency: dependency.iter().map(|d| d.to_string()).collect(),
        message_type: messages,
        enum_type: enums,
        syntax: Some("proto3".to_string()),
    }
}

fn enumeration(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(*number),
            })
            .collect(),
    }
}

/// Builds one [`DescriptorProto`] in declaration order.
struct Message {
    proto: DescriptorProto,
    oneof: Option<i32>,
}

impl Message {
    fn new(name: &str) -> Self {
        Self {
            proto: DescriptorProto {
                name: Some(name.to_string()),
                ..Default::default()
            },
            oneof: None,
        }
    }

    fn push(mut self, mut field: FieldDescriptorProto) -> Self {
        field.oneof_index = self.oneof;
        self.proto.field.push(field);
        self
    }

    /// A singular scalar field.
    fn scalar(self, name: &str, number: i32, ty: Type) -> Self {
        self.push(field(name, number, LABEL_OPTIONAL, ty, None))
    }

    fn repeated_scalar(self, name: &str, number: i32, ty: Type) -> Self {
        self.push(field(name, number, LABEL_REPEATED, ty, None))
    }

    /// A singular message field; `type_name` is fully qualified.
    fn message(self, name: &str, number: i32, type_name: &str) -> Self {
        self.push(field(name, number, LABEL_OPTIONAL, Type::Message, Some(type_name)))
    }

    fn repeated_message(self, name: &str, number: i32, type_name: &str) -> Self {
        self.push(field(name, number, LABEL_REPEATED, Type::Message, Some(type_name)))
    }

    fn enumeration(self, name: &str, number: i32, type_name: &str) -> Self {
        self.push(field(name, number, LABEL_OPTIONAL, Type::Enum, Some(type_name)))
    }

    fn repeated_enumeration(self, name: &str, number: i32, type_name: &str) -> Self {
        self.push(field(name, number, LABEL_REPEATED, Type::Enum, Some(type_name)))
    }

    /// A proto2 scalar with a `[default = ...]` value in text form.
    fn scalar_with_default(self, name: &str, number: i32, ty: Type, default: &str) -> Self {
        let mut field = field(name, number, LABEL_OPTIONAL, ty, None);
        field.default_value = Some(default.to_string());
        self.push(field)
    }

    /// A proto3 `optional` field and the synthetic oneof protoc declares for it.
    fn proto3_optional(mut self, name: &str, number: i32, ty: Type, type_name: Option<&str>) -> Self {
        let index = self.proto.oneof_decl.len() as i32;
        self.proto.oneof_decl.push(OneofDescriptorProto {
            name: Some(format!("_{name}")),
        });
        let mut field = field(name, number, LABEL_OPTIONAL, ty, type_name);
        field.oneof_index = Some(index);
        field.proto3_optional = Some(true);
        self.proto.field.push(field);
        self
    }

    /// A map field. `scope` is the full name of this message, which owns the
    /// generated entry type.
    fn map(mut self, name: &str, number: i32, scope: &str, key: Type, value: MapValueType<'_>) -> Self {
        let entry_name = format!("{}Entry", upper_camel(name));
        let value_field = match value {
            MapValueType::Scalar(ty) => field("value", 2, LABEL_OPTIONAL, ty, None),
            MapValueType::Message(type_name) => {
                field("value", 2, LABEL_OPTIONAL, Type::Message, Some(type_name))
            }
            MapValueType::Enum(type_name) => {
                field("value", 2, LABEL_OPTIONAL, Type::Enum, Some(type_name))
            }
        };
        self.proto.nested_type.push(DescriptorProto {
            name: Some(entry_name.clone()),
            field: vec![field("key", 1, LABEL_OPTIONAL, key, None), value_field],
            options: Some(MessageOptions {
                map_entry: Some(true),
            }),
            ..Default::default()
        });
        let type_name = format!(".{scope}.{entry_name}");
        self.push(field(name, number, LABEL_REPEATED, Type::Message, Some(&type_name)))
    }

    /// Fields added inside `build` belong to a new oneof named `name`.
    fn oneof(mut self, name: &str, build: impl FnOnce(Self) -> Self) -> Self {
        let index = self.proto.oneof_decl.len() as i32;
        self.proto.oneof_decl.push(OneofDescriptorProto {
            name: Some(name.to_string()),
        });
        self.oneof = Some(index);
        let mut built = build(self);
        built.oneof = None;
        built
    }

    fn nested(mut self, message: Message) -> Self {
        self.proto.nested_type.push(message.build());
        self
    }

    fn nested_enum(mut self, enum_type: EnumDescriptorProto) -> Self {
        self.proto.enum_type.push(enum_type);
        self
    }

    fn build(self) -> DescriptorProto {
        self.proto
    }
}

enum MapValueType<'a> {
    Scalar(Type),
    Message(&'a str),
    Enum(&'a str),
}

fn field(
    name: &str,
    number: i32,
    label: i32,
    ty: Type,
    type_name: Option<&str>,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        ..Default::default()
    }
}

/// `bindings` -> `Bindings`, `field_values` -> `FieldValues`, as protoc names map entries.
fn upper_camel(name: &str) -> String {
    let camel = protomon_reflect::pool::to_json_name(name);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protomon_reflect::{Cardinality, Kind};

    #[test]
    fn test_builtin_pool_validates() {
        let pool = builtin_pool().unwrap();
        assert_eq!(pool.file_names().len(), builtin_files().len());

        let test = pool
            .expect_message("cel.expr.conformance.test.SimpleTest")
            .unwrap();
        let bindings = test.get_field_by_name("bindings").unwrap();
        assert_eq!(bindings.cardinality(), Cardinality::Map);
        assert_eq!(bindings.json_name(), "bindings");

        let oneof = &test.oneofs()[0];
        assert_eq!(oneof.name(), "result_matcher");
        assert_eq!(oneof.field_numbers(), &[8, 16, 9, 10, 11, 12]);

        let disable_check = test.get_field_by_name("disable_check").unwrap();
        assert_eq!(disable_check.json_name(), "disableCheck");
        assert_eq!(disable_check.kind(), Kind::Bool);
    }

    #[test]
    fn test_simple_test_file_fields() {
        let pool = builtin_pool().unwrap();
        let file = pool.expect_message(SIMPLE_TEST_FILE).unwrap();
        let names: Vec<&str> = file.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "description", "section", "test"]);
    }

    #[test]
    fn test_struct_fields_entry() {
        let pool = builtin_pool().unwrap();
        assert!(pool
            .get_message("google.protobuf.Struct.FieldsEntry")
            .is_some_and(|entry| entry.is_map_entry()));
        assert_eq!(upper_camel("field_values"), "FieldValues");
    }
}
