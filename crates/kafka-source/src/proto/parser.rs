//! Runtime `.proto` schema compilation.
//!
//! Compiles `.proto` sources into a [`ProtoSchema`] at startup using
//! `protobuf-parse`, with no code generation step. Message types (top level
//! and nested) and enum types are collected from every parsed file
//! descriptor, so types pulled in through imports resolve as well.

use crate::error::{Error, Result};
use proto_types::{
    ProtoEnumDescriptor, ProtoFieldDescriptor, ProtoMessageDescriptor, ProtoSchema, ProtoType,
};
use protobuf::descriptor::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto};
use protobuf_parse::Parser;
use std::path::Path;

/// Parse a `.proto` file and build a schema.
///
/// The file's parent directory is registered as the include root, so
/// imports living next to the schema (e.g. `google/protobuf/*.proto`
/// vendored alongside it) resolve.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ProtoSchema> {
    let path = path.as_ref();

    let mut parser = Parser::new();
    parser.input(path);
    if let Some(parent) = path.parent() {
        parser.include(parent);
    }

    let parsed = parser
        .parse_and_typecheck()
        .map_err(|e| Error::ProtobufParse(e.to_string()))?;

    let mut schema = ProtoSchema::default();

    for file_descriptor in parsed.file_descriptors {
        let package = file_descriptor.package.clone().unwrap_or_default();
        for message in &file_descriptor.message_type {
            collect_message(&package, message, &mut schema)?;
        }
        for enum_descriptor in &file_descriptor.enum_type {
            collect_enum(&package, enum_descriptor, &mut schema);
        }
    }

    Ok(schema)
}

/// Parse `.proto` content from a string.
pub fn parse_str(content: &str) -> Result<ProtoSchema> {
    use std::io::Write;

    let mut temp_file = tempfile::Builder::new()
        .suffix(".proto")
        .tempfile()
        .map_err(|e| Error::ProtobufParse(format!("Failed to create temp file: {e}")))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| Error::ProtobufParse(format!("Failed to write temp file: {e}")))?;

    parse_file(temp_file.path())
}

fn collect_message(prefix: &str, message: &DescriptorProto, schema: &mut ProtoSchema) -> Result<()> {
    let simple_name = message.name.clone().unwrap_or_default();
    let qualified_name = qualify(prefix, &simple_name);

    let mut fields = std::collections::HashMap::new();
    let mut field_order = Vec::new();

    for field in &message.field {
        let field_name = field.name.clone().unwrap_or_default();
        if field_name.is_empty() {
            continue;
        }
        field_order.push(field_name.clone());

        let descriptor = ProtoFieldDescriptor {
            name: field_name.clone(),
            number: field.number.unwrap_or(0),
            field_type: parse_field_type(field)?,
            is_repeated: field.label
                == Some(
                    protobuf::descriptor::field_descriptor_proto::Label::LABEL_REPEATED.into(),
                ),
            has_presence: field.proto3_optional.unwrap_or(false),
        };

        fields.insert(field_name, descriptor);
    }

    schema.messages.insert(
        simple_name,
        ProtoMessageDescriptor {
            name: qualified_name.clone(),
            fields,
            field_order,
        },
    );

    // nested types are registered under their simple names, like top-level
    // ones, because field type references are resolved by last path segment
    for nested in &message.nested_type {
        collect_message(&qualified_name, nested, schema)?;
    }
    for nested_enum in &message.enum_type {
        collect_enum(&qualified_name, nested_enum, schema);
    }

    Ok(())
}

fn collect_enum(prefix: &str, enum_descriptor: &EnumDescriptorProto, schema: &mut ProtoSchema) {
    let simple_name = enum_descriptor.name.clone().unwrap_or_default();

    let mut descriptor = ProtoEnumDescriptor {
        name: qualify(prefix, &simple_name),
        ..Default::default()
    };

    for value in &enum_descriptor.value {
        let value_name = value.name.clone().unwrap_or_default();
        // with allow_alias the first name declared for a number wins
        descriptor
            .values
            .entry(value.number.unwrap_or(0))
            .or_insert(value_name);
    }

    schema.enums.insert(simple_name, descriptor);
}

fn qualify(prefix: &str, simple_name: &str) -> String {
    if prefix.is_empty() {
        simple_name.to_string()
    } else {
        format!("{prefix}.{simple_name}")
    }
}

fn parse_field_type(field: &FieldDescriptorProto) -> Result<ProtoType> {
    use protobuf::descriptor::field_descriptor_proto::Type;

    let field_type = field
        .type_
        .ok_or_else(|| Error::ProtobufParse("Field missing type".to_string()))?
        .enum_value_or_default();

    Ok(match field_type {
        Type::TYPE_DOUBLE => ProtoType::Double,
        Type::TYPE_FLOAT => ProtoType::Float,
        Type::TYPE_INT64 => ProtoType::Int64,
        Type::TYPE_UINT64 => ProtoType::Uint64,
        Type::TYPE_INT32 => ProtoType::Int32,
        Type::TYPE_FIXED64 => ProtoType::Fixed64,
        Type::TYPE_FIXED32 => ProtoType::Fixed32,
        Type::TYPE_BOOL => ProtoType::Bool,
        Type::TYPE_STRING => ProtoType::String,
        Type::TYPE_BYTES => ProtoType::Bytes,
        Type::TYPE_UINT32 => ProtoType::Uint32,
        Type::TYPE_SFIXED32 => ProtoType::Sfixed32,
        Type::TYPE_SFIXED64 => ProtoType::Sfixed64,
        Type::TYPE_SINT32 => ProtoType::Sint32,
        Type::TYPE_SINT64 => ProtoType::Sint64,
        Type::TYPE_MESSAGE => ProtoType::Message(field.type_name.clone().unwrap_or_default()),
        Type::TYPE_ENUM => ProtoType::Enum(field.type_name.clone().unwrap_or_default()),
        Type::TYPE_GROUP => {
            return Err(Error::ProtobufParse(
                "Proto2 groups are deprecated and not supported".to_string(),
            ))
        }
    })
}
