//! Runtime protobuf wire decoder.
//!
//! Decodes binary payloads into [`ProtoMessage`] values using a parsed
//! [`ProtoSchema`], honoring proto3 wire semantics: packed and unpacked
//! repeated scalars, zigzag (`sint*`) and fixed-width types, unknown fields
//! skipped by wire type, and proto3 defaults materialized for fields absent
//! from the wire.

use crate::error::{Error, Result};
use proto_types::{
    ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage, ProtoMessageDescriptor, ProtoSchema,
    ProtoType,
};
use protobuf::CodedInputStream;
use std::collections::HashMap;

const WIRE_VARINT: u32 = 0;
const WIRE_FIXED64: u32 = 1;
const WIRE_LEN: u32 = 2;
const WIRE_START_GROUP: u32 = 3;
const WIRE_END_GROUP: u32 = 4;
const WIRE_FIXED32: u32 = 5;

/// Runtime protobuf decoder.
pub struct ProtoDecoder {
    schema: ProtoSchema,
}

impl ProtoDecoder {
    /// Create a new decoder from a schema.
    pub fn new(schema: ProtoSchema) -> Self {
        Self { schema }
    }

    /// Get a reference to the schema.
    pub fn schema(&self) -> &ProtoSchema {
        &self.schema
    }

    /// Decode a protobuf message from bytes.
    ///
    /// An empty payload is a valid message with every field at its default.
    pub fn decode(&self, message_type: &str, data: &[u8]) -> Result<ProtoMessage> {
        let descriptor = self
            .schema
            .get_message(message_type)
            .ok_or_else(|| Error::MessageTypeNotFound {
                name: message_type.to_string(),
                available: self.schema.list_messages(),
            })?;
        let mut stream = CodedInputStream::from_bytes(data);
        self.decode_message(descriptor, &mut stream)
    }

    fn decode_message(
        &self,
        descriptor: &ProtoMessageDescriptor,
        stream: &mut CodedInputStream,
    ) -> Result<ProtoMessage> {
        let mut fields = HashMap::new();

        loop {
            if stream.eof().map_err(decode_err)? {
                break;
            }

            let tag = stream.read_raw_varint32().map_err(decode_err)?;
            let field_number = (tag >> 3) as i32;
            let wire_type = tag & 0x7;

            if field_number == 0 {
                return Err(Error::ProtobufDecode(format!(
                    "Invalid field number 0 in message {}",
                    descriptor.name
                )));
            }

            // Find the field descriptor by number; unknown fields are
            // skipped by wire type, like every protobuf runtime does
            let Some(field_desc) = descriptor
                .fields
                .values()
                .find(|f| f.number == field_number)
            else {
                skip_field(wire_type, stream)?;
                continue;
            };

            if field_desc.is_repeated {
                if wire_type == WIRE_LEN && is_packable(&field_desc.field_type) {
                    // packed encoding: a single length-delimited block of
                    // concatenated scalar values
                    let len = stream.read_raw_varint64().map_err(decode_err)?;
                    let old_limit = stream.push_limit(len).map_err(decode_err)?;
                    let mut packed = Vec::new();
                    while !stream.eof().map_err(decode_err)? {
                        packed.push(self.decode_value(field_desc, stream)?);
                    }
                    stream.pop_limit(old_limit);

                    let existing = fields
                        .entry(field_desc.name.clone())
                        .or_insert_with(|| ProtoFieldValue::Repeated(Vec::new()));
                    if let ProtoFieldValue::Repeated(values) = existing {
                        values.append(&mut packed);
                    }
                } else {
                    check_wire_type(field_desc, wire_type)?;
                    let value = self.decode_value(field_desc, stream)?;
                    let existing = fields
                        .entry(field_desc.name.clone())
                        .or_insert_with(|| ProtoFieldValue::Repeated(Vec::new()));
                    if let ProtoFieldValue::Repeated(values) = existing {
                        values.push(value);
                    }
                }
            } else {
                check_wire_type(field_desc, wire_type)?;
                let value = self.decode_value(field_desc, stream)?;
                fields.insert(field_desc.name.clone(), value);
            }
        }

        // Proto3 omits default-valued fields from the wire; receivers are
        // expected to materialize the defaults. Message-typed fields and
        // explicit `optional` fields keep their absence.
        for field_name in &descriptor.field_order {
            if fields.contains_key(field_name) {
                continue;
            }
            if let Some(field_desc) = descriptor.fields.get(field_name) {
                if let Some(default) = self.default_value(field_desc) {
                    fields.insert(field_name.clone(), default);
                }
            }
        }

        Ok(ProtoMessage {
            message_type: descriptor.name.clone(),
            fields,
            descriptor: descriptor.clone(),
        })
    }

    fn decode_value(
        &self,
        field_desc: &ProtoFieldDescriptor,
        stream: &mut CodedInputStream,
    ) -> Result<ProtoFieldValue> {
        match &field_desc.field_type {
            ProtoType::Double => Ok(ProtoFieldValue::Double(
                stream.read_double().map_err(decode_err)?,
            )),
            ProtoType::Float => Ok(ProtoFieldValue::Float(
                stream.read_float().map_err(decode_err)?,
            )),
            ProtoType::Int32 => Ok(ProtoFieldValue::Int32(
                stream.read_int32().map_err(decode_err)?,
            )),
            ProtoType::Int64 => Ok(ProtoFieldValue::Int64(
                stream.read_int64().map_err(decode_err)?,
            )),
            ProtoType::Uint32 => Ok(ProtoFieldValue::Uint32(
                stream.read_uint32().map_err(decode_err)?,
            )),
            ProtoType::Uint64 => Ok(ProtoFieldValue::Uint64(
                stream.read_uint64().map_err(decode_err)?,
            )),
            ProtoType::Sint32 => Ok(ProtoFieldValue::Int32(
                stream.read_sint32().map_err(decode_err)?,
            )),
            ProtoType::Sint64 => Ok(ProtoFieldValue::Int64(
                stream.read_sint64().map_err(decode_err)?,
            )),
            ProtoType::Fixed32 => Ok(ProtoFieldValue::Uint32(
                stream.read_fixed32().map_err(decode_err)?,
            )),
            ProtoType::Fixed64 => Ok(ProtoFieldValue::Uint64(
                stream.read_fixed64().map_err(decode_err)?,
            )),
            ProtoType::Sfixed32 => Ok(ProtoFieldValue::Int32(
                stream.read_sfixed32().map_err(decode_err)?,
            )),
            ProtoType::Sfixed64 => Ok(ProtoFieldValue::Int64(
                stream.read_sfixed64().map_err(decode_err)?,
            )),
            ProtoType::Bool => Ok(ProtoFieldValue::Bool(
                stream.read_bool().map_err(decode_err)?,
            )),
            ProtoType::String => Ok(ProtoFieldValue::String(
                stream.read_string().map_err(decode_err)?,
            )),
            ProtoType::Bytes => Ok(ProtoFieldValue::Bytes(
                stream.read_bytes().map_err(decode_err)?,
            )),
            ProtoType::Enum(type_name) => {
                let number = stream.read_int32().map_err(decode_err)?;
                Ok(ProtoFieldValue::Enum {
                    number,
                    name: self.enum_value_name(type_name, number),
                })
            }
            ProtoType::Message(type_name) => {
                let len = stream.read_raw_varint64().map_err(decode_err)?;
                let old_limit = stream.push_limit(len).map_err(decode_err)?;

                let nested_descriptor = self.resolve_message(type_name)?;
                let nested_message = self.decode_message(nested_descriptor, stream)?;

                stream.pop_limit(old_limit);

                Ok(ProtoFieldValue::Message(Box::new(nested_message)))
            }
        }
    }

    fn resolve_message(&self, type_name: &str) -> Result<&ProtoMessageDescriptor> {
        // field type references are fully qualified (".pkg.Type"); the
        // schema is keyed by simple name
        let simple_type = simple_name(type_name);
        self.schema
            .get_message(simple_type)
            .ok_or_else(|| Error::MessageTypeNotFound {
                name: simple_type.to_string(),
                available: self.schema.list_messages(),
            })
    }

    fn enum_value_name(&self, type_name: &str, number: i32) -> Option<String> {
        self.schema
            .get_enum(simple_name(type_name))
            .and_then(|e| e.name_of(number))
            .map(|s| s.to_string())
    }

    fn default_value(&self, field_desc: &ProtoFieldDescriptor) -> Option<ProtoFieldValue> {
        if field_desc.has_presence {
            return None;
        }
        if field_desc.is_repeated {
            return Some(ProtoFieldValue::Repeated(Vec::new()));
        }
        match &field_desc.field_type {
            ProtoType::Double => Some(ProtoFieldValue::Double(0.0)),
            ProtoType::Float => Some(ProtoFieldValue::Float(0.0)),
            ProtoType::Int32 | ProtoType::Sint32 | ProtoType::Sfixed32 => {
                Some(ProtoFieldValue::Int32(0))
            }
            ProtoType::Int64 | ProtoType::Sint64 | ProtoType::Sfixed64 => {
                Some(ProtoFieldValue::Int64(0))
            }
            ProtoType::Uint32 | ProtoType::Fixed32 => Some(ProtoFieldValue::Uint32(0)),
            ProtoType::Uint64 | ProtoType::Fixed64 => Some(ProtoFieldValue::Uint64(0)),
            ProtoType::Bool => Some(ProtoFieldValue::Bool(false)),
            ProtoType::String => Some(ProtoFieldValue::String(String::new())),
            ProtoType::Bytes => Some(ProtoFieldValue::Bytes(Vec::new())),
            ProtoType::Enum(type_name) => Some(ProtoFieldValue::Enum {
                number: 0,
                name: self.enum_value_name(type_name, 0),
            }),
            // an unset message field stays unset
            ProtoType::Message(_) => None,
        }
    }
}

fn decode_err(e: protobuf::Error) -> Error {
    Error::ProtobufDecode(e.to_string())
}

fn simple_name(type_name: &str) -> &str {
    type_name.split('.').next_back().unwrap_or(type_name)
}

fn expected_wire_type(field_type: &ProtoType) -> u32 {
    match field_type {
        ProtoType::Double | ProtoType::Fixed64 | ProtoType::Sfixed64 => WIRE_FIXED64,
        ProtoType::Float | ProtoType::Fixed32 | ProtoType::Sfixed32 => WIRE_FIXED32,
        ProtoType::Int32
        | ProtoType::Int64
        | ProtoType::Uint32
        | ProtoType::Uint64
        | ProtoType::Sint32
        | ProtoType::Sint64
        | ProtoType::Bool
        | ProtoType::Enum(_) => WIRE_VARINT,
        ProtoType::String | ProtoType::Bytes | ProtoType::Message(_) => WIRE_LEN,
    }
}

fn is_packable(field_type: &ProtoType) -> bool {
    !matches!(
        field_type,
        ProtoType::String | ProtoType::Bytes | ProtoType::Message(_)
    )
}

fn check_wire_type(field_desc: &ProtoFieldDescriptor, wire_type: u32) -> Result<()> {
    let expected = expected_wire_type(&field_desc.field_type);
    if wire_type != expected {
        return Err(Error::ProtobufDecode(format!(
            "Field '{}' ({}) has wire type {wire_type}, expected {expected}",
            field_desc.name, field_desc.field_type
        )));
    }
    Ok(())
}

fn skip_field(wire_type: u32, stream: &mut CodedInputStream) -> Result<()> {
    match wire_type {
        WIRE_VARINT => {
            stream.read_raw_varint64().map_err(decode_err)?;
        }
        WIRE_FIXED64 => {
            stream.read_fixed64().map_err(decode_err)?;
        }
        WIRE_LEN => {
            stream.read_bytes().map_err(decode_err)?;
        }
        WIRE_FIXED32 => {
            stream.read_fixed32().map_err(decode_err)?;
        }
        WIRE_START_GROUP | WIRE_END_GROUP => {
            return Err(Error::ProtobufDecode(
                "Group wire types are not supported".to_string(),
            ));
        }
        other => {
            return Err(Error::ProtobufDecode(format!(
                "Unknown wire type {other}"
            )));
        }
    }
    Ok(())
}
