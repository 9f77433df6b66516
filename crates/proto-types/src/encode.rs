//! Proto3 wire encoding of decoded messages.
//!
//! The inverse of the decoder in the kafka-source crate: a [`ProtoMessage`]
//! goes back to bytes following proto3 serialization rules — fields in
//! field-number order, default-valued scalars omitted (unless the field
//! tracks explicit presence), repeated fields written unpacked, nested
//! messages length-delimited.

use crate::error::{ProtoTypesError, Result};
use crate::proto::{ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage, ProtoType};
use protobuf::CodedOutputStream;

/// Encode a decoded message to proto3 wire format.
pub fn encode_message(message: &ProtoMessage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut buffer);
        encode_into(&mut stream, message)?;
        stream
            .flush()
            .map_err(|e| ProtoTypesError::ProtobufEncode(e.to_string()))?;
    }
    Ok(buffer)
}

fn encode_into(stream: &mut CodedOutputStream, message: &ProtoMessage) -> Result<()> {
    let mut descriptors: Vec<&ProtoFieldDescriptor> = message.descriptor.fields.values().collect();
    descriptors.sort_by_key(|d| d.number);

    for descriptor in descriptors {
        let Some(value) = message.fields.get(&descriptor.name) else {
            continue;
        };
        if descriptor.is_repeated {
            let ProtoFieldValue::Repeated(elements) = value else {
                return Err(mismatch(descriptor));
            };
            for element in elements {
                write_value(stream, descriptor, element)?;
            }
        } else {
            // proto3 omits default-valued scalars unless the field tracks
            // explicit presence
            if !descriptor.has_presence && is_default(value) {
                continue;
            }
            write_value(stream, descriptor, value)?;
        }
    }

    Ok(())
}

fn write_value(
    stream: &mut CodedOutputStream,
    descriptor: &ProtoFieldDescriptor,
    value: &ProtoFieldValue,
) -> Result<()> {
    let field_number = descriptor.number as u32;

    if let (ProtoType::Message(_), ProtoFieldValue::Message(inner)) =
        (&descriptor.field_type, value)
    {
        let mut nested = Vec::new();
        {
            let mut nested_stream = CodedOutputStream::vec(&mut nested);
            encode_into(&mut nested_stream, inner)?;
            nested_stream
                .flush()
                .map_err(|e| ProtoTypesError::ProtobufEncode(e.to_string()))?;
        }
        return stream
            .write_bytes(field_number, &nested)
            .map_err(|e| ProtoTypesError::ProtobufEncode(e.to_string()));
    }

    let written = match (&descriptor.field_type, value) {
        (ProtoType::Double, ProtoFieldValue::Double(v)) => stream.write_double(field_number, *v),
        (ProtoType::Float, ProtoFieldValue::Float(v)) => stream.write_float(field_number, *v),
        (ProtoType::Int32, ProtoFieldValue::Int32(v)) => stream.write_int32(field_number, *v),
        (ProtoType::Int64, ProtoFieldValue::Int64(v)) => stream.write_int64(field_number, *v),
        (ProtoType::Uint32, ProtoFieldValue::Uint32(v)) => stream.write_uint32(field_number, *v),
        (ProtoType::Uint64, ProtoFieldValue::Uint64(v)) => stream.write_uint64(field_number, *v),
        (ProtoType::Sint32, ProtoFieldValue::Int32(v)) => stream.write_sint32(field_number, *v),
        (ProtoType::Sint64, ProtoFieldValue::Int64(v)) => stream.write_sint64(field_number, *v),
        (ProtoType::Fixed32, ProtoFieldValue::Uint32(v)) => stream.write_fixed32(field_number, *v),
        (ProtoType::Fixed64, ProtoFieldValue::Uint64(v)) => stream.write_fixed64(field_number, *v),
        (ProtoType::Sfixed32, ProtoFieldValue::Int32(v)) => {
            stream.write_sfixed32(field_number, *v)
        }
        (ProtoType::Sfixed64, ProtoFieldValue::Int64(v)) => {
            stream.write_sfixed64(field_number, *v)
        }
        (ProtoType::Bool, ProtoFieldValue::Bool(v)) => stream.write_bool(field_number, *v),
        (ProtoType::String, ProtoFieldValue::String(v)) => stream.write_string(field_number, v),
        (ProtoType::Bytes, ProtoFieldValue::Bytes(v)) => stream.write_bytes(field_number, v),
        // enum values share the int32 varint encoding
        (ProtoType::Enum(_), ProtoFieldValue::Enum { number, .. }) => {
            stream.write_int32(field_number, *number)
        }
        _ => return Err(mismatch(descriptor)),
    };

    written.map_err(|e| ProtoTypesError::ProtobufEncode(e.to_string()))
}

fn mismatch(descriptor: &ProtoFieldDescriptor) -> ProtoTypesError {
    ProtoTypesError::TypeMismatch {
        field: descriptor.name.clone(),
        expected: descriptor.field_type.type_name(),
    }
}

fn is_default(value: &ProtoFieldValue) -> bool {
    match value {
        ProtoFieldValue::Double(v) => *v == 0.0,
        ProtoFieldValue::Float(v) => *v == 0.0,
        ProtoFieldValue::Int32(v) => *v == 0,
        ProtoFieldValue::Int64(v) => *v == 0,
        ProtoFieldValue::Uint32(v) => *v == 0,
        ProtoFieldValue::Uint64(v) => *v == 0,
        ProtoFieldValue::Bool(v) => !v,
        ProtoFieldValue::String(v) => v.is_empty(),
        ProtoFieldValue::Bytes(v) => v.is_empty(),
        ProtoFieldValue::Enum { number, .. } => *number == 0,
        ProtoFieldValue::Message(_) => false,
        ProtoFieldValue::Repeated(v) => v.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ProtoMessageDescriptor;
    use std::collections::HashMap;

    fn field(
        name: &str,
        number: i32,
        field_type: ProtoType,
        is_repeated: bool,
        has_presence: bool,
    ) -> ProtoFieldDescriptor {
        ProtoFieldDescriptor {
            name: name.to_string(),
            number,
            field_type,
            is_repeated,
            has_presence,
        }
    }

    fn message(
        descriptors: Vec<ProtoFieldDescriptor>,
        fields: Vec<(&str, ProtoFieldValue)>,
    ) -> ProtoMessage {
        let field_order = descriptors.iter().map(|d| d.name.clone()).collect();
        let descriptor = ProtoMessageDescriptor {
            name: "Test".to_string(),
            fields: descriptors.into_iter().map(|d| (d.name.clone(), d)).collect(),
            field_order,
        };
        ProtoMessage {
            message_type: "Test".to_string(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            descriptor,
        }
    }

    #[test]
    fn test_encode_simple_message() {
        let msg = message(
            vec![
                field("id", 1, ProtoType::Int32, false, false),
                field("name", 2, ProtoType::String, false, false),
            ],
            vec![
                ("id", ProtoFieldValue::Int32(1)),
                ("name", ProtoFieldValue::String("x".to_string())),
            ],
        );

        // field 1 varint 1, field 2 length-delimited "x"
        assert_eq!(encode_message(&msg).unwrap(), vec![0x08, 0x01, 0x12, 0x01, 0x78]);
    }

    #[test]
    fn test_default_scalars_are_omitted() {
        let msg = message(
            vec![
                field("id", 1, ProtoType::Int32, false, false),
                field("active", 2, ProtoType::Bool, false, false),
            ],
            vec![
                ("id", ProtoFieldValue::Int32(0)),
                ("active", ProtoFieldValue::Bool(false)),
            ],
        );

        assert!(encode_message(&msg).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_presence_writes_default_value() {
        let msg = message(
            vec![field("count", 1, ProtoType::Int32, false, true)],
            vec![("count", ProtoFieldValue::Int32(0))],
        );

        assert_eq!(encode_message(&msg).unwrap(), vec![0x08, 0x00]);
    }

    #[test]
    fn test_repeated_fields_write_one_tag_per_element() {
        let msg = message(
            vec![field("tags", 1, ProtoType::String, true, false)],
            vec![(
                "tags",
                ProtoFieldValue::Repeated(vec![
                    ProtoFieldValue::String("a".to_string()),
                    ProtoFieldValue::String("b".to_string()),
                ]),
            )],
        );

        assert_eq!(
            encode_message(&msg).unwrap(),
            vec![0x0a, 0x01, 0x61, 0x0a, 0x01, 0x62]
        );
    }

    #[test]
    fn test_fields_encode_in_number_order() {
        // declaration order differs from field-number order
        let msg = message(
            vec![
                field("later", 2, ProtoType::Int32, false, false),
                field("first", 1, ProtoType::Int32, false, false),
            ],
            vec![
                ("later", ProtoFieldValue::Int32(2)),
                ("first", ProtoFieldValue::Int32(1)),
            ],
        );

        assert_eq!(encode_message(&msg).unwrap(), vec![0x08, 0x01, 0x10, 0x02]);
    }

    #[test]
    fn test_zigzag_encoding_for_sint_fields() {
        let msg = message(
            vec![field("delta", 1, ProtoType::Sint32, false, false)],
            vec![("delta", ProtoFieldValue::Int32(-1))],
        );

        // zigzag(-1) == 1
        assert_eq!(encode_message(&msg).unwrap(), vec![0x08, 0x01]);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let msg = message(
            vec![field("id", 1, ProtoType::Int32, false, false)],
            vec![("id", ProtoFieldValue::String("oops".to_string()))],
        );

        assert!(matches!(
            encode_message(&msg),
            Err(ProtoTypesError::TypeMismatch { .. })
        ));
    }
}
