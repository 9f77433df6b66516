//! JSON rendering of decoded protobuf messages.
//!
//! Follows the canonical protobuf JSON mapping: 64-bit integers render as
//! strings, bytes as standard base64, enums as their symbolic names, and
//! non-finite floats as "NaN"/"Infinity"/"-Infinity". Field names are kept
//! exactly as declared in the `.proto` source, and fields are emitted in
//! declaration order.

use crate::proto::{ProtoFieldValue, ProtoMessage};
use base64::Engine;
use serde_json::{json, Value};

/// Render a decoded message as a JSON object.
///
/// Only fields present in the message are emitted; the decoder has already
/// materialized proto3 defaults, so what remains absent (unset message-typed
/// or explicit `optional` fields) is omitted here as well.
pub fn message_to_json(message: &ProtoMessage) -> Value {
    let mut object = serde_json::Map::new();
    for field_name in message.descriptor.list_fields() {
        if let Some(value) = message.fields.get(field_name) {
            object.insert(field_name.clone(), field_to_json(value));
        }
    }
    Value::Object(object)
}

/// Render a single field value.
pub fn field_to_json(value: &ProtoFieldValue) -> Value {
    match value {
        ProtoFieldValue::Double(v) => float_to_json(*v),
        // widened through the decimal repr so 1.1f32 renders as 1.1, not
        // 1.100000023841858
        ProtoFieldValue::Float(v) if v.is_finite() => {
            float_to_json(v.to_string().parse().unwrap_or_else(|_| f64::from(*v)))
        }
        ProtoFieldValue::Float(v) => float_to_json(f64::from(*v)),
        ProtoFieldValue::Int32(v) => json!(v),
        ProtoFieldValue::Uint32(v) => json!(v),
        ProtoFieldValue::Int64(v) => Value::String(v.to_string()),
        ProtoFieldValue::Uint64(v) => Value::String(v.to_string()),
        ProtoFieldValue::Bool(v) => json!(v),
        ProtoFieldValue::String(v) => json!(v),
        ProtoFieldValue::Bytes(v) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(v))
        }
        ProtoFieldValue::Enum { number, name } => match name {
            Some(name) => Value::String(name.clone()),
            // numbers outside the declared enum values stay numeric
            None => json!(number),
        },
        ProtoFieldValue::Message(inner) => message_to_json(inner),
        ProtoFieldValue::Repeated(values) => {
            Value::Array(values.iter().map(field_to_json).collect())
        }
    }
}

fn float_to_json(v: f64) -> Value {
    if v.is_nan() {
        Value::String("NaN".to_string())
    } else if v.is_infinite() {
        Value::String(if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else {
        json!(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{ProtoFieldDescriptor, ProtoMessageDescriptor, ProtoType};
    use std::collections::HashMap;

    fn descriptor(fields: Vec<(&str, i32, ProtoType)>) -> ProtoMessageDescriptor {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for (name, number, field_type) in fields {
            order.push(name.to_string());
            map.insert(
                name.to_string(),
                ProtoFieldDescriptor {
                    name: name.to_string(),
                    number,
                    field_type,
                    is_repeated: false,
                    has_presence: false,
                },
            );
        }
        ProtoMessageDescriptor {
            name: "Test".to_string(),
            fields: map,
            field_order: order,
        }
    }

    #[test]
    fn test_fields_render_in_declaration_order() {
        // declaration order differs from alphabetical order
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), ProtoFieldValue::String("x".to_string()));
        fields.insert("id".to_string(), ProtoFieldValue::Int32(1));

        let message = ProtoMessage {
            message_type: "Test".to_string(),
            fields,
            descriptor: descriptor(vec![
                ("name", 1, ProtoType::String),
                ("id", 2, ProtoType::Int32),
            ]),
        };

        let rendered = serde_json::to_string(&message_to_json(&message)).unwrap();
        assert_eq!(rendered, r#"{"name":"x","id":1}"#);
    }

    #[test]
    fn test_sixty_four_bit_integers_render_as_strings() {
        assert_eq!(
            field_to_json(&ProtoFieldValue::Int64(-9007199254740993)),
            Value::String("-9007199254740993".to_string())
        );
        assert_eq!(
            field_to_json(&ProtoFieldValue::Uint64(u64::MAX)),
            Value::String("18446744073709551615".to_string())
        );
    }

    #[test]
    fn test_bytes_render_as_base64() {
        assert_eq!(
            field_to_json(&ProtoFieldValue::Bytes(b"hello".to_vec())),
            Value::String("aGVsbG8=".to_string())
        );
    }

    #[test]
    fn test_enum_renders_symbolic_name() {
        assert_eq!(
            field_to_json(&ProtoFieldValue::Enum {
                number: 1,
                name: Some("ACTIVE".to_string()),
            }),
            Value::String("ACTIVE".to_string())
        );
    }

    #[test]
    fn test_unknown_enum_number_renders_numeric() {
        assert_eq!(
            field_to_json(&ProtoFieldValue::Enum {
                number: 42,
                name: None,
            }),
            json!(42)
        );
    }

    #[test]
    fn test_float_widening_avoids_precision_noise() {
        assert_eq!(field_to_json(&ProtoFieldValue::Float(1.1)), json!(1.1));
    }

    #[test]
    fn test_non_finite_floats_render_as_strings() {
        assert_eq!(
            field_to_json(&ProtoFieldValue::Double(f64::NAN)),
            Value::String("NaN".to_string())
        );
        assert_eq!(
            field_to_json(&ProtoFieldValue::Double(f64::INFINITY)),
            Value::String("Infinity".to_string())
        );
        assert_eq!(
            field_to_json(&ProtoFieldValue::Double(f64::NEG_INFINITY)),
            Value::String("-Infinity".to_string())
        );
    }

    #[test]
    fn test_repeated_and_nested_render_recursively() {
        let inner = ProtoMessage {
            message_type: "Inner".to_string(),
            fields: {
                let mut f = HashMap::new();
                f.insert("city".to_string(), ProtoFieldValue::String("a".to_string()));
                f
            },
            descriptor: descriptor(vec![("city", 1, ProtoType::String)]),
        };

        let value = ProtoFieldValue::Repeated(vec![
            ProtoFieldValue::Message(Box::new(inner.clone())),
            ProtoFieldValue::Message(Box::new(inner)),
        ]);

        assert_eq!(
            serde_json::to_string(&field_to_json(&value)).unwrap(),
            r#"[{"city":"a"},{"city":"a"}]"#
        );
    }
}
