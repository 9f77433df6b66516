//! Protobuf descriptor and value types.
//!
//! These types are the shared data structures for decoded protobuf messages.
//! The parser (in the kafka-source crate) builds [`ProtoSchema`] from `.proto`
//! sources, the decoder produces [`ProtoMessage`]/[`ProtoFieldValue`], and the
//! [`json`](crate::json) and [`encode`](crate::encode) modules consume them.
//!
//! Keeping the data types here and the protobuf-parse machinery in
//! kafka-source means this crate carries no Kafka or parser dependencies.

use std::collections::HashMap;

/// Represents a field value in a decoded protobuf message.
///
/// This is the runtime representation of protobuf values after decoding.
/// `sint*`/`sfixed*` collapse into the signed variants and `fixed*` into the
/// unsigned ones; the wire encoding they came from is recorded on the field
/// descriptor, not the value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoFieldValue {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value with its symbolic name, if the number is defined in the schema.
    Enum { number: i32, name: Option<String> },
    Message(Box<ProtoMessage>),
    Repeated(Vec<ProtoFieldValue>),
}

/// Represents a decoded protobuf message.
///
/// Contains the message type name, decoded fields, and the schema descriptor
/// for field introspection. Proto3 defaults are materialized at decode time,
/// so absent entries in `fields` mean the field genuinely has no value to
/// render (unset message-typed or explicit `optional` fields).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoMessage {
    /// Fully qualified message type name (e.g., "mypackage.MyMessage")
    pub message_type: String,
    /// Decoded field values by field name
    pub fields: HashMap<String, ProtoFieldValue>,
    /// Schema reference for field introspection
    pub descriptor: ProtoMessageDescriptor,
}

/// Protobuf field type enumeration.
///
/// Repeated-ness and explicit presence are properties of the field
/// descriptor, not of the type.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(String),
    Enum(String),
}

impl std::fmt::Display for ProtoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl ProtoType {
    /// Get the human-readable type name.
    pub fn type_name(&self) -> String {
        match self {
            ProtoType::Double => "double".to_string(),
            ProtoType::Float => "float".to_string(),
            ProtoType::Int32 => "int32".to_string(),
            ProtoType::Int64 => "int64".to_string(),
            ProtoType::Uint32 => "uint32".to_string(),
            ProtoType::Uint64 => "uint64".to_string(),
            ProtoType::Sint32 => "sint32".to_string(),
            ProtoType::Sint64 => "sint64".to_string(),
            ProtoType::Fixed32 => "fixed32".to_string(),
            ProtoType::Fixed64 => "fixed64".to_string(),
            ProtoType::Sfixed32 => "sfixed32".to_string(),
            ProtoType::Sfixed64 => "sfixed64".to_string(),
            ProtoType::Bool => "bool".to_string(),
            ProtoType::String => "string".to_string(),
            ProtoType::Bytes => "bytes".to_string(),
            ProtoType::Message(name) => format!("message:{name}"),
            ProtoType::Enum(name) => format!("enum:{name}"),
        }
    }
}

/// Describes a single field in a protobuf message.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFieldDescriptor {
    /// Field name
    pub name: String,
    /// Field number (tag)
    pub number: i32,
    /// Field type
    pub field_type: ProtoType,
    /// Whether the field is repeated
    pub is_repeated: bool,
    /// Whether the field tracks explicit presence (proto3 `optional`).
    /// Absent means absent for such fields; no default is materialized.
    pub has_presence: bool,
}

/// Describes a protobuf message type (schema).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoMessageDescriptor {
    /// Fully qualified message name (e.g., "mypackage.MyMessage")
    pub name: String,
    /// Map of field names to their descriptors
    pub fields: HashMap<String, ProtoFieldDescriptor>,
    /// Ordered list of field names (preserves proto definition order)
    pub field_order: Vec<String>,
}

impl ProtoMessageDescriptor {
    /// Get a field descriptor by name.
    pub fn get_field(&self, name: &str) -> Option<&ProtoFieldDescriptor> {
        self.fields.get(name)
    }

    /// List all field names in definition order.
    pub fn list_fields(&self) -> &[String] {
        &self.field_order
    }
}

/// Describes a protobuf enum type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoEnumDescriptor {
    /// Fully qualified enum name (e.g., "mypackage.Status")
    pub name: String,
    /// Map of enum numbers to value names. With `allow_alias` the first
    /// name declared for a number wins.
    pub values: HashMap<i32, String>,
}

impl ProtoEnumDescriptor {
    /// Get the symbolic name for an enum number.
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values.get(&number).map(|s| s.as_str())
    }

    /// Name of the proto3 default value (number 0).
    pub fn default_value_name(&self) -> Option<&str> {
        self.name_of(0)
    }
}

/// Represents a parsed protobuf schema.
///
/// Message and enum types are keyed by their simple (unqualified) names;
/// the fully qualified name is recorded on each descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoSchema {
    /// Map of message type names to their descriptors
    pub messages: HashMap<String, ProtoMessageDescriptor>,
    /// Map of enum type names to their descriptors
    pub enums: HashMap<String, ProtoEnumDescriptor>,
}

impl ProtoSchema {
    /// Get a message descriptor by simple name.
    pub fn get_message(&self, name: &str) -> Option<&ProtoMessageDescriptor> {
        self.messages.get(name)
    }

    /// Get an enum descriptor by simple name.
    pub fn get_enum(&self, name: &str) -> Option<&ProtoEnumDescriptor> {
        self.enums.get(name)
    }

    /// List all message type names in the schema.
    pub fn list_messages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.messages.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all enum type names in the schema.
    pub fn list_enums(&self) -> Vec<String> {
        let mut names: Vec<String> = self.enums.keys().cloned().collect();
        names.sort();
        names
    }
}
