//! Decoded protobuf value and descriptor types for prototap.
//!
//! This crate defines the shared data structures for dynamically decoded
//! protobuf messages, plus their JSON rendering and proto3 wire encoding.
//! The `.proto` parser and the wire decoder live in the kafka-source crate
//! and depend on the types here, not the other way around — this crate has
//! no Kafka or parser dependencies.
//!
//! # Modules
//!
//! - [`proto`] - descriptor and value types ([`ProtoSchema`], [`ProtoMessage`], ...)
//! - [`json`] - canonical protobuf JSON rendering of decoded messages
//! - [`encode`] - proto3 wire encoding (the decoder's inverse)
//! - [`error`] - error types

pub mod encode;
pub mod error;
pub mod json;
pub mod proto;

// Re-export main types for convenient access
pub use encode::encode_message;
pub use error::{ProtoTypesError, Result};
pub use json::{field_to_json, message_to_json};
pub use proto::{
    ProtoEnumDescriptor, ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage,
    ProtoMessageDescriptor, ProtoSchema, ProtoType,
};
