//! Kafka consumer library for prototap: tail a topic whose record payloads
//! are encoded in protobuf, decoding against a schema compiled at startup.
//!
//! Features:
//!
//! - Runtime Protobuf Support: Parse `.proto` files at runtime and decode records without code generation
//! - Single bounded poll loop: one subscription, no buffering, no offset bookkeeping
//! - JSON envelopes: each record prints as `{partition, offset, message}`
//!
//! # Dependency Direction
//!
//! This crate depends on `proto-types` for the decoded message and
//! descriptor types (`ProtoMessage`, `ProtoFieldValue`, `ProtoSchema`, ...)
//! as well as their JSON rendering; the parser and decoder here produce
//! those types.

/// Single-subscription consumer with a bounded poll
pub mod consumer;
pub mod error;
pub mod proto;

/// The consume-decode-print loop and its configuration
pub mod tail;

// Re-export from proto-types for convenience
pub use proto_types::{
    ProtoEnumDescriptor, ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage,
    ProtoMessageDescriptor, ProtoSchema, ProtoType,
};

// Re-export main types for easy access
pub use consumer::{Consumer, ConsumerConfig, Polled, Record};
pub use error::{Error, Result};
pub use proto::decoder::ProtoDecoder;
pub use proto::parser::{parse_file, parse_str};
pub use tail::{Config, Envelope};
