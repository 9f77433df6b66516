//! Error types for proto-types.

use thiserror::Error;

/// Errors that can occur while encoding decoded protobuf values.
#[derive(Error, Debug)]
pub enum ProtoTypesError {
    #[error("Protobuf encoding error: {0}")]
    ProtobufEncode(String),

    #[error("Field '{field}' does not match its declared type {expected}")]
    TypeMismatch { field: String, expected: String },
}

/// Result type alias for proto-types operations.
pub type Result<T> = std::result::Result<T, ProtoTypesError>;
