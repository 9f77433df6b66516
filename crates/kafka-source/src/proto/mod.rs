//! Runtime protobuf support: `.proto` parsing and wire decoding.

pub mod decoder;
pub mod parser;
