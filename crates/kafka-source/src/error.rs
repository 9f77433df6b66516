use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Protobuf parse error: {0}")]
    ProtobufParse(String),

    #[error("Protobuf decode error: {0}")]
    ProtobufDecode(String),

    #[error("Message type '{name}' not found in schema; available types: {}", .available.join(", "))]
    MessageTypeNotFound { name: String, available: Vec<String> },

    #[error("Consumer error: {0}")]
    Consumer(String),

    #[error("Output serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
