//! Kafka consumer wrapper.
//!
//! A thin layer over rdkafka's `StreamConsumer`: one subscription, one
//! bounded poll at a time, no buffering and no offset bookkeeping beyond
//! what the client library does on its own.

use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use std::time::Duration;

/// Configuration for the Kafka consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Topic to consume from
    ///
    /// All record payloads on the topic must be of the same protobuf
    /// message type; use one process per topic otherwise.
    pub topic: String,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// "latest" tails only records produced after the subscription opens,
    /// which is what an inspection tool usually wants.
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Enable auto commit
    ///
    /// Off by default: the tool only prints records, so committed offsets
    /// would serve no purpose and would perturb other members of the group.
    pub enable_auto_commit: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "prototap".to_string(),
            topic: "".to_string(),
            auto_offset_reset: "latest".to_string(),
            session_timeout_ms: "6000".to_string(),
            enable_auto_commit: false,
        }
    }
}

/// A raw record delivered from a topic partition.
#[derive(Debug, Clone)]
pub struct Record {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Raw payload bytes (empty for tombstone records)
    pub payload: Vec<u8>,
    /// Record key (if any)
    pub key: Option<Vec<u8>>,
    /// Record timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
}

/// Outcome of one bounded poll.
#[derive(Debug, Clone)]
pub enum Polled {
    /// A record was delivered
    Record(Record),
    /// The consumer reached the current end of a partition; retryable
    PartitionEof(i32),
    /// The poll timeout elapsed with nothing to deliver; retryable
    Idle,
}

/// Single-subscription Kafka consumer.
pub struct Consumer {
    consumer: RdkafkaStreamConsumer,
}

impl Consumer {
    /// Create a consumer and subscribe to the configured topic.
    pub fn new(config: &ConsumerConfig) -> Result<Self> {
        let consumer: RdkafkaStreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", config.enable_auto_commit.to_string())
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", &config.session_timeout_ms)
            .set("enable.partition.eof", "true")
            .create()
            .map_err(|e| Error::Consumer(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| Error::Consumer(format!("Failed to subscribe to topic: {e}")))?;

        Ok(Self { consumer })
    }

    /// Wait up to `timeout` for the next record.
    ///
    /// Partition EOF and an elapsed timeout come back as retryable
    /// [`Polled`] variants; every other delivery error is returned as
    /// [`Error::Kafka`].
    pub async fn poll(&self, timeout: Duration) -> Result<Polled> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => Ok(Polled::Idle),
            Ok(Ok(message)) => Ok(Polled::Record(to_record(&message))),
            Ok(Err(e)) => classify_delivery_error(e),
        }
    }

    /// Release the subscription and drop the client.
    pub fn close(self) {
        self.consumer.unsubscribe();
    }
}

fn to_record(message: &RdkafkaBorrowedMessage) -> Record {
    Record {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        payload: message.payload().map(|p| p.to_vec()).unwrap_or_default(),
        key: message.key().map(|k| k.to_vec()),
        timestamp: message.timestamp().to_millis(),
    }
}

/// End-of-partition signals never terminate the poll loop; anything else
/// is a hard delivery error.
fn classify_delivery_error(error: KafkaError) -> Result<Polled> {
    match error {
        KafkaError::PartitionEOF(partition) => Ok(Polled::PartitionEof(partition)),
        other => Err(Error::Kafka(other)),
    }
}
