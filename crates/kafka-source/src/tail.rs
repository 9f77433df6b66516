//! Tail a Kafka topic of protobuf records as JSON.
//!
//! Consumes records from a topic, decodes each payload against the schema
//! compiled at startup, and prints one envelope per record to stdout.
//! Diagnostics go to stderr through `tracing`, so stdout stays a clean
//! JSON stream.

use crate::consumer::{Consumer, ConsumerConfig, Polled, Record};
use crate::error::{Error, Result};
use crate::proto::decoder::ProtoDecoder;
use crate::proto::parser;
use clap::Parser;
use proto_types::message_to_json;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Configuration for tailing a topic.
#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// Path to the .proto schema file, compiled at startup
    #[clap(long, env = "PROTOTAP_PROTO_PATH")]
    pub proto_path: String,
    /// Kafka brokers (comma-separated or multiple --brokers)
    #[clap(long, env = "PROTOTAP_BROKERS", value_delimiter = ',', required = true)]
    pub brokers: Vec<String>,
    /// Consumer group ID
    #[clap(long, env = "PROTOTAP_GROUP_ID", default_value = "prototap")]
    pub group_id: String,
    /// Topic to consume from
    #[clap(long, env = "PROTOTAP_TOPIC")]
    pub topic: String,
    /// Protobuf message type name the topic's payloads decode as
    #[clap(long, env = "PROTOTAP_MESSAGE_TYPE")]
    pub message_type: String,
    /// Auto offset reset strategy ("earliest" or "latest")
    #[clap(long, env = "PROTOTAP_AUTO_OFFSET_RESET", default_value = "latest")]
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    #[clap(long, env = "PROTOTAP_SESSION_TIMEOUT_MS", default_value = "6000")]
    pub session_timeout_ms: String,
    /// How long one poll waits for a record before retrying, in milliseconds
    #[clap(long, env = "PROTOTAP_POLL_TIMEOUT_MS", default_value_t = 1000)]
    pub poll_timeout_ms: u64,
    /// Pretty-print each envelope instead of one JSON object per line
    #[clap(long, env = "PROTOTAP_PRETTY")]
    pub pretty: bool,
}

/// The per-record output shape: Kafka coordinates plus the decoded payload.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub partition: i32,
    pub offset: i64,
    pub message: serde_json::Value,
}

impl Envelope {
    fn render(&self, pretty: bool) -> Result<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(rendered)
    }
}

/// Tail the configured topic until interrupted.
///
/// Fails before any polling begins when the schema does not parse or does
/// not define the configured message type. Once polling, a non-EOF delivery
/// error terminates the loop; decode failures are logged per record and the
/// loop continues. Every exit path releases the subscription exactly once.
pub async fn run(config: Config) -> Result<()> {
    let schema = parser::parse_file(&config.proto_path)?;

    // Resolve the message type up front so a typo aborts before subscribing
    if schema.get_message(&config.message_type).is_none() {
        return Err(Error::MessageTypeNotFound {
            name: config.message_type.clone(),
            available: schema.list_messages(),
        });
    }
    info!(
        "Compiled schema from {}: {} message type(s)",
        config.proto_path,
        schema.messages.len()
    );

    let decoder = ProtoDecoder::new(schema);

    let consumer_config = ConsumerConfig {
        brokers: config.brokers.join(","),
        group_id: config.group_id.clone(),
        topic: config.topic.clone(),
        auto_offset_reset: config.auto_offset_reset.clone(),
        session_timeout_ms: config.session_timeout_ms.clone(),
        ..Default::default()
    };
    let consumer = Consumer::new(&consumer_config)?;
    info!(
        "Subscribed to topic {} at {} as group {}",
        config.topic, consumer_config.brokers, config.group_id
    );

    let result = tail_loop(&consumer, &decoder, &config).await;

    consumer.close();
    info!("Subscription released");

    result
}

async fn tail_loop(consumer: &Consumer, decoder: &ProtoDecoder, config: &Config) -> Result<()> {
    let poll_timeout = Duration::from_millis(config.poll_timeout_ms);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupt received, shutting down");
                return Ok(());
            }
            polled = consumer.poll(poll_timeout) => {
                match polled {
                    Ok(Polled::Idle) => continue,
                    Ok(Polled::PartitionEof(partition)) => {
                        debug!("Reached end of partition {partition}");
                    }
                    Ok(Polled::Record(record)) => {
                        if let Some(rendered) = render_record(decoder, &config.message_type, &record, config.pretty) {
                            println!("{rendered}");
                        }
                    }
                    Err(e) => {
                        error!("Kafka delivery error, stopping: {e}");
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Decode one record and render its envelope.
///
/// Returns `None` (after logging) when the payload does not decode or the
/// envelope does not serialize; the caller keeps polling either way.
fn render_record(
    decoder: &ProtoDecoder,
    message_type: &str,
    record: &Record,
    pretty: bool,
) -> Option<String> {
    let message = match decoder.decode(message_type, &record.payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(
                "Failed to decode record at partition {} offset {}: {e}",
                record.partition, record.offset
            );
            return None;
        }
    };

    let envelope = Envelope {
        partition: record.partition,
        offset: record.offset,
        message: message_to_json(&message),
    };
    match envelope.render(pretty) {
        Ok(rendered) => Some(rendered),
        Err(e) => {
            warn!(
                "Failed to serialize envelope for partition {} offset {}: {e}",
                record.partition, record.offset
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::parser::parse_str;
    use proto_types::{encode_message, ProtoFieldValue, ProtoMessage};

    const USER_PROTO: &str = r#"
        syntax = "proto3";

        message User {
            int32 id = 1;
            string name = 2;
        }
    "#;

    fn user_decoder() -> ProtoDecoder {
        ProtoDecoder::new(parse_str(USER_PROTO).expect("Failed to parse proto"))
    }

    fn record(partition: i32, offset: i64, payload: Vec<u8>) -> Record {
        Record {
            topic: "events".to_string(),
            partition,
            offset,
            payload,
            key: None,
            timestamp: None,
        }
    }

    fn user_payload(decoder: &ProtoDecoder, id: i32, name: &str) -> Vec<u8> {
        let descriptor = decoder.schema().get_message("User").unwrap().clone();
        let message = ProtoMessage {
            message_type: descriptor.name.clone(),
            fields: [
                ("id".to_string(), ProtoFieldValue::Int32(id)),
                ("name".to_string(), ProtoFieldValue::String(name.to_string())),
            ]
            .into_iter()
            .collect(),
            descriptor,
        };
        encode_message(&message).unwrap()
    }

    #[test]
    fn test_envelope_shape_is_exact() {
        let decoder = user_decoder();
        let payload = user_payload(&decoder, 1, "x");

        let rendered = render_record(&decoder, "User", &record(3, 42, payload), false).unwrap();

        assert_eq!(
            rendered,
            r#"{"partition":3,"offset":42,"message":{"id":1,"name":"x"}}"#
        );
    }

    #[test]
    fn test_schema_default_fields_are_included() {
        let decoder = user_decoder();
        // payload sets only the name; id materializes as its proto3 default
        let descriptor = decoder.schema().get_message("User").unwrap().clone();
        let message = ProtoMessage {
            message_type: descriptor.name.clone(),
            fields: [("name".to_string(), ProtoFieldValue::String("x".to_string()))]
                .into_iter()
                .collect(),
            descriptor,
        };
        let payload = encode_message(&message).unwrap();

        let rendered = render_record(&decoder, "User", &record(0, 7, payload), false).unwrap();

        assert_eq!(
            rendered,
            r#"{"partition":0,"offset":7,"message":{"id":0,"name":"x"}}"#
        );
    }

    #[test]
    fn test_malformed_payload_yields_no_line() {
        let decoder = user_decoder();

        // truncated record: tag without a value
        assert!(render_record(&decoder, "User", &record(0, 1, vec![0x08]), false).is_none());

        // the next record still renders
        let payload = user_payload(&decoder, 2, "y");
        assert!(render_record(&decoder, "User", &record(0, 2, payload), false).is_some());
    }

    #[test]
    fn test_pretty_rendering_is_multiline() {
        let decoder = user_decoder();
        let payload = user_payload(&decoder, 1, "x");

        let rendered = render_record(&decoder, "User", &record(3, 42, payload), true).unwrap();

        assert!(rendered.contains('\n'));
        assert!(rendered.contains(r#""partition": 3"#));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::parse_from([
            "prototap",
            "--proto-path",
            "events.proto",
            "--brokers",
            "localhost:9092",
            "--topic",
            "events",
            "--message-type",
            "User",
        ]);

        assert_eq!(config.group_id, "prototap");
        assert_eq!(config.auto_offset_reset, "latest");
        assert_eq!(config.poll_timeout_ms, 1000);
        assert!(!config.pretty);
    }

    #[test]
    fn test_brokers_flag_is_comma_delimited() {
        let config = Config::parse_from([
            "prototap",
            "--proto-path",
            "events.proto",
            "--brokers",
            "a:9092,b:9092",
            "--topic",
            "events",
            "--message-type",
            "User",
        ]);

        assert_eq!(config.brokers, vec!["a:9092", "b:9092"]);
    }
}
