//! Command-line interface for prototap
//!
//! # Usage Examples
//!
//! ```bash
//! # Tail a topic, one JSON envelope per line
//! prototap \
//!   --brokers localhost:9092 \
//!   --topic payment-events \
//!   --proto-path ./protos/eventdefinitions.proto \
//!   --message-type PaymentEvent
//!
//! # Pretty-print, reading everything the topic retains
//! prototap \
//!   --brokers localhost:9092 \
//!   --topic payment-events \
//!   --proto-path ./protos/eventdefinitions.proto \
//!   --message-type PaymentEvent \
//!   --auto-offset-reset earliest \
//!   --pretty
//! ```
//!
//! Every flag is also readable from a `PROTOTAP_*` environment variable.
//! Decoded records go to stdout; logs go to stderr (`RUST_LOG` filtered),
//! so the output can be piped into `jq` or a file as-is.

use clap::Parser;
use prototap_kafka_source::tail;

#[derive(Parser)]
#[command(name = "prototap")]
#[command(about = "Tail a Kafka topic of protobuf-encoded records as JSON")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: tail::Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean record stream
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("prototap {} starting", env!("CARGO_PKG_VERSION"));

    tail::run(cli.config).await?;

    Ok(())
}
