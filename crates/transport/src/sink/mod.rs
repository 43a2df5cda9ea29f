mod counting;
mod dev;
mod firehose;
mod kafka;
mod sqs;

pub use counting::{CountingSink, HardBail};
pub use dev::DevSink;
pub use firehose::FirehoseSink;
pub use kafka::KafkaSink;
pub use sqs::SqsSink;

use crate::error::TransportError;

/// A durable write target for one queue lane. `write` MUST return only after
/// every record in `batch` is durably accepted by the backend (for Kafka,
/// after the delivery callback; for SQS/Firehose, after the API call
/// returns) — see spec §5's blocking-point contract.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError>;
    async fn close(&self) -> Result<(), TransportError>;
}
