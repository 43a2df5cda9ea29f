//! Transport-agnostic Sink/Source contracts (spec §6), concrete dev/Kafka/
//! SQS/Firehose connectors (spec §4.7), and the polymorphic worker loop
//! (spec §4.6) shared by raw, atomic-event and error consumers.

mod error;
mod sink;
mod source;
mod worker_loop;

pub use error::TransportError;
pub use sink::{CountingSink, DevSink, FirehoseSink, HardBail, KafkaSink, Sink, SqsSink};
pub use source::{DevSource, KafkaSource, Message, SqsSource, Source};
pub use worker_loop::run_loop;

/// The three independent queue lanes a pipeline instance reads from or
/// writes to (spec §6) — never both for the same lane in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueType {
    Raw,
    Events,
    Errors,
}

impl QueueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Raw => "raw",
            QueueType::Events => "events",
            QueueType::Errors => "errors",
        }
    }
}
