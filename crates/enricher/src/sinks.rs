//! Wires `config::Config`'s transport selection to concrete
//! [`transport::Source`]/[`transport::Sink`] connectors, matching the
//! `if config.transport == "kafka": ... elif ... == "sqs": ...` branches in
//! `processing/enricher.py`'s `Enricher.__init__`. The raw lane always comes
//! from `config.transport`; the events and errors lanes come from
//! `config.atomic_event_transport`, falling back to `config.transport` when
//! unset (same fallback `enricher.py` applies).

use std::sync::Arc;

use async_trait::async_trait;
use config::{Config, EventsTransport, Transport};
use transport::{
    CountingSink, DevSink, DevSource, FirehoseSink, KafkaSink, KafkaSource, Message, Sink,
    SqsSink, SqsSource, Source, TransportError,
};

/// Picks among the raw-lane-capable sources by `config.transport`. Kafka and
/// SQS sources only ever serve the raw lane (`connectors/sources/{kafka,sqs}.py`
/// reject any other queue type); the dev variant is test-only infrastructure.
pub enum RawSource {
    Kafka(KafkaSource),
    Sqs(SqsSource),
    Dev(DevSource),
}

#[async_trait]
impl Source for RawSource {
    async fn read(&mut self) -> Result<Vec<Message>, TransportError> {
        match self {
            RawSource::Kafka(s) => s.read().await,
            RawSource::Sqs(s) => s.read().await,
            RawSource::Dev(s) => s.read().await,
        }
    }
}

pub async fn raw_source(config: &Config) -> anyhow::Result<RawSource> {
    match config.transport {
        Transport::Kafka => {
            let brokers = config
                .kafka_brokers
                .as_deref()
                .ok_or_else(|| TransportError::MissingConfig { field: "kafka_brokers", lane: "raw" })?;
            let topic = config
                .kafka_topic_raw
                .as_deref()
                .ok_or_else(|| TransportError::MissingConfig { field: "kafka_topic_raw", lane: "raw" })?;
            Ok(RawSource::Kafka(KafkaSource::new(brokers, topic, "enricher")?))
        }
        Transport::Sqs => {
            let queue = config
                .sqs_queue_raw
                .as_deref()
                .ok_or_else(|| TransportError::MissingConfig { field: "sqs_queue_raw", lane: "raw" })?;
            let client = sqs_client().await;
            Ok(RawSource::Sqs(SqsSource::new(client, queue, true).await?))
        }
        Transport::Dev => Ok(RawSource::Dev(DevSource::new(Vec::new()))),
    }
}

/// A sink for either the events or the errors lane, wrapped in
/// [`CountingSink`] regardless of backend (spec §5's hard-bail counter is
/// applied to every sink uniformly).
pub enum LaneSink {
    Kafka(CountingSink<KafkaSink>),
    Sqs(CountingSink<SqsSink>),
    Firehose(CountingSink<FirehoseSink>),
    Dev(CountingSink<DevSink>),
}

#[async_trait]
impl Sink for LaneSink {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        match self {
            LaneSink::Kafka(s) => s.write(batch).await,
            LaneSink::Sqs(s) => s.write(batch).await,
            LaneSink::Firehose(s) => s.write(batch).await,
            LaneSink::Dev(s) => s.write(batch).await,
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self {
            LaneSink::Kafka(s) => s.close().await,
            LaneSink::Sqs(s) => s.close().await,
            LaneSink::Firehose(s) => s.close().await,
            LaneSink::Dev(s) => s.close().await,
        }
    }
}

pub async fn events_sink(config: &Config) -> anyhow::Result<Arc<LaneSink>> {
    lane_sink(config, "events", config.kafka_topic_events.as_deref(), config.sqs_queue_events.as_deref()).await
}

pub async fn errors_sink(config: &Config) -> anyhow::Result<Arc<LaneSink>> {
    lane_sink(config, "errors", config.kafka_topic_errors.as_deref(), config.sqs_queue_errors.as_deref()).await
}

async fn lane_sink(
    config: &Config,
    lane: &'static str,
    kafka_topic: Option<&str>,
    sqs_queue: Option<&str>,
) -> anyhow::Result<Arc<LaneSink>> {
    let effective = config.atomic_event_transport.unwrap_or(match config.transport {
        Transport::Kafka => EventsTransport::Kafka,
        Transport::Sqs => EventsTransport::Sqs,
        Transport::Dev => EventsTransport::Dev,
    });

    let sink = match effective {
        EventsTransport::Kafka => {
            let brokers = config
                .kafka_brokers
                .as_deref()
                .ok_or(TransportError::MissingConfig { field: "kafka_brokers", lane })?;
            let topic = kafka_topic
                .ok_or(TransportError::MissingConfig { field: "kafka_topic", lane })?;
            LaneSink::Kafka(CountingSink::new(KafkaSink::new(brokers, topic.to_string())?))
        }
        EventsTransport::Sqs => {
            let queue = sqs_queue.ok_or(TransportError::MissingConfig { field: "sqs_queue", lane })?;
            let client = sqs_client().await;
            LaneSink::Sqs(CountingSink::new(SqsSink::new(client, queue, false).await?))
        }
        EventsTransport::Firehose => {
            let stream = config
                .firehose_stream_name
                .as_deref()
                .ok_or(TransportError::MissingConfig { field: "firehose_stream_name", lane })?;
            let client = firehose_client().await;
            LaneSink::Firehose(CountingSink::new(FirehoseSink::new(client, stream.to_string())))
        }
        EventsTransport::Dev => LaneSink::Dev(CountingSink::new(DevSink::new())),
    };

    Ok(Arc::new(sink))
}

async fn sqs_client() -> aws_sdk_sqs::Client {
    let shared_config = aws_config::load_from_env().await;
    aws_sdk_sqs::Client::new(&shared_config)
}

async fn firehose_client() -> aws_sdk_firehose::Client {
    let shared_config = aws_config::load_from_env().await;
    aws_sdk_firehose::Client::new(&shared_config)
}
