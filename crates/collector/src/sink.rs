//! Picks the raw-lane sink by `config.transport`, matching `collector/app.py`'s
//! `create_app` — which only ever wires Kafka, SQS or dev for the collector's
//! sink, never Firehose (Firehose only appears on the enricher's events lane
//! in the source).

use transport::{CountingSink, DevSink, KafkaSink, Sink, SqsSink, TransportError};

pub enum RawSink {
    Kafka(CountingSink<KafkaSink>),
    Sqs(CountingSink<SqsSink>),
    Dev(CountingSink<DevSink>),
}

#[async_trait::async_trait]
impl Sink for RawSink {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        match self {
            RawSink::Kafka(s) => s.write(batch).await,
            RawSink::Sqs(s) => s.write(batch).await,
            RawSink::Dev(s) => s.write(batch).await,
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self {
            RawSink::Kafka(s) => s.close().await,
            RawSink::Sqs(s) => s.close().await,
            RawSink::Dev(s) => s.close().await,
        }
    }
}

pub async fn raw_sink(config: &config::Config) -> anyhow::Result<RawSink> {
    match config.transport {
        config::Transport::Kafka => {
            let brokers = config
                .kafka_brokers
                .as_deref()
                .ok_or(TransportError::MissingConfig { field: "kafka_brokers", lane: "raw" })?;
            let topic = config
                .kafka_topic_raw
                .clone()
                .ok_or(TransportError::MissingConfig { field: "kafka_topic_raw", lane: "raw" })?;
            Ok(RawSink::Kafka(CountingSink::new(KafkaSink::new(brokers, topic)?)))
        }
        config::Transport::Sqs => {
            let queue = config
                .sqs_queue_raw
                .as_deref()
                .ok_or(TransportError::MissingConfig { field: "sqs_queue_raw", lane: "raw" })?;
            let shared_config = aws_config::load_from_env().await;
            let client = aws_sdk_sqs::Client::new(&shared_config);
            Ok(RawSink::Sqs(CountingSink::new(SqsSink::new(client, queue, true).await?)))
        }
        config::Transport::Dev => Ok(RawSink::Dev(CountingSink::new(DevSink::new()))),
    }
}
