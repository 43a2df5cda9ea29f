//! Kafka sink: one topic per lane, awaiting each record's delivery future
//! before `write` returns — matching `connectors/sinks/kafka.py`'s
//! `KafkaSink.write`, which only counts a message `ok` from its delivery
//! callback, never on `produce()` returning.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use super::Sink;
use crate::error::TransportError;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    pub fn new(brokers: &str, topic: String) -> Result<Self, TransportError> {
        let producer: FutureProducer = ClientConfig::new().set("bootstrap.servers", brokers).create()?;
        Ok(KafkaSink { producer, topic })
    }
}

#[async_trait]
impl Sink for KafkaSink {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        let mut total = 0;
        for record in batch {
            let len = record.len();
            let send = FutureRecord::<(), Vec<u8>>::to(&self.topic).payload(&record);
            self.producer
                .send(send, Timeout::After(DELIVERY_TIMEOUT))
                .await
                .map_err(|(e, _)| e)?;
            total += len;
        }
        Ok(total)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.producer.flush(DELIVERY_TIMEOUT)?;
        Ok(())
    }
}
