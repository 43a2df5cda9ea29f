//! Kafka source, raw lane only (the Python original only ever constructs one
//! for `queue_type == "raw"` — `connectors/sources/kafka.py` raises on any
//! other value). Commits are deferred to the *next* `read()` call, and only
//! after every message handed out in the previous batch was acknowledged —
//! an un-acked message at that point is a programming error, not something
//! to paper over, so it's surfaced as [`TransportError::UnackedMessage`]
//! rather than silently dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message as _;

use super::{Message, Source};
use crate::error::TransportError;

const POLL_TIMEOUT: Duration = Duration::from_secs(1);
const BATCH_SIZE: usize = 10;

pub struct KafkaSource {
    consumer: StreamConsumer,
    pending: Vec<Arc<AtomicBool>>,
}

impl KafkaSource {
    pub fn new(brokers: &str, topic: &str, group_suffix: &str) -> Result<Self, TransportError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", format!("datenstrom-{group_suffix}"))
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .create()?;
        consumer.subscribe(&[topic])?;
        Ok(KafkaSource { consumer, pending: Vec::new() })
    }
}

#[async_trait]
impl Source for KafkaSource {
    async fn read(&mut self) -> Result<Vec<Message>, TransportError> {
        if !self.pending.is_empty() {
            if !self.pending.iter().all(|flag| flag.load(Ordering::SeqCst)) {
                return Err(TransportError::UnackedMessage);
            }
            self.consumer.commit_consumer_state(CommitMode::Sync)?;
            self.pending.clear();
        }

        let mut batch = Vec::new();
        let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;
        while batch.len() < BATCH_SIZE {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, self.consumer.recv()).await {
                Ok(Ok(borrowed)) => {
                    let flag = Arc::new(AtomicBool::new(false));
                    self.pending.push(flag.clone());
                    batch.push(Message::kafka(borrowed.payload().unwrap_or_default().to_vec(), flag));
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => break,
            }
        }
        Ok(batch)
    }
}
