//! SQS sink: one queue per lane. The raw lane base64-encodes each record
//! before sending since SQS message bodies must be valid UTF-8 — matching
//! `connectors/sinks/sqs.py`'s `if self.queue_type == "raw": body =
//! base64.b64encode(...)` branch. Batches are chunked to 10 entries, the
//! `SendMessageBatch` API limit.

use async_trait::async_trait;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use aws_sdk_sqs::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::Sink;
use crate::error::TransportError;

const BATCH_LIMIT: usize = 10;

pub struct SqsSink {
    client: Client,
    queue_url: String,
    base64_encode: bool,
}

impl SqsSink {
    pub async fn new(client: Client, queue_name: &str, base64_encode: bool) -> Result<Self, TransportError> {
        let resp = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| TransportError::Sqs(e.to_string()))?;
        let queue_url = resp
            .queue_url()
            .ok_or_else(|| TransportError::Sqs("get_queue_url returned no url".to_string()))?
            .to_string();
        Ok(SqsSink { client, queue_url, base64_encode })
    }
}

#[async_trait]
impl Sink for SqsSink {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        let mut total = 0;
        for chunk in batch.chunks(BATCH_LIMIT) {
            let mut entries = Vec::with_capacity(chunk.len());
            for (i, record) in chunk.iter().enumerate() {
                let body = if self.base64_encode {
                    STANDARD.encode(record)
                } else {
                    String::from_utf8(record.clone())?
                };
                total += record.len();
                entries.push(
                    SendMessageBatchRequestEntry::builder()
                        .id(i.to_string())
                        .message_body(body)
                        .build()
                        .map_err(|e| TransportError::Sqs(e.to_string()))?,
                );
            }
            self.client
                .send_message_batch()
                .queue_url(&self.queue_url)
                .set_entries(Some(entries))
                .send()
                .await
                .map_err(|e| TransportError::Sqs(e.to_string()))?;
        }
        Ok(total)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
