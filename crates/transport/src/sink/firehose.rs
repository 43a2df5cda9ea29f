//! Firehose sink, raw lane only — the source only ever wires one delivery
//! stream (`connectors/sinks/firehose.py`), matching spec §6's "Firehose
//! (raw lane only)". Batches are chunked to 500 records, the
//! `PutRecordBatch` API limit.

use async_trait::async_trait;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;
use aws_sdk_firehose::Client;

use super::Sink;
use crate::error::TransportError;

const BATCH_LIMIT: usize = 500;

pub struct FirehoseSink {
    client: Client,
    stream_name: String,
}

impl FirehoseSink {
    pub fn new(client: Client, stream_name: String) -> Self {
        FirehoseSink { client, stream_name }
    }
}

#[async_trait]
impl Sink for FirehoseSink {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        let mut total = 0;
        for chunk in batch.chunks(BATCH_LIMIT) {
            let mut records = Vec::with_capacity(chunk.len());
            for record in chunk {
                total += record.len();
                records.push(
                    Record::builder()
                        .data(Blob::new(record.clone()))
                        .build()
                        .map_err(|e| TransportError::Firehose(e.to_string()))?,
                );
            }
            self.client
                .put_record_batch()
                .delivery_stream_name(&self.stream_name)
                .set_records(Some(records))
                .send()
                .await
                .map_err(|e| TransportError::Firehose(e.to_string()))?;
        }
        Ok(total)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
