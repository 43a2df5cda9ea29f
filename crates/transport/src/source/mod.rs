mod dev;
mod kafka;
mod sqs;

pub use dev::DevSource;
pub use kafka::KafkaSource;
pub use sqs::SqsSource;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sqs::types::Message as SqsApiMessage;
use aws_sdk_sqs::Client as SqsClient;

use crate::error::TransportError;

/// One message read off a [`Source`], pending acknowledgement.
pub struct Message {
    pub bytes: Vec<u8>,
    ack: AckHandle,
}

enum AckHandle {
    /// No-op — the dev source and Kafka (deferred to the next `read()`).
    Noop,
    /// Marks a flag `KafkaSource` checks before the next batch's commit.
    Flag(Arc<AtomicBool>),
    Sqs { client: SqsClient, queue_url: String, receipt_handle: String },
}

impl Message {
    fn noop(bytes: Vec<u8>) -> Self {
        Message { bytes, ack: AckHandle::Noop }
    }

    fn kafka(bytes: Vec<u8>, flag: Arc<AtomicBool>) -> Self {
        Message { bytes, ack: AckHandle::Flag(flag) }
    }

    fn sqs(bytes: Vec<u8>, client: SqsClient, queue_url: String, message: &SqsApiMessage) -> Self {
        Message {
            bytes,
            ack: AckHandle::Sqs {
                client,
                queue_url,
                receipt_handle: message.receipt_handle().unwrap_or_default().to_string(),
            },
        }
    }

    pub async fn ack(self) -> Result<(), TransportError> {
        match self.ack {
            AckHandle::Noop => Ok(()),
            AckHandle::Flag(flag) => {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
            AckHandle::Sqs { client, queue_url, receipt_handle } => {
                client
                    .delete_message()
                    .queue_url(queue_url)
                    .receipt_handle(receipt_handle)
                    .send()
                    .await
                    .map_err(|e| TransportError::Sqs(e.to_string()))?;
                Ok(())
            }
        }
    }
}

/// A batch-read queue source for one lane.
#[async_trait]
pub trait Source: Send + Sync {
    async fn read(&mut self) -> Result<Vec<Message>, TransportError>;
}
