//! In-memory source for tests exercising the worker loop without a real
//! broker — not present in the Python original (its dev connector is
//! sink-only), added here purely as test fixture infrastructure.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::{Message, Source};
use crate::error::TransportError;

const BATCH_SIZE: usize = 10;

pub struct DevSource {
    messages: VecDeque<Vec<u8>>,
}

impl DevSource {
    pub fn new(messages: Vec<Vec<u8>>) -> Self {
        DevSource { messages: messages.into() }
    }
}

#[async_trait]
impl Source for DevSource {
    async fn read(&mut self) -> Result<Vec<Message>, TransportError> {
        let mut batch = Vec::new();
        while batch.len() < BATCH_SIZE {
            match self.messages.pop_front() {
                Some(bytes) => batch.push(Message::noop(bytes)),
                None => break,
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_read_drains_messages_in_order() {
        let mut source = DevSource::new(vec![b"a".to_vec(), b"b".to_vec()]);
        let batch = source.read().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].bytes, b"a");
        assert_eq!(batch[1].bytes, b"b");
        for message in batch {
            message.ack().await.unwrap();
        }
        assert!(source.read().await.unwrap().is_empty());
    }
}
