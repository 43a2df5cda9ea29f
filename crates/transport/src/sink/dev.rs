//! Stdout sink for local development and tests, mirroring
//! `connectors/sinks/dev.py`'s `DevSink`: prints every record and retains the
//! last one written so tests can assert on it without a real broker.

use std::sync::Mutex;

use async_trait::async_trait;

use super::Sink;
use crate::error::TransportError;

pub struct DevSink {
    last_record: Mutex<Option<Vec<u8>>>,
}

impl Default for DevSink {
    fn default() -> Self {
        DevSink::new()
    }
}

impl DevSink {
    pub fn new() -> Self {
        DevSink { last_record: Mutex::new(None) }
    }

    pub fn last_record(&self) -> Option<Vec<u8>> {
        self.last_record.lock().expect("dev sink lock poisoned").clone()
    }
}

#[async_trait]
impl Sink for DevSink {
    async fn write(&self, batch: Vec<Vec<u8>>) -> Result<usize, TransportError> {
        let mut total = 0;
        for record in &batch {
            total += record.len();
            println!("{}", String::from_utf8_lossy(record));
        }
        if let Some(record) = batch.into_iter().last() {
            *self.last_record.lock().expect("dev sink lock poisoned") = Some(record);
        }
        Ok(total)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_write_retains_the_last_record() {
        let sink = DevSink::new();
        let written = sink.write(vec![b"one".to_vec(), b"two".to_vec()]).await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(sink.last_record(), Some(b"two".to_vec()));
    }
}
