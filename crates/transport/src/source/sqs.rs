//! SQS source. The raw lane base64-decodes each message body (the matching
//! encode side lives in [`super::super::sink::SqsSink`]); other lanes treat
//! the body as plain UTF-8 — mirroring `connectors/sources/sqs.py`.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{Message, Source};
use crate::error::TransportError;

pub struct SqsSource {
    client: Client,
    queue_url: String,
    base64_decode: bool,
}

impl SqsSource {
    pub async fn new(client: Client, queue_name: &str, base64_decode: bool) -> Result<Self, TransportError> {
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
        Ok(SqsSource { client, queue_url, base64_decode })
    }
}

#[async_trait]
impl Source for SqsSource {
    async fn read(&mut self) -> Result<Vec<Message>, TransportError> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(10)
            .wait_time_seconds(1)
            .send()
            .await
            .map_err(|e| TransportError::Sqs(e.to_string()))?;

        let mut batch = Vec::new();
        for message in resp.messages() {
            let body = message.body().unwrap_or_default();
            let bytes = if self.base64_decode { STANDARD.decode(body)? } else { body.as_bytes().to_vec() };
            batch.push(Message::sqs(bytes, self.client.clone(), self.queue_url.clone(), message));
        }
        Ok(batch)
    }
}
