#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("missing {field} config for the {lane} lane")]
    MissingConfig { field: &'static str, lane: &'static str },

    #[error("{backend} does not support the {lane} lane")]
    UnsupportedLane { backend: &'static str, lane: &'static str },

    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("sqs error: {0}")]
    Sqs(String),

    #[error("firehose error: {0}")]
    Firehose(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("message body is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("message from a previous batch was never acknowledged")]
    UnackedMessage,

    #[error("too many sink write failures in one interval, hard-bailing")]
    HardBail,
}
