#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed {format} frame: {reason}")]
    Decode {
        format: &'static str,
        reason: String,
    },
    #[error("envelope alone is {size} bytes, exceeding max_bytes={max_size}")]
    OversizedEnvelope { size: usize, max_size: usize },
    #[error("single data item serializes to {size} bytes, exceeding max_bytes={max_size}")]
    OversizedItem { size: usize, max_size: usize },
}
