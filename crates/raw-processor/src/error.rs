#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("enrichment error: {0}")]
    Enrich(#[from] enrich::EnrichError),

    #[error("atomic event error: {0}")]
    Atomic(#[from] atomic::AtomicError),

    #[error("schema registry error: {0}")]
    Registry(#[from] iglu::IgluError),

    #[error("malformed request body: {0}")]
    InvalidBody(String),

    #[error("form-encoded request bodies are not supported")]
    UnsupportedContentType,

    #[error("missing event data after enrichment")]
    MissingEvent,
}
