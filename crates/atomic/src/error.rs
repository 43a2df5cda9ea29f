#[derive(Debug, thiserror::Error)]
pub enum AtomicError {
    #[error("unknown atomic field: {0}")]
    UnknownField(String),

    #[error("forbidden field (set via its own operation): {0}")]
    ForbiddenField(String),

    #[error("duplicate context schema: {0}")]
    DuplicateContext(String),

    #[error("event already set")]
    EventAlreadySet,

    #[error("invalid atomic event: {reasons:?}")]
    InvalidAtomic { reasons: Vec<String> },
}
