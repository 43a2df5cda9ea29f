#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("atomic event error: {0}")]
    Atomic(#[from] atomic::AtomicError),

    #[error("schema registry error: {0}")]
    Registry(#[from] iglu::IgluError),

    #[error("invalid iglu reference: {0}")]
    InvalidReference(String),

    #[error("invalid JSON in {field}: {source}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base64 in {field}: {source}")]
    InvalidBase64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("unrecognized event type shorthand: {0}")]
    UnknownEventType(String),

    #[error("form-encoded request bodies are not supported")]
    FormBodyUnsupported,

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("geoip lookup error: {0}")]
    GeoIp(#[from] maxminddb::MaxMindDBError),

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
}
