use crate::reference::IgluReference;

#[derive(Debug, thiserror::Error)]
pub enum IgluError {
    #[error("invalid iglu schema reference: {reason}")]
    InvalidReference { reason: String },

    #[error("schema not found in any registry: {0}")]
    SchemaNotFound(IgluReference),

    #[error("invalid schema for {reference}: {reason}")]
    InvalidSchema {
        reference: IgluReference,
        reason: String,
    },

    #[error("failed to validate {reference}: {reason}")]
    ValidationFailed {
        reference: IgluReference,
        reason: String,
    },
}
