/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(u16),

    #[error("validation failed: {0}")]
    ValidationError(String),
}
