use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned a malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}
