use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    #[error("Tool loop limit reached: {0}")]
    ToolLoopLimit(String),

    /// Milliseconds the request was allowed to run
    #[error("Request exceeded the {0}ms handling limit")]
    Timeout(u64),
}

impl RelayError {
    /// Whether the caller can fix this by changing its request
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::InvalidRequest(_))
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        RelayError::ProviderFailure(err.to_string())
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
