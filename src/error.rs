use thiserror::Error;

/// Failure of a call to an external provider (language model, embedding
/// API, vector index). Call sites decide whether a failure is fatal or falls
/// back to a default value.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unsupported provider: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Return the response unchanged if it has a success status, otherwise turn
/// it into a [`ProviderError::Status`] carrying the body text.
pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Status { status, body })
}

/// Errors surfaced to the caller of the search pipeline.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("vector search failed: {0}")]
    Retrieval(#[from] ProviderError),
}
