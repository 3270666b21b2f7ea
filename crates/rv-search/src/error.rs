use thiserror::Error;

/// Failures in the Elasticsearch data layer.
///
/// `Unreachable` carries the operator-facing message verbatim; callers
/// surface it unchanged.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Client could not connect to Elastic. Please, restart Elasticsearch service.")]
    Unreachable(#[source] reqwest::Error),

    #[error("delete of index pattern `{0}` was not acknowledged")]
    NotAcknowledged(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("search request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed search response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Transport(reqwest::Error),

    #[error(transparent)]
    Reshape(#[from] rv_core::ReshapeError),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SearchError::Unreachable(err)
        } else {
            SearchError::Transport(err)
        }
    }
}
