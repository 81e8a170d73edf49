use thiserror::Error;

/// Errors returned by the recommendation service client.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Connection refused, DNS failure, or similar: the service was never reached.
    #[error("cannot connect to recommendation service at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("recommendation service timed out after {timeout_secs}s ({url})")]
    Timeout { url: String, timeout_secs: u64 },

    /// Other transport or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `body` is passed through verbatim.
    #[error("recommendation service returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// 2xx response that does not satisfy the envelope contract.
    #[error("invalid response from recommendation service: {0}")]
    InvalidResponse(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl RecommendError {
    /// Whether the failure happened before the service could answer.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, RecommendError::Connect { .. } | RecommendError::Timeout { .. })
    }
}
