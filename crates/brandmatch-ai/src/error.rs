use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("cannot connect to AI endpoint: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("AI request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx from the generation endpoint; `body` is verbatim.
    #[error("AI endpoint returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// A 2xx envelope with no usable candidate text.
    #[error("invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("AI client is not configured: {0}")]
    NotConfigured(String),
}
