use brandmatch_ai::AiError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The influencer record lacks the input this task analyses. No AI call
    /// was made.
    #[error("data not available for this analysis type: {0}")]
    Precondition(String),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("generation timed out after {0}s")]
    TimedOut(u64),

    /// A newer run for the same key started before this one finished.
    #[error("superseded by a newer generation for {0}")]
    Superseded(String),
}

/// Coarse failure classes shown next to a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Precondition,
    Connectivity,
    TimedOut,
    Upstream,
    InvalidResponse,
    Configuration,
    Superseded,
}

impl GenerationError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationError::Precondition(_) => FailureKind::Precondition,
            GenerationError::TimedOut(_) => FailureKind::TimedOut,
            GenerationError::Superseded(_) => FailureKind::Superseded,
            GenerationError::Ai(ai) => match ai {
                AiError::Connect(_) | AiError::Http(_) => FailureKind::Connectivity,
                AiError::Timeout { .. } => FailureKind::TimedOut,
                AiError::Upstream { .. } => FailureKind::Upstream,
                AiError::InvalidResponse(_) | AiError::Deserialize { .. } => {
                    FailureKind::InvalidResponse
                }
                AiError::NotConfigured(_) => FailureKind::Configuration,
            },
        }
    }
}
