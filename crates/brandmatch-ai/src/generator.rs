//! The seam between generation callers and the text model.

use async_trait::async_trait;
use brandmatch_core::TaskType;

use crate::error::AiError;

/// Per-call generation knobs. `topP`/`topK` are client-wide and come from
/// configuration instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    /// Strategy answers carry four sections, so they get the larger budget.
    pub const STRATEGY: Self = Self {
        max_output_tokens: 2048,
        temperature: 0.7,
    };

    pub const INSIGHT: Self = Self {
        max_output_tokens: 1024,
        temperature: 0.7,
    };

    /// Free-form prompts from the dashboard.
    pub const GENERAL: Self = Self {
        max_output_tokens: 1024,
        temperature: 0.8,
    };

    #[must_use]
    pub fn for_task(task: TaskType) -> Self {
        match task {
            TaskType::Strategy => Self::STRATEGY,
            _ => Self::INSIGHT,
        }
    }
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt`. Implementations return trimmed,
    /// non-empty text or an error.
    async fn generate_text(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, AiError>;

    /// Whether calls can succeed at all. `false` means every call fails with
    /// [`AiError::NotConfigured`].
    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in used when no model credentials are configured. Every call fails
/// with [`AiError::NotConfigured`] carrying `reason`.
#[derive(Debug, Clone)]
pub struct UnconfiguredGenerator {
    reason: String,
}

impl UnconfiguredGenerator {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate_text(&self, _: &str, _: GenerationParams) -> Result<String, AiError> {
        Err(AiError::NotConfigured(self.reason.clone()))
    }

    fn is_configured(&self) -> bool {
        false
    }
}
