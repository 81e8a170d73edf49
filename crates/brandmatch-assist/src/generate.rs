//! One generation without any session state: check inputs, render the
//! prompt, call the model.

use brandmatch_ai::{build_prompt, GenerationParams, PromptKind, TextGenerator};
use brandmatch_core::{CampaignContext, InfluencerRecommendation, InsightType, TaskType};

use crate::error::GenerationError;

/// Checks that `influencer` carries the input `task` analyses.
///
/// # Errors
///
/// Returns [`GenerationError::Precondition`] naming the missing input.
pub fn ensure_inputs(
    influencer: &InfluencerRecommendation,
    task: TaskType,
) -> Result<(), GenerationError> {
    let missing = match task.insight() {
        None => None,
        Some(InsightType::Comment) => influencer
            .comment_source()
            .is_none()
            .then_some("comment behavior"),
        Some(InsightType::Caption) => influencer
            .caption_source()
            .is_none()
            .then_some("caption behavior"),
        Some(InsightType::Score) => influencer.populated_scores().is_none().then_some("scores"),
        Some(InsightType::Performance) => influencer
            .populated_metrics()
            .is_none()
            .then_some("performance metrics"),
    };

    match missing {
        Some(input) => Err(GenerationError::Precondition(format!(
            "{input} missing for @{}",
            influencer.username
        ))),
        None => Ok(()),
    }
}

/// Generates the content for `task` about `influencer`.
///
/// # Errors
///
/// Returns [`GenerationError::Precondition`] before any AI call when the
/// input is missing, or [`GenerationError::Ai`] when the model call fails.
pub async fn generate_for_task(
    generator: &dyn TextGenerator,
    influencer: &InfluencerRecommendation,
    task: TaskType,
    campaign: Option<&CampaignContext>,
) -> Result<String, GenerationError> {
    ensure_inputs(influencer, task)?;
    let prompt = build_prompt(PromptKind::from(task), influencer, campaign);
    let text = generator
        .generate_text(&prompt, GenerationParams::for_task(task))
        .await?;
    Ok(text)
}
