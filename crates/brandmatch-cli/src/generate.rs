//! `generate` command handler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use brandmatch_ai::{GeminiClient, GeminiSettings};
use brandmatch_assist::{GenerationSummary, Orchestrator, TaskState};
use brandmatch_core::{
    normalize_value, AppConfig, CampaignContext, InfluencerRecommendation, RecommendationResponse,
    TaskType,
};
use brandmatch_db::{CampaignRow, PgContentStore};

fn stored_recommendations(row: &CampaignRow) -> anyhow::Result<Vec<InfluencerRecommendation>> {
    let data = row.recommendation_data.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "campaign '{}' has no recommendations yet; run `recommend --campaign {} --save` first",
            row.id,
            row.id
        )
    })?;
    let response: RecommendationResponse =
        serde_json::from_value(data).context("stored recommendation data is unreadable")?;
    Ok(response.recommendations)
}

/// Generates content for a stored campaign.
///
/// With no `influencer`, every task for every recommended influencer runs.
/// With an `influencer` and no `task`, all five tasks run for that
/// influencer. With both, only that task runs and its text is printed.
///
/// # Errors
///
/// Fails when the campaign, its recommendations or the model credentials are
/// missing, when a single requested task fails, or when every task of a bulk
/// run fails.
pub(crate) async fn run_generate(
    config: &AppConfig,
    campaign_id: &str,
    influencer: Option<&str>,
    task: Option<TaskType>,
) -> anyhow::Result<()> {
    let settings = GeminiSettings::from_app_config(config)?;
    let generator = Arc::new(GeminiClient::new(settings)?);

    let pool = crate::connect(config).await?;
    let row = brandmatch_db::get_campaign(&pool, campaign_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("campaign '{campaign_id}' not found"))?;

    let mut influencers = stored_recommendations(&row)?;
    if let Some(username) = influencer {
        influencers.retain(|inf| inf.username == username);
        if influencers.is_empty() {
            anyhow::bail!("@{username} is not among the recommendations of '{campaign_id}'");
        }
    }

    let campaign = normalize_value(&row.data)
        .ok()
        .map(|brief| CampaignContext::from(&brief));
    let orchestrator = Orchestrator::new(
        campaign_id,
        campaign,
        generator,
        Arc::new(PgContentStore::new(pool)),
    )
    .with_task_timeout(Duration::from_secs(config.ai_timeout_secs.saturating_add(30)));

    if let (Some(task), [target]) = (task, influencers.as_slice()) {
        let content = orchestrator
            .run_one(target, task)
            .await
            .with_context(|| format!("{task} for @{}", target.username))?;
        println!("{content}");
        return Ok(());
    }

    let summary = orchestrator.run_all(&influencers).await;
    print_summary(&summary);

    if summary.succeeded == 0 && summary.failed > 0 {
        anyhow::bail!("all {} generation tasks failed", summary.failed);
    }
    Ok(())
}

fn print_summary(summary: &GenerationSummary) {
    for outcome in &summary.outcomes {
        let key = outcome.key.to_string();
        match &outcome.state {
            TaskState::Succeeded { content } => {
                println!("ok      {key:<40} {} chars", content.len());
            }
            TaskState::Failed { kind, message } => {
                println!("failed  {key:<40} {kind:?}: {message}");
            }
            TaskState::Idle | TaskState::Generating => {}
        }
    }
    println!(
        "{} succeeded, {} failed, {} superseded",
        summary.succeeded, summary.failed, summary.superseded
    );
}
