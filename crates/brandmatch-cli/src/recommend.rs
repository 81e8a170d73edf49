//! `recommend` and `status` command handlers.

use std::path::PathBuf;

use brandmatch_core::{
    normalize_value, AppConfig, CampaignBrief, RecommendOptions, RecommendationResponse,
};
use brandmatch_recommend::{RecommendationClient, Recommendations};

use crate::normalize::read_brief;

#[derive(Debug)]
pub(crate) enum BriefSource {
    Campaign(String),
    File(PathBuf),
}

fn build_client(config: &AppConfig) -> anyhow::Result<RecommendationClient> {
    Ok(RecommendationClient::new(
        &config.recommender_url,
        config.recommender_timeout_secs,
    )?)
}

/// Requests recommendations for the brief from `source` and prints a ranked
/// table. With `save`, the response is stored on the campaign.
///
/// # Errors
///
/// Fails when the brief cannot be loaded, the service call fails, or the
/// response cannot be stored.
pub(crate) async fn run_recommend(
    config: &AppConfig,
    source: BriefSource,
    options: RecommendOptions,
    save: bool,
) -> anyhow::Result<()> {
    let client = build_client(config)?;

    let (brief, pool) = match &source {
        BriefSource::File(path) => (read_brief(path)?.0, None),
        BriefSource::Campaign(id) => {
            let pool = crate::connect(config).await?;
            let row = brandmatch_db::get_campaign(&pool, id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("campaign '{id}' not found"))?;
            (normalize_value(&row.data)?, Some(pool))
        }
    };

    let Recommendations { response, raw } = client
        .request_recommendations_with_raw(&brief, options)
        .await?;
    print_ranking(&brief, &response);

    if save {
        if let (BriefSource::Campaign(id), Some(pool)) = (&source, &pool) {
            brandmatch_db::save_recommendation_data(pool, id, &raw).await?;
            println!(
                "saved {} recommendations to campaign {id}",
                response.recommendations.len()
            );
        }
    }
    Ok(())
}

fn print_ranking(brief: &CampaignBrief, response: &RecommendationResponse) {
    println!(
        "{} recommendations for {} ({})",
        response.recommendations.len(),
        brief.brand_name,
        brief.brief_id
    );
    for rec in &response.recommendations {
        let score = rec
            .scores
            .as_ref()
            .and_then(|s| s.final_score)
            .map_or_else(|| "-".to_string(), |s| format!("{:.1}%", s * 100.0));
        let tier = rec
            .tier
            .map_or_else(|| "-".to_string(), |t| format!("{t:?}"));
        println!("{:>3}. @{:<24} {:<8} {score}", rec.rank, rec.username, tier);
    }
}

/// Prints the liveness and data-status probes as JSON.
///
/// # Errors
///
/// Fails only when the client cannot be built or the output cannot be
/// encoded; an offline service is reported, not returned as an error.
pub(crate) async fn run_status(config: &AppConfig) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let status = client.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    if !status.online {
        tracing::warn!(url = client.base_url(), "recommendation service is offline");
    }
    Ok(())
}
