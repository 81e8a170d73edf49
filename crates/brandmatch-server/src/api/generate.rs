//! Stateless prompt endpoints used by the dashboard before campaign sessions
//! existed. They answer with bare `{insights}` / `{strategy}` / `{error}`
//! bodies instead of the `/api/v1` envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use brandmatch_ai::{build_prompt, GenerationParams, PromptKind};
use brandmatch_assist::{generate_for_task, GenerationError};
use brandmatch_core::{CampaignContext, InfluencerRecommendation, InsightType, TaskType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateInsightsRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub campaign_brief: Option<CampaignContext>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateStrategyRequest {
    #[serde(default)]
    pub influencer_data: Option<Value>,
    #[serde(default)]
    pub campaign_brief: Option<CampaignContext>,
}

#[derive(Debug, Serialize)]
pub(super) struct InsightsResponse {
    pub insights: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct StrategyResponse {
    pub strategy: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LegacyError {
    pub error: String,
}

type LegacyRejection = (StatusCode, Json<LegacyError>);
type LegacyResult<T> = Result<Json<T>, LegacyRejection>;

fn bad_request(message: impl Into<String>) -> LegacyRejection {
    (
        StatusCode::BAD_REQUEST,
        Json(LegacyError {
            error: message.into(),
        }),
    )
}

fn generation_failure(error: &GenerationError) -> LegacyRejection {
    match error {
        GenerationError::Precondition(_) => bad_request(error.to_string()),
        _ => {
            tracing::error!(
                error = %error,
                kind = ?error.kind(),
                "prompt endpoint generation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LegacyError {
                    error: error.to_string(),
                }),
            )
        }
    }
}

fn influencer_from(
    value: Option<Value>,
    field: &str,
) -> Result<InfluencerRecommendation, LegacyRejection> {
    let value = value
        .filter(Value::is_object)
        .ok_or_else(|| bad_request(format!("{field} must be an object")))?;
    serde_json::from_value(value).map_err(|e| bad_request(format!("invalid {field}: {e}")))
}

/// POST /api/generate-insights
pub(super) async fn generate_insights(
    State(state): State<AppState>,
    body: Result<Json<GenerateInsightsRequest>, JsonRejection>,
) -> LegacyResult<InsightsResponse> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;
    let kind = body.kind.trim().to_ascii_lowercase();
    let campaign = body.campaign_brief.as_ref();

    let insights = if kind == "general" {
        let prompt = body
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| bad_request("prompt is required for general insights"))?;
        let subject = match body.data {
            Some(data) => influencer_from(Some(data), "data")?,
            None => InfluencerRecommendation::default(),
        };
        let prompt = build_prompt(PromptKind::General(prompt), &subject, campaign);
        state
            .generator
            .generate_text(&prompt, GenerationParams::GENERAL)
            .await
            .map_err(|e| generation_failure(&GenerationError::Ai(e)))?
    } else {
        let insight: InsightType = kind
            .parse()
            .map_err(|_| bad_request(format!("unknown insight type: {}", body.kind)))?;
        let influencer = influencer_from(body.data, "data")?;
        generate_for_task(
            state.generator.as_ref(),
            &influencer,
            TaskType::from(insight),
            campaign,
        )
        .await
        .map_err(|e| generation_failure(&e))?
    };

    tracing::info!(kind = %kind, chars = insights.len(), "insights generated");
    Ok(Json(InsightsResponse {
        insights,
        kind,
        timestamp: Utc::now(),
    }))
}

/// POST /api/generate-strategy
pub(super) async fn generate_strategy(
    State(state): State<AppState>,
    body: Result<Json<GenerateStrategyRequest>, JsonRejection>,
) -> LegacyResult<StrategyResponse> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;
    let influencer = influencer_from(body.influencer_data, "influencerData")?;

    let strategy = generate_for_task(
        state.generator.as_ref(),
        &influencer,
        TaskType::Strategy,
        body.campaign_brief.as_ref(),
    )
    .await
    .map_err(|e| generation_failure(&e))?;

    tracing::info!(username = %influencer.username, "strategy generated");
    Ok(Json(StrategyResponse { strategy }))
}
