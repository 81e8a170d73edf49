//! Per-campaign generation: bulk and single runs through the campaign's
//! session, the session's status map, and the persisted content with parsed
//! sections.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use brandmatch_ai::{parse_insight_text, parse_strategy_text, ParsedInsight, ParsedStrategy};
use brandmatch_assist::{GenerationError, GenerationSummary, TaskState};
use brandmatch_core::{
    normalize_value, CampaignContext, InfluencerRecommendation, RecommendationResponse, TaskKey,
    TaskType,
};
use brandmatch_db::{CampaignRow, ContentMap};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::campaigns::load_campaign;
use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct GenerationStatus {
    pub campaign_id: String,
    pub tasks: BTreeMap<String, TaskState>,
}

#[derive(Debug, Serialize)]
pub(super) struct SingleGeneration {
    pub key: String,
    pub username: String,
    pub task: TaskType,
    pub state: TaskState,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum ParsedContent {
    Strategy(ParsedStrategy),
    Insight(ParsedInsight),
}

#[derive(Debug, Serialize)]
pub(super) struct ContentItem {
    pub username: String,
    pub task: TaskType,
    pub content_type: &'static str,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    pub parsed: ParsedContent,
}

fn campaign_context(row: &CampaignRow) -> Option<CampaignContext> {
    normalize_value(&row.data)
        .ok()
        .map(|brief| CampaignContext::from(&brief))
}

fn stored_recommendations(
    req_id: &str,
    row: &CampaignRow,
) -> Result<Vec<InfluencerRecommendation>, ApiError> {
    let data = row.recommendation_data.clone().ok_or_else(|| {
        ApiError::new(
            req_id,
            "conflict",
            format!("campaign {} has no recommendations yet", row.id),
        )
    })?;
    let response: RecommendationResponse = serde_json::from_value(data).map_err(|e| {
        tracing::error!(
            campaign_id = %row.id,
            error = %e,
            "stored recommendation data is unreadable"
        );
        ApiError::new(
            req_id,
            "internal_error",
            "stored recommendation data is unreadable",
        )
    })?;
    Ok(response.recommendations)
}

fn map_generation_error(req_id: &str, error: &GenerationError) -> ApiError {
    let code = match error {
        GenerationError::Precondition(_) => "validation_error",
        GenerationError::Superseded(_) => "conflict",
        GenerationError::TimedOut(_) => "upstream_timeout",
        GenerationError::Ai(brandmatch_ai::AiError::NotConfigured(_)) => "service_unavailable",
        GenerationError::Ai(_) => "generation_failed",
    };
    ApiError::new(req_id, code, error.to_string())
}

/// POST /api/v1/campaigns/{id}/generations
///
/// Runs every task for every recommended influencer and waits for all of
/// them. Individual failures are reported in the summary, not as an error.
pub(super) async fn generate_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<GenerationSummary>>, ApiError> {
    let rid = &req_id.0;
    state.require_generator(rid)?;

    let row = load_campaign(&state, rid, &id).await?;
    let influencers = stored_recommendations(rid, &row)?;
    let session = state.session(&id, campaign_context(&row)).await;

    let summary = session.run_all(&influencers).await;
    Ok(ApiResponse::new(summary, req_id.0))
}

/// POST /api/v1/campaigns/{id}/generations/{username}/{task}
pub(super) async fn generate_one(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, username, task)): Path<(String, String, String)>,
) -> Result<Json<ApiResponse<SingleGeneration>>, ApiError> {
    let rid = &req_id.0;
    let task: TaskType = task
        .parse()
        .map_err(|e| ApiError::new(rid, "validation_error", format!("{e}")))?;
    state.require_generator(rid)?;

    let row = load_campaign(&state, rid, &id).await?;
    let influencer = stored_recommendations(rid, &row)?
        .into_iter()
        .find(|inf| inf.username == username)
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "not_found",
                format!("@{username} is not among the recommendations of campaign {id}"),
            )
        })?;

    let session = state.session(&id, campaign_context(&row)).await;
    session
        .run_one(&influencer, task)
        .await
        .map_err(|e| map_generation_error(rid, &e))?;

    let key = TaskKey::new(username, task);
    let task_state = session.state(&key);
    Ok(ApiResponse::new(
        SingleGeneration {
            key: key.to_string(),
            username: key.username,
            task,
            state: task_state,
        },
        req_id.0,
    ))
}

/// GET /api/v1/campaigns/{id}/generations
///
/// Status of every task the campaign's session knows about, including
/// content persisted by earlier sessions.
pub(super) async fn generation_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<GenerationStatus>>, ApiError> {
    let row = load_campaign(&state, &req_id.0, &id).await?;
    let session = state.session(&id, campaign_context(&row)).await;

    let tasks = session
        .snapshot()
        .into_iter()
        .map(|(key, task_state)| (key.to_string(), task_state))
        .collect();

    Ok(ApiResponse::new(
        GenerationStatus {
            campaign_id: id,
            tasks,
        },
        req_id.0,
    ))
}

/// GET /api/v1/campaigns/{id}/content
///
/// Every persisted strategy and insight, with parsed display sections.
/// Unparseable text comes back as the raw-text variant.
pub(super) async fn list_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ContentItem>>>, ApiError> {
    let rid = &req_id.0;
    load_campaign(&state, rid, &id).await?;

    let (strategies, insights) = tokio::try_join!(
        state.store.load_all_strategies(&id),
        state.store.load_all_insights(&id),
    )
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let mut items = content_items(strategies);
    items.extend(content_items(insights));
    items.sort_by(|a, b| (&a.username, a.task).cmp(&(&b.username, b.task)));

    Ok(ApiResponse::new(items, req_id.0))
}

fn content_items(map: ContentMap) -> Vec<ContentItem> {
    map.into_iter()
        .map(|(key, stored)| {
            let parsed = match key.task {
                TaskType::Strategy => {
                    ParsedContent::Strategy(parse_strategy_text(&stored.content))
                }
                _ => ParsedContent::Insight(parse_insight_text(&stored.content)),
            };
            ContentItem {
                content_type: key.task.content_kind().as_str(),
                username: key.username,
                task: key.task,
                content: stored.content,
                generated_at: stored.generated_at,
                parsed,
            }
        })
        .collect()
}
