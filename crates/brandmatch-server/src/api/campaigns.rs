//! Campaign records and the recommendation call that ranks influencers for
//! them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use brandmatch_core::{normalize_value, RecommendOptions, RecommendationResponse};
use brandmatch_db::CampaignRow;
use brandmatch_recommend::{Recommendations, ServiceStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{
    map_db_error, map_recommend_error, normalize_limit, ApiError, ApiResponse, AppState,
};

const MAX_CAMPAIGN_ID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub(super) struct CreateCampaignRequest {
    pub id: Option<String>,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListCampaignsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecommendQuery {
    pub adaptive_weights: Option<bool>,
    pub include_insights: Option<bool>,
}

impl RecommendQuery {
    fn options(&self) -> RecommendOptions {
        let defaults = RecommendOptions::default();
        RecommendOptions {
            adaptive_weights: self.adaptive_weights.unwrap_or(defaults.adaptive_weights),
            include_insights: self.include_insights.unwrap_or(defaults.include_insights),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedCampaign {
    pub id: String,
    pub deleted: bool,
}

fn validate_campaign_id(req_id: &str, id: &str) -> Result<(), ApiError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_CAMPAIGN_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "id must be 1-{MAX_CAMPAIGN_ID_LEN} characters of letters, digits, '-', '_' or '.'"
            ),
        ))
    }
}

/// Loads the campaign or answers 404.
pub(super) async fn load_campaign(
    state: &AppState,
    req_id: &str,
    id: &str,
) -> Result<CampaignRow, ApiError> {
    state
        .store
        .get_campaign(id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(req_id, "not_found", format!("campaign {id} not found")))
}

/// GET /api/v1/campaigns
pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<ApiResponse<Vec<CampaignRow>>>, ApiError> {
    let rows = state
        .store
        .list_campaigns(normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(rows, req_id.0))
}

/// POST /api/v1/campaigns
pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignRow>>), ApiError> {
    let rid = &req_id.0;

    if !body.data.is_object() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "data must be a JSON object",
        ));
    }
    let id = body.id.as_deref().map(str::trim);
    if let Some(id) = id {
        validate_campaign_id(rid, id)?;
    }

    let row = state
        .store
        .create_campaign(id, &body.data)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(campaign_id = %row.id, "campaign created");
    Ok((StatusCode::CREATED, ApiResponse::new(row, req_id.0)))
}

/// GET /api/v1/campaigns/{id}
pub(super) async fn get_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CampaignRow>>, ApiError> {
    let row = load_campaign(&state, &req_id.0, &id).await?;
    Ok(ApiResponse::new(row, req_id.0))
}

/// DELETE /api/v1/campaigns/{id}
///
/// Generated content goes with the campaign.
pub(super) async fn delete_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedCampaign>>, ApiError> {
    let deleted = state
        .store
        .delete_campaign(&id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("campaign {id} not found"),
        ));
    }

    state.sessions.end(&id);
    tracing::info!(campaign_id = %id, "campaign deleted");
    Ok(ApiResponse::new(DeletedCampaign { id, deleted }, req_id.0))
}

/// POST /api/v1/campaigns/{id}/recommendations
///
/// Normalizes the stored record into a brief, asks the recommendation
/// service for ranked influencers and stores the response verbatim. The
/// campaign's generation session is restarted so later runs use the fresh
/// brief.
pub(super) async fn request_recommendations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, ApiError> {
    let rid = &req_id.0;
    let row = load_campaign(&state, rid, &id).await?;

    let brief = normalize_value(&row.data)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let Recommendations { response, raw } = state
        .recommender
        .request_recommendations_with_raw(&brief, query.options())
        .await
        .map_err(|e| map_recommend_error(rid.clone(), &e))?;

    state
        .store
        .save_recommendation_data(&id, &raw)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    state.sessions.end(&id);

    Ok(ApiResponse::new(response, req_id.0))
}

/// GET /api/v1/recommender/status
pub(super) async fn recommender_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ServiceStatus>> {
    let status = state.recommender.status().await;
    if !status.online {
        tracing::warn!(error = ?status.error, "recommendation service offline");
    }
    ApiResponse::new(status, req_id.0)
}
