mod campaigns;
mod generate;
mod generations;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use brandmatch_ai::TextGenerator;
use brandmatch_assist::Orchestrator;
use brandmatch_core::CampaignContext;
use brandmatch_db::{ContentStore, DbError};
use brandmatch_recommend::{RecommendError, RecommendationClient};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};
use crate::sessions::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub recommender: Arc<RecommendationClient>,
    pub generator: Arc<dyn TextGenerator>,
    pub sessions: Arc<SessionRegistry>,
    pub task_timeout: Duration,
}

impl AppState {
    /// The generation session of `campaign_id`, started on first use.
    pub(super) async fn session(
        &self,
        campaign_id: &str,
        campaign: Option<CampaignContext>,
    ) -> Arc<Orchestrator> {
        self.sessions
            .get_or_start(campaign_id, || {
                Orchestrator::new(
                    campaign_id,
                    campaign,
                    Arc::clone(&self.generator),
                    Arc::clone(&self.store),
                )
                .with_task_timeout(self.task_timeout)
            })
            .await
    }

    pub(super) fn require_generator(&self, request_id: &str) -> Result<(), ApiError> {
        if self.generator.is_configured() {
            Ok(())
        } else {
            Err(ApiError::new(
                request_id,
                "service_unavailable",
                "text generation is not configured (GEMINI_API_KEY)",
            ))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    generation: &'static str,
    sessions: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" | "upstream_error" | "invalid_upstream_response"
            | "generation_failed" => StatusCode::BAD_GATEWAY,
            "upstream_timeout" => StatusCode::GATEWAY_TIMEOUT,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        DbError::UnknownCampaign(id) => {
            ApiError::new(request_id, "not_found", format!("campaign {id} not found"))
        }
        DbError::DuplicateCampaign(id) => ApiError::new(
            request_id,
            "conflict",
            format!("campaign {id} already exists"),
        ),
        DbError::Sqlx(_) | DbError::Migration(_) => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_recommend_error(request_id: String, error: &RecommendError) -> ApiError {
    tracing::warn!(error = %error, "recommendation request failed");
    match error {
        RecommendError::Connect { .. } => ApiError::new(
            request_id,
            "upstream_unavailable",
            "cannot connect to the recommendation service",
        ),
        RecommendError::Timeout { .. } => {
            ApiError::new(request_id, "upstream_timeout", error.to_string())
        }
        RecommendError::Upstream { .. } => {
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
        RecommendError::InvalidResponse(_) | RecommendError::Deserialize { .. } => {
            ApiError::new(request_id, "invalid_upstream_response", error.to_string())
        }
        RecommendError::Http(_) | RecommendError::InvalidBaseUrl { .. } => {
            ApiError::new(request_id, "internal_error", "recommendation client failure")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/generate-insights", post(generate::generate_insights))
        .route("/api/generate-strategy", post(generate::generate_strategy))
        .route(
            "/api/v1/recommender/status",
            get(campaigns::recommender_status),
        )
        .route(
            "/api/v1/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}",
            get(campaigns::get_campaign).delete(campaigns::delete_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}/recommendations",
            post(campaigns::request_recommendations),
        )
        .route(
            "/api/v1/campaigns/{id}/generations",
            get(generations::generation_status).post(generations::generate_all),
        )
        .route(
            "/api/v1/campaigns/{id}/generations/{username}/{task}",
            post(generations::generate_one),
        )
        .route(
            "/api/v1/campaigns/{id}/content",
            get(generations::list_content),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let generation = if state.generator.is_configured() {
        "configured"
    } else {
        "not_configured"
    };
    let sessions = state.sessions.active_sessions();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "ok",
                    generation,
                    sessions,
                },
                req_id.0,
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                        generation,
                        sessions,
                    },
                    req_id.0,
                ),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests;
