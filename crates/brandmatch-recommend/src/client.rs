//! HTTP client for the recommendation service.
//!
//! Wraps `reqwest` with the service's envelope checks: a 200 response is only
//! a success when `status == "success"` and at least one recommendation came
//! back. Transport failures are split into connectivity and timeout errors so
//! callers can tell "service down" apart from "service said no". There are no
//! retries here; the caller decides whether to try again.

use std::time::{Duration, Instant};

use brandmatch_core::{CampaignBrief, RecommendOptions, RecommendationResponse};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::RecommendError;

const RECOMMEND_PATH: &str = "api/recommend-influencers";
const DATA_STATUS_PATH: &str = "api/data-status";

/// Client for the recommendation service.
///
/// Holds the HTTP client and normalised base URL. Point `base_url` at a
/// wiremock server in tests.
pub struct RecommendationClient {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
}

/// Combined liveness and data-readiness view, used for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub online: bool,
    pub service: Option<Value>,
    pub data_status: Option<Value>,
    pub error: Option<String>,
}

/// A validated recommendation response alongside the JSON body exactly as
/// the service returned it. Persist `raw`; read `response`.
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub response: RecommendationResponse,
    pub raw: Value,
}

impl RecommendationClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RecommendError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`RecommendError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RecommendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("brandmatch/0.1 (campaign-assist)")
            .build()?;

        // A trailing slash keeps `Url::join` appending to any path prefix
        // instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| RecommendError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            timeout_secs,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Requests ranked influencers for `brief`.
    ///
    /// Sends one `POST /api/recommend-influencers` with the brief as JSON and
    /// the option flags as query parameters.
    ///
    /// # Errors
    ///
    /// - [`RecommendError::Connect`] / [`RecommendError::Timeout`] when the
    ///   service cannot be reached in time.
    /// - [`RecommendError::Upstream`] on a non-2xx status, with the body.
    /// - [`RecommendError::InvalidResponse`] when `status` is not `"success"`
    ///   or `recommendations` is empty, null or missing, even on HTTP 200.
    /// - [`RecommendError::Deserialize`] when the body is not the expected shape.
    pub async fn request_recommendations(
        &self,
        brief: &CampaignBrief,
        options: RecommendOptions,
    ) -> Result<RecommendationResponse, RecommendError> {
        self.request_recommendations_with_raw(brief, options)
            .await
            .map(|result| result.response)
    }

    /// Same call as [`Self::request_recommendations`], also returning the
    /// received body untouched so it can be stored without loss.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request_recommendations`].
    pub async fn request_recommendations_with_raw(
        &self,
        brief: &CampaignBrief,
        options: RecommendOptions,
    ) -> Result<Recommendations, RecommendError> {
        let url = self.recommend_url(options);
        let started = Instant::now();

        tracing::info!(
            brief_id = %brief.brief_id,
            total_influencer = brief.total_influencer,
            adaptive_weights = options.adaptive_weights,
            include_insights = options.include_insights,
            "requesting influencer recommendations"
        );

        let response = self
            .client
            .post(url.clone())
            .json(brief)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        let body = self.read_success_body(&url, response).await?;

        let parsed = parse_recommendations(&body, &brief.brief_id)?;

        tracing::info!(
            brief_id = %brief.brief_id,
            count = parsed.response.recommendations.len(),
            latency_ms = started.elapsed().as_millis(),
            "recommendations received"
        );

        Ok(parsed)
    }

    /// Fetches `GET /api/data-status`.
    ///
    /// # Errors
    ///
    /// Same transport and status errors as [`Self::request_recommendations`];
    /// the body only has to be JSON.
    pub async fn data_status(&self) -> Result<Value, RecommendError> {
        let url = self.endpoint(DATA_STATUS_PATH)?;
        self.get_json(&url).await
    }

    /// Liveness probe: `GET /`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::data_status`].
    pub async fn ping(&self) -> Result<Value, RecommendError> {
        let url = self.base_url.clone();
        self.get_json(&url).await
    }

    /// Runs both probes and folds the outcome into a [`ServiceStatus`].
    /// Never fails; probe errors are reported in `error`.
    pub async fn status(&self) -> ServiceStatus {
        let (service, data_status) = tokio::join!(self.ping(), self.data_status());

        let error = match (&service, &data_status) {
            (Err(e), _) | (Ok(_), Err(e)) => Some(e.to_string()),
            _ => None,
        };

        ServiceStatus {
            online: service.is_ok(),
            service: service.ok(),
            data_status: data_status.ok(),
            error,
        }
    }

    fn recommend_url(&self, options: RecommendOptions) -> Url {
        let mut url = self
            .base_url
            .join(RECOMMEND_PATH)
            .unwrap_or_else(|_| self.base_url.clone());
        url.query_pairs_mut()
            .append_pair("adaptive_weights", bool_param(options.adaptive_weights))
            .append_pair("include_insights", bool_param(options.include_insights));
        url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RecommendError> {
        self.base_url
            .join(path)
            .map_err(|e| RecommendError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_json(&self, url: &Url) -> Result<Value, RecommendError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        let body = self.read_success_body(url, response).await?;
        serde_json::from_str(&body).map_err(|e| RecommendError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    /// Returns the body of a 2xx response, or [`RecommendError::Upstream`]
    /// carrying the status and the verbatim body.
    async fn read_success_body(
        &self,
        url: &Url,
        response: Response,
    ) -> Result<String, RecommendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "recommendation service error");
            return Err(RecommendError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn transport_error(&self, url: &Url, err: reqwest::Error) -> RecommendError {
        if err.is_timeout() {
            RecommendError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            RecommendError::Connect {
                url: url.to_string(),
                source: err,
            }
        } else {
            RecommendError::Http(err)
        }
    }
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Validates and decodes a 2xx recommendation body.
fn parse_recommendations(body: &str, brief_id: &str) -> Result<Recommendations, RecommendError> {
    let context = || format!("recommend-influencers(brief_id={brief_id})");

    let value: Value = serde_json::from_str(body).map_err(|e| RecommendError::Deserialize {
        context: context(),
        source: e,
    })?;

    match value.get("status").and_then(Value::as_str) {
        Some("success") => {}
        Some(other) => {
            let detail = value
                .get("message")
                .or_else(|| value.get("detail"))
                .and_then(Value::as_str)
                .map(|m| format!(": {m}"))
                .unwrap_or_default();
            return Err(RecommendError::InvalidResponse(format!(
                "status was \"{other}\"{detail}"
            )));
        }
        None => {
            return Err(RecommendError::InvalidResponse(
                "missing status field".to_string(),
            ))
        }
    }

    if !value.get("recommendations").is_some_and(Value::is_array) {
        return Err(RecommendError::InvalidResponse(
            "no recommendations returned".to_string(),
        ));
    }

    let parsed: RecommendationResponse =
        serde_json::from_value(value.clone()).map_err(|e| RecommendError::Deserialize {
            context: context(),
            source: e,
        })?;

    if parsed.recommendations.is_empty() {
        return Err(RecommendError::InvalidResponse(
            "no recommendations returned".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for rec in &parsed.recommendations {
        if !seen.insert(rec.username.as_str()) {
            tracing::warn!(
                brief_id,
                username = %rec.username,
                "duplicate username in recommendation response"
            );
        }
    }

    Ok(Recommendations {
        response: parsed,
        raw: value,
    })
}
