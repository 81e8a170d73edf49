//! Shared domain types and configuration for brandmatch.
//!
//! Holds the strict [`CampaignBrief`] wire contract, the boundary that
//! coerces loose campaign records into it ([`normalize_brief`]), the
//! recommendation response types, and the generation task vocabulary used by
//! the orchestrator and the persistence layer.

pub mod app_config;
pub mod brief;
pub mod config;
pub mod normalize;
pub mod recommendation;
pub mod task;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use brief::{
    AudiencePreference, BriefOutput, CampaignBrief, CampaignContext, RiskTolerance, TopLocations,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use normalize::{normalize_brief, normalize_value, normalize_with_report, NormalizationReport};
pub use recommendation::{
    BriefSummary, ContentMix, InfluencerRecommendation, PerformanceMetrics, RecommendOptions,
    RecommendationMetadata, RecommendationResponse, Scores, ScoringStrategy, Tier,
};
pub use task::{ContentKind, InsightType, TaskKey, TaskType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// The campaign record was absent or not a JSON object, so there is
    /// nothing to default field-by-field.
    #[error("campaign record is missing or not an object (got {0})")]
    MissingCampaign(&'static str),

    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("unknown insight type: {0}")]
    UnknownInsightType(String),
}
