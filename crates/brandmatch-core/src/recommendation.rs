//! Response types of the external recommendation service.
//!
//! The service is the source of truth for these shapes; this layer only reads
//! them. Unknown fields on each recommendation are kept in `extra` so the
//! record can be persisted back verbatim as `recommendation_data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query flags for `POST /api/recommend-influencers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub adaptive_weights: bool,
    pub include_insights: bool,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            adaptive_weights: true,
            include_insights: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    #[serde(alias = "nano", alias = "NANO")]
    Nano,
    #[serde(alias = "micro", alias = "MICRO")]
    Micro,
    #[serde(alias = "mid", alias = "MID", alias = "Mid-tier")]
    Mid,
    #[serde(alias = "macro", alias = "MACRO")]
    Macro,
    #[serde(alias = "mega", alias = "MEGA")]
    Mega,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Tier::Nano => "Nano",
            Tier::Micro => "Micro",
            Tier::Mid => "Mid",
            Tier::Macro => "Macro",
            Tier::Mega => "Mega",
            Tier::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Sub-scores in `[0, 1]` plus the weighted final score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scores {
    pub audience_fit: Option<f64>,
    pub persona_fit: Option<f64>,
    pub performance_pred: Option<f64>,
    pub budget_efficiency: Option<f64>,
    pub final_score: Option<f64>,
}

impl Scores {
    #[must_use]
    pub fn is_populated(&self) -> bool {
        [
            self.audience_fit,
            self.persona_fit,
            self.performance_pred,
            self.budget_efficiency,
            self.final_score,
        ]
        .iter()
        .any(Option::is_some)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub engagement_rate: Option<f64>,
    pub authenticity_score: Option<f64>,
    pub reach_potential: Option<f64>,
    pub brand_fit: Option<f64>,
}

impl PerformanceMetrics {
    #[must_use]
    pub fn is_populated(&self) -> bool {
        [
            self.engagement_rate,
            self.authenticity_score,
            self.reach_potential,
            self.brand_fit,
        ]
        .iter()
        .any(Option::is_some)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMix {
    #[serde(alias = "feeds_count")]
    pub feeds: u32,
    #[serde(alias = "reels_count")]
    pub reels: u32,
    #[serde(alias = "stories_count")]
    pub stories: u32,
    pub total_cost: f64,
    pub total_impact: f64,
    pub remaining_budget: f64,
}

/// One ranked influencer from the recommendation service.
///
/// Every field is defaulted so partial objects posted by the dashboard to the
/// prompt endpoints still deserialize; the orchestrator checks what each task
/// actually needs before generating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluencerRecommendation {
    pub username: String,
    pub rank: u32,
    pub tier: Option<Tier>,
    pub expertise: Option<String>,
    pub scores: Option<Scores>,
    pub performance_metrics: Option<PerformanceMetrics>,
    pub optimal_content_mix: Option<ContentMix>,
    pub insights: Option<String>,
    #[serde(alias = "caption_behavior_summary")]
    pub caption_behavior: Option<String>,
    #[serde(alias = "comment_behavior_summary")]
    pub comment_behavior: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InfluencerRecommendation {
    /// Text the caption insight task reads: the dedicated blob when present,
    /// otherwise the generic `insights` blob.
    #[must_use]
    pub fn caption_source(&self) -> Option<&str> {
        first_non_blank(&[&self.caption_behavior, &self.insights])
    }

    /// Text the comment insight task reads, with the same fallback rule.
    #[must_use]
    pub fn comment_source(&self) -> Option<&str> {
        first_non_blank(&[&self.comment_behavior, &self.insights])
    }

    #[must_use]
    pub fn populated_scores(&self) -> Option<&Scores> {
        self.scores.as_ref().filter(|s| s.is_populated())
    }

    #[must_use]
    pub fn populated_metrics(&self) -> Option<&PerformanceMetrics> {
        self.performance_metrics
            .as_ref()
            .filter(|m| m.is_populated())
    }
}

fn first_non_blank<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefSummary {
    pub brief_id: Option<String>,
    pub summary: Option<Value>,
    pub total_found: Option<u32>,
    pub total_requested: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringStrategy {
    pub audience_fit: Option<f64>,
    pub persona_fit: Option<f64>,
    pub performance_pred: Option<f64>,
    pub budget_efficiency: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationMetadata {
    pub use_adaptive_weights: bool,
    pub include_insights: bool,
    pub scoring_strategy: Option<ScoringStrategy>,
    pub adaptive_weights_info: Option<Value>,
}

/// Envelope returned by `POST /api/recommend-influencers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub brief: Option<BriefSummary>,
    #[serde(default)]
    pub recommendations: Vec<InfluencerRecommendation>,
    #[serde(default)]
    pub metadata: Option<RecommendationMetadata>,
}
