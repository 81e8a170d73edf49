//! The campaign brief sent to the recommendation service.
//!
//! Field names and types here are the service's wire contract: a string
//! where it expects a list (or the reverse) fails the whole request, so
//! nothing outside [`crate::normalize`] should build one from loose data.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    /// Case-insensitive parse; anything unrecognised yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTolerance::Low => write!(f, "Low"),
            RiskTolerance::Medium => write!(f, "Medium"),
            RiskTolerance::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLocations {
    pub countries: Vec<String>,
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiencePreference {
    pub top_locations: TopLocations,
    pub age_range: Vec<String>,
    pub gender: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefOutput {
    pub content_types: Vec<String>,
    pub deliverables: u32,
}

/// Strictly-typed request payload for `POST /api/recommend-influencers`.
///
/// `esg_allignment` keeps the service's spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignBrief {
    pub brief_id: String,
    pub brand_name: String,
    pub industry: String,
    pub product_name: String,
    pub overview: String,
    pub usp: String,
    pub marketing_objective: Vec<String>,
    pub target_goals: Vec<String>,
    pub audience_preference: AudiencePreference,
    pub influencer_persona: String,
    pub total_influencer: u32,
    pub niche: Vec<String>,
    pub location_prior: Vec<String>,
    pub esg_allignment: Vec<String>,
    pub budget: f64,
    pub output: BriefOutput,
    pub risk_tolerance: RiskTolerance,
}

/// Campaign fields interpolated into prompts.
///
/// Everything is optional: the prompt endpoints accept a partial brief from
/// the dashboard, and the prompt builder renders absent values as explicit
/// placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignContext {
    #[serde(alias = "brandName")]
    pub brand_name: Option<String>,
    #[serde(alias = "productName")]
    pub product_name: Option<String>,
    pub industry: Option<String>,
    #[serde(alias = "marketingObjective")]
    pub marketing_objective: Vec<String>,
    #[serde(alias = "targetGoals")]
    pub target_goals: Vec<String>,
    pub overview: Option<String>,
    pub usp: Option<String>,
    #[serde(alias = "influencerPersona")]
    pub influencer_persona: Option<String>,
    pub budget: Option<f64>,
}

impl From<&CampaignBrief> for CampaignContext {
    fn from(brief: &CampaignBrief) -> Self {
        Self {
            brand_name: Some(brief.brand_name.clone()),
            product_name: Some(brief.product_name.clone()),
            industry: Some(brief.industry.clone()),
            marketing_objective: brief.marketing_objective.clone(),
            target_goals: brief.target_goals.clone(),
            overview: Some(brief.overview.clone()),
            usp: Some(brief.usp.clone()),
            influencer_persona: Some(brief.influencer_persona.clone()),
            budget: Some(brief.budget),
        }
    }
}
