//! Coercion of loosely-typed campaign records into a [`CampaignBrief`].
//!
//! Campaign documents are written by a JavaScript dashboard, so any field may
//! be missing, empty, a numeric string, or a scalar where a list is expected.
//! This module is the only place that tolerates that: every field is resolved
//! to the exact wire type, substituting a documented default when the source
//! value is unusable. Substitutions are recorded in a
//! [`NormalizationReport`] for troubleshooting and never change the output.

use serde_json::{Map, Value};

use crate::brief::{AudiencePreference, BriefOutput, CampaignBrief, RiskTolerance, TopLocations};
use crate::CoreError;

pub const DEFAULT_TOTAL_INFLUENCER: u32 = 3;
pub const DEFAULT_BUDGET: f64 = 50_000_000.0;
pub const DEFAULT_DELIVERABLES: u32 = 3;
pub const DEFAULT_RISK_TOLERANCE: RiskTolerance = RiskTolerance::Medium;

const DEFAULT_BRAND_NAME: &str = "Unknown Brand";
const DEFAULT_INDUSTRY: &str = "General";
const DEFAULT_PRODUCT_NAME: &str = "Unspecified Product";
const DEFAULT_OVERVIEW: &str = "No overview provided";
const DEFAULT_USP: &str = "Not specified";
const DEFAULT_PERSONA: &str = "Not specified";

const DEFAULT_MARKETING_OBJECTIVE: &[&str] = &["Brand Awareness"];
const DEFAULT_TARGET_GOALS: &[&str] = &["Awareness"];
const DEFAULT_NICHE: &[&str] = &["Lifestyle"];
const DEFAULT_LOCATION_PRIOR: &[&str] = &["Indonesia"];
const DEFAULT_ESG: &[&str] = &["None"];
const DEFAULT_COUNTRIES: &[&str] = &["Indonesia"];
const DEFAULT_CITIES: &[&str] = &["Jakarta"];
const DEFAULT_AGE_RANGE: &[&str] = &["18-34"];
const DEFAULT_GENDER: &[&str] = &["All"];
const DEFAULT_CONTENT_TYPES: &[&str] = &["Reels"];

/// Names of the brief fields that fell back to a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub defaulted: Vec<&'static str>,
}

impl NormalizationReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defaulted.is_empty()
    }

    fn note(&mut self, field: &'static str) {
        self.defaulted.push(field);
    }
}

/// Normalize any JSON value into a brief.
///
/// # Errors
///
/// Returns [`CoreError::MissingCampaign`] when `value` is not a JSON object.
/// Objects never fail, however malformed their fields are.
pub fn normalize_value(value: &Value) -> Result<CampaignBrief, CoreError> {
    match value {
        Value::Object(record) => Ok(normalize_brief(record)),
        Value::Null => Err(CoreError::MissingCampaign("null")),
        Value::Bool(_) => Err(CoreError::MissingCampaign("boolean")),
        Value::Number(_) => Err(CoreError::MissingCampaign("number")),
        Value::String(_) => Err(CoreError::MissingCampaign("string")),
        Value::Array(_) => Err(CoreError::MissingCampaign("array")),
    }
}

/// Normalize a campaign record, logging which fields were defaulted.
#[must_use]
pub fn normalize_brief(record: &Map<String, Value>) -> CampaignBrief {
    let (brief, report) = normalize_with_report(record);
    if !report.is_empty() {
        tracing::info!(
            brief_id = %brief.brief_id,
            defaulted = ?report.defaulted,
            "campaign brief fields defaulted during normalization"
        );
    }
    brief
}

/// Normalize a campaign record and return the substitution report alongside.
#[must_use]
pub fn normalize_with_report(record: &Map<String, Value>) -> (CampaignBrief, NormalizationReport) {
    let mut report = NormalizationReport::default();
    let r = &mut report;

    let audience = nested(record, &["audience_preference", "audiencePreference"]);
    let top_locations = audience
        .and_then(|a| nested(a, &["top_locations", "topLocations"]))
        .or(audience);
    let output = nested(record, &["output"]);

    let brief = CampaignBrief {
        brief_id: brief_id(record, r),
        brand_name: text(record, r, "brand_name", &["brand_name", "brandName"], DEFAULT_BRAND_NAME),
        industry: text(record, r, "industry", &["industry"], DEFAULT_INDUSTRY),
        product_name: text(
            record,
            r,
            "product_name",
            &["product_name", "productName"],
            DEFAULT_PRODUCT_NAME,
        ),
        overview: text(record, r, "overview", &["overview"], DEFAULT_OVERVIEW),
        usp: text(record, r, "usp", &["usp"], DEFAULT_USP),
        marketing_objective: list(
            &[record],
            r,
            "marketing_objective",
            &["marketing_objective", "marketingObjective"],
            DEFAULT_MARKETING_OBJECTIVE,
        ),
        target_goals: list(
            &[record],
            r,
            "target_goals",
            &["target_goals", "targetGoals"],
            DEFAULT_TARGET_GOALS,
        ),
        audience_preference: AudiencePreference {
            top_locations: TopLocations {
                countries: list(
                    &scopes(top_locations, record),
                    r,
                    "audience_preference.top_locations.countries",
                    &["countries"],
                    DEFAULT_COUNTRIES,
                ),
                cities: list(
                    &scopes(top_locations, record),
                    r,
                    "audience_preference.top_locations.cities",
                    &["cities"],
                    DEFAULT_CITIES,
                ),
            },
            age_range: list(
                &scopes(audience, record),
                r,
                "audience_preference.age_range",
                &["age_range", "ageRange"],
                DEFAULT_AGE_RANGE,
            ),
            gender: list(
                &scopes(audience, record),
                r,
                "audience_preference.gender",
                &["gender"],
                DEFAULT_GENDER,
            ),
        },
        influencer_persona: text(
            record,
            r,
            "influencer_persona",
            &["influencer_persona", "influencerPersona"],
            DEFAULT_PERSONA,
        ),
        total_influencer: positive_int(
            &[record],
            r,
            "total_influencer",
            &["total_influencer", "totalInfluencer"],
            DEFAULT_TOTAL_INFLUENCER,
        ),
        niche: list(&[record], r, "niche", &["niche"], DEFAULT_NICHE),
        location_prior: list(
            &[record],
            r,
            "location_prior",
            &["location_prior", "locationPrior"],
            DEFAULT_LOCATION_PRIOR,
        ),
        esg_allignment: list(
            &[record],
            r,
            "esg_allignment",
            &["esg_allignment", "esgAllignment", "esg_alignment", "esgAlignment"],
            DEFAULT_ESG,
        ),
        budget: positive_float(record, r, "budget", &["budget"], DEFAULT_BUDGET),
        output: BriefOutput {
            content_types: list(
                &scopes(output, record),
                r,
                "output.content_types",
                &["content_types", "contentTypes"],
                DEFAULT_CONTENT_TYPES,
            ),
            deliverables: positive_int(
                &scopes(output, record),
                r,
                "output.deliverables",
                &["deliverables"],
                DEFAULT_DELIVERABLES,
            ),
        },
        risk_tolerance: risk_tolerance(record, r),
    };

    (brief, report)
}

// ---------------------------------------------------------------------------
// Field resolution helpers
// ---------------------------------------------------------------------------

/// First non-null value under any of `keys`.
fn lookup<'a>(scope: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| scope.get(*key))
        .find(|value| !value.is_null())
}

fn nested<'a>(scope: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    lookup(scope, keys).and_then(Value::as_object)
}

/// Search order for a nested field: the nested object first, then the top
/// level (flat records from older dashboard versions).
fn scopes<'a>(
    inner: Option<&'a Map<String, Value>>,
    outer: &'a Map<String, Value>,
) -> Vec<&'a Map<String, Value>> {
    inner.into_iter().chain(std::iter::once(outer)).collect()
}

fn lookup_in<'a>(scopes: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a Value> {
    scopes.iter().find_map(|scope| lookup(scope, keys))
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn text(
    record: &Map<String, Value>,
    report: &mut NormalizationReport,
    field: &'static str,
    keys: &[&str],
    default: &str,
) -> String {
    lookup(record, keys).and_then(non_empty_str).unwrap_or_else(|| {
        report.note(field);
        default.to_owned()
    })
}

fn list(
    scopes: &[&Map<String, Value>],
    report: &mut NormalizationReport,
    field: &'static str,
    keys: &[&str],
    default: &[&str],
) -> Vec<String> {
    let items: Vec<String> = match lookup_in(scopes, keys) {
        Some(Value::Array(values)) => values.iter().filter_map(non_empty_str).collect(),
        Some(scalar @ Value::String(_)) => non_empty_str(scalar).into_iter().collect(),
        _ => Vec::new(),
    };

    if items.is_empty() {
        report.note(field);
        default.iter().map(|s| (*s).to_owned()).collect()
    } else {
        items
    }
}

/// Parse a JSON number or numeric string as `f64`. `NaN` and infinities count
/// as unparsable.
fn as_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

// Range-checked before the cast.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn positive_int(
    scopes: &[&Map<String, Value>],
    report: &mut NormalizationReport,
    field: &'static str,
    keys: &[&str],
    default: u32,
) -> u32 {
    let parsed = lookup_in(scopes, keys)
        .and_then(as_number)
        .map(f64::trunc)
        .filter(|n| *n >= 1.0 && *n <= f64::from(u32::MAX));

    match parsed {
        Some(n) => n as u32,
        None => {
            report.note(field);
            default
        }
    }
}

fn positive_float(
    record: &Map<String, Value>,
    report: &mut NormalizationReport,
    field: &'static str,
    keys: &[&str],
    default: f64,
) -> f64 {
    lookup(record, keys)
        .and_then(as_number)
        .filter(|n| *n > 0.0)
        .unwrap_or_else(|| {
            report.note(field);
            default
        })
}

fn brief_id(record: &Map<String, Value>, report: &mut NormalizationReport) -> String {
    let from_record = lookup(record, &["brief_id", "briefId", "id"]).and_then(|value| match value {
        Value::Number(n) => Some(n.to_string()),
        other => non_empty_str(other),
    });

    from_record.unwrap_or_else(|| {
        report.note("brief_id");
        format!("BRIEF_{}", uuid::Uuid::new_v4().simple())
    })
}

fn risk_tolerance(record: &Map<String, Value>, report: &mut NormalizationReport) -> RiskTolerance {
    lookup(record, &["risk_tolerance", "riskTolerance"])
        .and_then(Value::as_str)
        .and_then(RiskTolerance::parse)
        .unwrap_or_else(|| {
            report.note("risk_tolerance");
            DEFAULT_RISK_TOLERANCE
        })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
