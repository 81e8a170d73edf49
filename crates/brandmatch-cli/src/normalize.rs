use std::path::Path;

use anyhow::Context;
use brandmatch_core::{normalize_with_report, CampaignBrief, NormalizationReport};
use serde_json::Value;

/// Reads a campaign record and normalizes it into a brief.
///
/// # Errors
///
/// Fails when the file cannot be read, is not JSON, or does not hold a JSON
/// object. Malformed fields inside the object never fail.
pub(crate) fn read_brief(path: &Path) -> anyhow::Result<(CampaignBrief, NormalizationReport)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading campaign file {}", path.display()))?;
    normalize_json(&raw).with_context(|| format!("normalizing {}", path.display()))
}

pub(crate) fn normalize_json(raw: &str) -> anyhow::Result<(CampaignBrief, NormalizationReport)> {
    let value: Value = serde_json::from_str(raw).context("campaign file is not valid JSON")?;
    let Value::Object(record) = value else {
        anyhow::bail!("campaign file must contain a JSON object");
    };
    Ok(normalize_with_report(&record))
}

pub(crate) fn run_normalize(path: &Path, show_report: bool) -> anyhow::Result<()> {
    let (brief, report) = read_brief(path)?;
    println!("{}", serde_json::to_string_pretty(&brief)?);

    if show_report {
        if report.is_empty() {
            eprintln!("no fields defaulted");
        } else {
            eprintln!("defaulted fields: {}", report.defaulted.join(", "));
        }
    }
    Ok(())
}
