//! Best-effort extraction of display sections from model output.
//!
//! Parsing never fails. Each extractor looks for one labeled section on its
//! own and returns `None` when the label is missing or malformed; when no
//! labeled section is found at all the caller gets the raw text back.

mod insight;
mod strategy;

pub use insight::parse_insight_text;
pub use strategy::parse_strategy_text;

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParsedInsight {
    Structured(InsightSections),
    /// No labeled section was recognised; render the text as-is.
    RawText(String),
}

impl ParsedInsight {
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedInsight::Structured(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightSections {
    /// Share of relevant comments, in percent.
    pub comment_quality: Option<f64>,
    pub call_to_action: Option<CallToActionCount>,
    pub tone_of_voice: Option<ToneOfVoice>,
    /// Engagement rate, in percent.
    pub engagement_rate: Option<f64>,
    pub examples: Vec<QuotedExample>,
}

impl InsightSections {
    fn has_labeled_section(&self) -> bool {
        self.comment_quality.is_some()
            || self.call_to_action.is_some()
            || self.tone_of_voice.is_some()
            || self.engagement_rate.is_some()
    }
}

/// "X of Y captions carry a call to action."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallToActionCount {
    pub with_cta: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToneOfVoice {
    pub dominant: String,
    /// Label → occurrence count, lowercased labels. Empty when the model gave
    /// only the dominant label.
    pub distribution: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleCategory {
    Positive,
    Negative,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotedExample {
    pub category: Option<ExampleCategory>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedStrategy {
    Sections {
        /// Text before the first header, if any.
        preamble: Option<String>,
        sections: Vec<StrategySection>,
    },
    RawText { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategySection {
    pub title: String,
    pub body: String,
}
