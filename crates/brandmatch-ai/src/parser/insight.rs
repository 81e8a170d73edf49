use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{
    CallToActionCount, ExampleCategory, InsightSections, ParsedInsight, QuotedExample,
    ToneOfVoice,
};

static COMMENT_QUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:comment\s+quality|kualitas\s+komentar)[^\d\n]{0,80}?(\d{1,3}(?:[.,]\d+)?)\s*%",
    )
    .expect("valid regex")
});

static CALL_TO_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:call[\s-]*to[\s-]*action|\bcta\b)[^\d\n]{0,80}?(\d+)\s*(?:dari|of|/)\s*(\d+)",
    )
    .expect("valid regex")
});

static TONE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:tone\s+of\s+voice|nada\s+(?:bicara|komunikasi))\**\s*[:\-]\s*(.+)$")
        .expect("valid regex")
});

static TONE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\p{L}[\p{L} \-]*?)\s*[:=]\s*(\d+)").expect("valid regex")
});

static ENGAGEMENT_RATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)engagement\s+rate[^\d\n]{0,40}?(\d{1,3}(?:[.,]\d+)?)\s*%")
        .expect("valid regex")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\n]+)"|“([^”\n]+)”"#).expect("valid regex")
});

const POSITIVE_MARKERS: &[&str] = &["positif", "positive", "pujian", "praise"];
const NEGATIVE_MARKERS: &[&str] = &["negatif", "negative", "kritik", "keluhan", "complaint"];
const QUESTION_MARKERS: &[&str] = &["pertanyaan", "question", "bertanya"];

const UNCATEGORISED_EXAMPLE_LIMIT: usize = 3;
const MIN_UNCATEGORISED_CHARS: usize = 10;

/// Parses insight text into labeled sections, or returns
/// [`ParsedInsight::RawText`] when none of the labels are present.
///
/// Quoted examples are collected too, but they alone do not make the text
/// structured.
#[must_use]
pub fn parse_insight_text(raw: &str) -> ParsedInsight {
    let sections = InsightSections {
        comment_quality: extract_comment_quality(raw),
        call_to_action: extract_call_to_action(raw),
        tone_of_voice: extract_tone_of_voice(raw),
        engagement_rate: extract_engagement_rate(raw),
        examples: extract_examples(raw),
    };

    if sections.has_labeled_section() {
        ParsedInsight::Structured(sections)
    } else {
        ParsedInsight::RawText(raw.to_string())
    }
}

pub(super) fn extract_comment_quality(text: &str) -> Option<f64> {
    COMMENT_QUALITY
        .captures(text)
        .and_then(|cap| parse_percentage(&cap[1]))
}

pub(super) fn extract_engagement_rate(text: &str) -> Option<f64> {
    ENGAGEMENT_RATE
        .captures(text)
        .and_then(|cap| parse_percentage(&cap[1]))
}

pub(super) fn extract_call_to_action(text: &str) -> Option<CallToActionCount> {
    let cap = CALL_TO_ACTION.captures(text)?;
    let with_cta: u32 = cap[1].parse().ok()?;
    let total: u32 = cap[2].parse().ok()?;
    (total > 0 && with_cta <= total).then_some(CallToActionCount { with_cta, total })
}

pub(super) fn extract_tone_of_voice(text: &str) -> Option<ToneOfVoice> {
    let rest = TONE_LINE.captures(text)?.get(1)?.as_str();

    let distribution: BTreeMap<String, u32> = TONE_COUNT
        .captures_iter(rest)
        .filter_map(|cap| {
            let label = clean_label(&cap[1]).to_lowercase();
            let count = cap[2].parse().ok()?;
            (!label.is_empty()).then_some((label, count))
        })
        .collect();

    let head = rest
        .split(['(', ',', ';'])
        .next()
        .unwrap_or_default();
    let named = (!head.contains([':', '='])).then(|| clean_label(head));

    let dominant = match named {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(label, _)| label.clone())?,
    };

    Some(ToneOfVoice {
        dominant,
        distribution,
    })
}

pub(super) fn extract_examples(text: &str) -> Vec<QuotedExample> {
    let spans = quoted_spans(text);
    let has_markers = [POSITIVE_MARKERS, NEGATIVE_MARKERS, QUESTION_MARKERS]
        .iter()
        .any(|markers| contains_marker(text, markers));

    if has_markers {
        let mut examples = Vec::new();
        for category in [
            ExampleCategory::Positive,
            ExampleCategory::Negative,
            ExampleCategory::Question,
        ] {
            if let Some((_, quote)) = spans
                .iter()
                .find(|(prefix, _)| category_of(prefix) == Some(category))
            {
                examples.push(QuotedExample {
                    category: Some(category),
                    text: quote.clone(),
                });
            }
        }
        if !examples.is_empty() {
            return examples;
        }
    }

    spans
        .into_iter()
        .filter(|(_, quote)| quote.chars().count() > MIN_UNCATEGORISED_CHARS)
        .take(UNCATEGORISED_EXAMPLE_LIMIT)
        .map(|(_, quote)| QuotedExample {
            category: None,
            text: quote,
        })
        .collect()
}

/// Every quoted span paired with the text that precedes it on its line.
fn quoted_spans(text: &str) -> Vec<(String, String)> {
    QUOTED
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let quote = cap.get(1).or_else(|| cap.get(2))?.as_str().trim();
            if quote.is_empty() {
                return None;
            }
            let line_start = text[..whole.start()].rfind('\n').map_or(0, |i| i + 1);
            Some((
                text[line_start..whole.start()].to_lowercase(),
                quote.to_string(),
            ))
        })
        .collect()
}

/// Category for a quote whose line starts with `prefix`. When several
/// markers appear the last one before the quote wins.
fn category_of(prefix: &str) -> Option<ExampleCategory> {
    [
        (ExampleCategory::Positive, POSITIVE_MARKERS),
        (ExampleCategory::Negative, NEGATIVE_MARKERS),
        (ExampleCategory::Question, QUESTION_MARKERS),
    ]
    .into_iter()
    .filter_map(|(category, markers)| {
        markers
            .iter()
            .filter_map(|m| prefix.rfind(m))
            .max()
            .map(|pos| (pos, category))
    })
    .max_by_key(|(pos, _)| *pos)
    .map(|(_, category)| category)
}

fn contains_marker(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

fn parse_percentage(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', ".").parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value)
}

fn clean_label(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '"' | '.' | '-'))
}

#[cfg(test)]
#[path = "insight_test.rs"]
mod tests;
