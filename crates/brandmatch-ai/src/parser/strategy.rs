use crate::prompt::STRATEGY_SECTIONS;

use super::{ParsedStrategy, StrategySection};

/// Splits strategy text on its section headers.
///
/// A header is a line naming one of the strategy sections, optionally
/// decorated with markdown `#`, bold markers, numbering or a trailing colon.
/// Any other markdown `#` heading also starts a section. Without a single
/// header the whole text comes back as [`ParsedStrategy::RawText`].
#[must_use]
pub fn parse_strategy_text(raw: &str) -> ParsedStrategy {
    let mut preamble = Vec::new();
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();

    for line in raw.lines() {
        if let Some(title) = header_title(line) {
            sections.push((title, Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        } else {
            preamble.push(line);
        }
    }

    if sections.is_empty() {
        return ParsedStrategy::RawText {
            text: raw.to_string(),
        };
    }

    let preamble = preamble.join("\n").trim().to_string();
    ParsedStrategy::Sections {
        preamble: (!preamble.is_empty()).then_some(preamble),
        sections: sections
            .into_iter()
            .map(|(title, body)| StrategySection {
                title,
                body: body.join("\n").trim().to_string(),
            })
            .collect(),
    }
}

fn header_title(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let is_markdown_heading = trimmed.starts_with('#');

    let stripped = trimmed
        .trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace())
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim_matches(|c: char| c.is_whitespace() || c == '*')
        .trim_end_matches(':')
        .trim_end_matches(|c: char| c.is_whitespace() || c == '*');

    if stripped.is_empty() {
        return None;
    }

    if let Some(known) = STRATEGY_SECTIONS
        .iter()
        .find(|s| s.eq_ignore_ascii_case(stripped))
    {
        return Some((*known).to_string());
    }

    is_markdown_heading.then(|| stripped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(parsed: &ParsedStrategy) -> &[StrategySection] {
        match parsed {
            ParsedStrategy::Sections { sections, .. } => sections,
            ParsedStrategy::RawText { .. } => panic!("expected sections, got {parsed:?}"),
        }
    }

    #[test]
    fn splits_markdown_headers() {
        let raw = "## Analisis Kecocokan\nAudiens cocok.\n\n## Strategi Konten\nFokus reels.\nTambah stories.\n## Rencana Eksekusi\nMinggu 1 teaser.\n## Risiko dan Mitigasi\nPantau komentar.";
        let parsed = parse_strategy_text(raw);
        let sections = sections(&parsed);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].title, "Analisis Kecocokan");
        assert_eq!(sections[0].body, "Audiens cocok.");
        assert_eq!(sections[1].body, "Fokus reels.\nTambah stories.");
        assert_eq!(sections[3].title, "Risiko dan Mitigasi");
    }

    #[test]
    fn accepts_bold_numbered_headers_and_keeps_preamble() {
        let raw = "Berikut strateginya.\n**1. analisis kecocokan:**\nCocok.\n2) Strategi Konten\nReels.";
        let parsed = parse_strategy_text(raw);
        match &parsed {
            ParsedStrategy::Sections { preamble, sections } => {
                assert_eq!(preamble.as_deref(), Some("Berikut strateginya."));
                assert_eq!(sections.len(), 2);
                assert_eq!(sections[0].title, "Analisis Kecocokan");
                assert_eq!(sections[1].title, "Strategi Konten");
                assert_eq!(sections[1].body, "Reels.");
            }
            ParsedStrategy::RawText { .. } => panic!("expected sections"),
        }
    }

    #[test]
    fn unknown_markdown_heading_starts_a_section() {
        let parsed = parse_strategy_text("# Catatan Tambahan\nHindari klaim medis.");
        assert_eq!(sections(&parsed)[0].title, "Catatan Tambahan");
    }

    #[test]
    fn text_without_headers_is_raw() {
        let raw = "Influencer ini cocok untuk kampanye awareness.\nGunakan reels.";
        assert_eq!(
            parse_strategy_text(raw),
            ParsedStrategy::RawText {
                text: raw.to_string()
            }
        );
    }

    #[test]
    fn lone_hashes_are_not_headers() {
        let raw = "###\nteks biasa";
        assert!(matches!(parse_strategy_text(raw), ParsedStrategy::RawText { .. }));
    }
}
