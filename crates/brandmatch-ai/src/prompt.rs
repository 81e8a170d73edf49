//! Prompt templates for strategy and insight generation.
//!
//! Rendering is pure: the same influencer and campaign always produce the
//! same prompt. Absent values are written as explicit placeholders so the
//! model never sees an empty slot.

use brandmatch_core::{
    CampaignContext, ContentMix, InfluencerRecommendation, InsightType, PerformanceMetrics,
    Scores, TaskType,
};

const NOT_AVAILABLE: &str = "N/A";
const NOT_SPECIFIED: &str = "Not specified";

/// Section headers every strategy answer must use, in order. The strategy
/// parser splits on these.
pub const STRATEGY_SECTIONS: [&str; 4] = [
    "Analisis Kecocokan",
    "Strategi Konten",
    "Rencana Eksekusi",
    "Risiko dan Mitigasi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind<'a> {
    /// Caller-supplied prompt, sent as-is.
    General(&'a str),
    Strategy,
    Insight(InsightType),
}

impl From<TaskType> for PromptKind<'static> {
    fn from(task: TaskType) -> Self {
        task.insight()
            .map_or(PromptKind::Strategy, PromptKind::Insight)
    }
}

/// Renders the prompt for `kind` about `subject`, optionally in the context
/// of a campaign.
#[must_use]
pub fn build_prompt(
    kind: PromptKind<'_>,
    subject: &InfluencerRecommendation,
    campaign: Option<&CampaignContext>,
) -> String {
    let empty = CampaignContext::default();
    let campaign = campaign.unwrap_or(&empty);

    match kind {
        PromptKind::General(prompt) => prompt.to_string(),
        PromptKind::Strategy => strategy_prompt(subject, campaign),
        PromptKind::Insight(InsightType::Comment) => comment_prompt(subject, campaign),
        PromptKind::Insight(InsightType::Caption) => caption_prompt(subject, campaign),
        PromptKind::Insight(InsightType::Score) => score_prompt(subject, campaign),
        PromptKind::Insight(InsightType::Performance) => performance_prompt(subject, campaign),
    }
}

fn strategy_prompt(subject: &InfluencerRecommendation, campaign: &CampaignContext) -> String {
    let mut lines = vec![
        "Kamu adalah ahli strategi influencer marketing untuk pasar Indonesia.".to_string(),
        "Susun strategi kolaborasi antara brand dan influencer berikut.".to_string(),
        String::new(),
    ];
    lines.extend(campaign_block(campaign));
    lines.push(String::new());
    lines.extend(influencer_block(subject));
    lines.push(format!(
        "- Skor: {}",
        scores_line(subject.scores.as_ref())
    ));
    lines.push(format!(
        "- Performa: {}",
        metrics_line(subject.performance_metrics.as_ref())
    ));
    lines.push(format!(
        "- Content mix optimal: {}",
        content_mix_line(subject.optimal_content_mix.as_ref())
    ));
    lines.push(format!(
        "- Insight: {}",
        text_or(subject.insights.as_deref(), NOT_AVAILABLE)
    ));
    lines.push(String::new());

    let headers = STRATEGY_SECTIONS
        .iter()
        .map(|h| format!("## {h}"))
        .collect::<Vec<_>>()
        .join("\n");
    lines.push(format!(
        "Jawab dalam Bahasa Indonesia, maksimal 3 kalimat per bagian. \
         Gunakan tepat empat bagian berikut dengan judul persis seperti ini:\n{headers}"
    ));
    lines.join("\n")
}

fn comment_prompt(subject: &InfluencerRecommendation, campaign: &CampaignContext) -> String {
    let mut lines = insight_header("komentar audiens", subject, campaign);
    lines.push(format!(
        "Ringkasan perilaku komentar: {}",
        subject.comment_source().unwrap_or(NOT_AVAILABLE)
    ));
    lines.push(String::new());
    lines.push(
        "Jawab dalam Bahasa Indonesia, maksimal 5 kalimat, dengan format:\n\
         Comment quality: <persentase komentar relevan>%\n\
         Tone of voice: <label dominan> (<label>: <jumlah>, ...)\n\
         Contoh komentar positif: \"<kutipan>\"\n\
         Contoh komentar negatif: \"<kutipan>\"\n\
         Contoh pertanyaan: \"<kutipan>\""
            .to_string(),
    );
    lines.join("\n")
}

fn caption_prompt(subject: &InfluencerRecommendation, campaign: &CampaignContext) -> String {
    let mut lines = insight_header("caption", subject, campaign);
    lines.push(format!(
        "Ringkasan perilaku caption: {}",
        subject.caption_source().unwrap_or(NOT_AVAILABLE)
    ));
    lines.push(String::new());
    lines.push(
        "Jawab dalam Bahasa Indonesia, maksimal 5 kalimat, dengan format:\n\
         Call to action: <jumlah caption dengan CTA> dari <total caption>\n\
         Tone of voice: <label dominan> (<label>: <jumlah>, ...)\n\
         Tutup dengan satu saran perbaikan caption untuk kampanye ini."
            .to_string(),
    );
    lines.join("\n")
}

fn score_prompt(subject: &InfluencerRecommendation, campaign: &CampaignContext) -> String {
    let mut lines = insight_header("skor rekomendasi", subject, campaign);
    lines.push(format!("Skor: {}", scores_line(subject.scores.as_ref())));
    lines.push(String::new());
    lines.push(
        "Jelaskan dalam Bahasa Indonesia, maksimal 4 kalimat, mengapa influencer ini \
         mendapat skor tersebut dan komponen mana yang paling menentukan."
            .to_string(),
    );
    lines.join("\n")
}

fn performance_prompt(subject: &InfluencerRecommendation, campaign: &CampaignContext) -> String {
    let mut lines = insight_header("performa", subject, campaign);
    lines.push(format!(
        "Performa: {}",
        metrics_line(subject.performance_metrics.as_ref())
    ));
    lines.push(String::new());
    lines.push(
        "Jawab dalam Bahasa Indonesia, maksimal 4 kalimat, diawali baris:\n\
         Engagement rate: <persentase>%\n\
         lalu nilai apakah performa ini mendukung tujuan kampanye."
            .to_string(),
    );
    lines.join("\n")
}

fn insight_header(
    topic: &str,
    subject: &InfluencerRecommendation,
    campaign: &CampaignContext,
) -> Vec<String> {
    vec![
        format!(
            "Analisis {topic} influencer @{} untuk kampanye {} ({}).",
            subject.username.trim_start_matches('@'),
            text_or(campaign.brand_name.as_deref(), NOT_AVAILABLE),
            text_or(campaign.product_name.as_deref(), NOT_AVAILABLE),
        ),
        format!(
            "Tujuan kampanye: {}",
            list_or(&campaign.marketing_objective)
        ),
        format!(
            "Tier: {} | Keahlian: {}",
            subject
                .tier
                .map_or_else(|| NOT_AVAILABLE.to_string(), |t| t.to_string()),
            text_or(subject.expertise.as_deref(), NOT_SPECIFIED),
        ),
    ]
}

fn campaign_block(campaign: &CampaignContext) -> Vec<String> {
    vec![
        "KAMPANYE".to_string(),
        format!("- Brand: {}", text_or(campaign.brand_name.as_deref(), NOT_AVAILABLE)),
        format!("- Produk: {}", text_or(campaign.product_name.as_deref(), NOT_AVAILABLE)),
        format!("- Industri: {}", text_or(campaign.industry.as_deref(), NOT_AVAILABLE)),
        format!("- Tujuan pemasaran: {}", list_or(&campaign.marketing_objective)),
        format!("- Target: {}", list_or(&campaign.target_goals)),
        format!("- Ringkasan: {}", text_or(campaign.overview.as_deref(), NOT_SPECIFIED)),
        format!("- USP: {}", text_or(campaign.usp.as_deref(), NOT_SPECIFIED)),
        format!(
            "- Persona influencer: {}",
            text_or(campaign.influencer_persona.as_deref(), NOT_SPECIFIED)
        ),
        format!(
            "- Budget: {}",
            campaign.budget.map_or_else(|| NOT_AVAILABLE.to_string(), rupiah)
        ),
    ]
}

fn influencer_block(subject: &InfluencerRecommendation) -> Vec<String> {
    vec![
        "INFLUENCER".to_string(),
        format!("- Username: @{}", subject.username.trim_start_matches('@')),
        format!("- Peringkat: {}", subject.rank),
        format!(
            "- Tier: {}",
            subject
                .tier
                .map_or_else(|| NOT_AVAILABLE.to_string(), |t| t.to_string())
        ),
        format!(
            "- Keahlian: {}",
            text_or(subject.expertise.as_deref(), NOT_SPECIFIED)
        ),
    ]
}

fn scores_line(scores: Option<&Scores>) -> String {
    let Some(s) = scores else {
        return NOT_AVAILABLE.to_string();
    };
    format!(
        "final score {}, audience fit {}, persona fit {}, performance prediction {}, budget efficiency {}",
        percent(s.final_score),
        percent(s.audience_fit),
        percent(s.persona_fit),
        percent(s.performance_pred),
        percent(s.budget_efficiency),
    )
}

fn metrics_line(metrics: Option<&PerformanceMetrics>) -> String {
    let Some(m) = metrics else {
        return NOT_AVAILABLE.to_string();
    };
    format!(
        "engagement rate {}, authenticity {}, reach potential {}, brand fit {}",
        engagement(m.engagement_rate),
        percent(m.authenticity_score),
        percent(m.reach_potential),
        percent(m.brand_fit),
    )
}

fn content_mix_line(mix: Option<&ContentMix>) -> String {
    let Some(mix) = mix else {
        return NOT_AVAILABLE.to_string();
    };
    format!(
        "{} feeds, {} reels, {} stories (biaya {}, sisa budget {})",
        mix.feeds,
        mix.reels,
        mix.stories,
        rupiah(mix.total_cost),
        rupiah(mix.remaining_budget),
    )
}

/// Fraction in `[0, 1]` as a one-decimal percentage: `0.873` → `87.3%`.
fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}%", v * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn engagement(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Whole rupiah with dot thousands separators: `Rp 12.500.000`.
fn rupiah(amount: f64) -> String {
    if !amount.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let digits = format!("{:.0}", amount.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}Rp {grouped}")
}

fn text_or<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(placeholder)
}

fn list_or(values: &[String]) -> String {
    let items: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    if items.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
