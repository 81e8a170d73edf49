//! Generation task vocabulary shared by the orchestrator and the store.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The four insight facets an influencer can be analysed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Comment,
    Caption,
    Score,
    Performance,
}

impl InsightType {
    pub const ALL: [InsightType; 4] = [
        InsightType::Comment,
        InsightType::Caption,
        InsightType::Score,
        InsightType::Performance,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InsightType::Comment => "comment",
            InsightType::Caption => "caption",
            InsightType::Score => "score",
            InsightType::Performance => "performance",
        }
    }
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comment" | "comment_insights" => Ok(InsightType::Comment),
            "caption" | "caption_insights" => Ok(InsightType::Caption),
            "score" | "score_insights" => Ok(InsightType::Score),
            "performance" | "performance_insights" => Ok(InsightType::Performance),
            other => Err(CoreError::UnknownInsightType(other.to_string())),
        }
    }
}

/// One unit of per-influencer generation work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Strategy,
    CommentInsights,
    CaptionInsights,
    ScoreInsights,
    PerformanceInsights,
}

impl TaskType {
    /// Every task the bulk path launches per influencer, strategy first.
    pub const ALL: [TaskType; 5] = [
        TaskType::Strategy,
        TaskType::CommentInsights,
        TaskType::CaptionInsights,
        TaskType::ScoreInsights,
        TaskType::PerformanceInsights,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Strategy => "strategy",
            TaskType::CommentInsights => "comment_insights",
            TaskType::CaptionInsights => "caption_insights",
            TaskType::ScoreInsights => "score_insights",
            TaskType::PerformanceInsights => "performance_insights",
        }
    }

    #[must_use]
    pub fn insight(self) -> Option<InsightType> {
        match self {
            TaskType::Strategy => None,
            TaskType::CommentInsights => Some(InsightType::Comment),
            TaskType::CaptionInsights => Some(InsightType::Caption),
            TaskType::ScoreInsights => Some(InsightType::Score),
            TaskType::PerformanceInsights => Some(InsightType::Performance),
        }
    }

    #[must_use]
    pub fn content_kind(self) -> ContentKind {
        self.insight()
            .map_or(ContentKind::Strategy, ContentKind::Insight)
    }
}

impl From<InsightType> for TaskType {
    fn from(insight: InsightType) -> Self {
        match insight {
            InsightType::Comment => TaskType::CommentInsights,
            InsightType::Caption => TaskType::CaptionInsights,
            InsightType::Score => TaskType::ScoreInsights,
            InsightType::Performance => TaskType::PerformanceInsights,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "strategy" {
            return Ok(TaskType::Strategy);
        }
        normalized
            .parse::<InsightType>()
            .map(TaskType::from)
            .map_err(|_| CoreError::UnknownTaskType(s.to_string()))
    }
}

/// Composite identifier of a generation task: `{username}_{task}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey {
    pub username: String,
    pub task: TaskType,
}

impl TaskKey {
    #[must_use]
    pub fn new(username: impl Into<String>, task: TaskType) -> Self {
        Self {
            username: username.into(),
            task,
        }
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.username, self.task)
    }
}

/// What a persisted content record holds; the `content_type` column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentKind {
    Strategy,
    Insight(InsightType),
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Strategy => "strategy",
            ContentKind::Insight(insight) => insight.as_str(),
        }
    }

    #[must_use]
    pub fn task(self) -> TaskType {
        match self {
            ContentKind::Strategy => TaskType::Strategy,
            ContentKind::Insight(insight) => TaskType::from(insight),
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("strategy") {
            return Ok(ContentKind::Strategy);
        }
        s.parse::<InsightType>().map(ContentKind::Insight)
    }
}
