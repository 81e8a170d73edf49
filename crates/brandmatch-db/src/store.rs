//! The storage seam used by the orchestrator and the HTTP server.

use std::collections::HashMap;

use async_trait::async_trait;
use brandmatch_core::{ContentKind, InsightType, TaskKey};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::{campaigns, content, CampaignRow, DbError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredContent {
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

/// Generated content of one campaign, keyed by influencer and task.
pub type ContentMap = HashMap<TaskKey, StoredContent>;

/// Campaign records and the content generated for them.
///
/// Content writes are upserts keyed by `(campaign_id, username, kind)`; a
/// later write replaces the earlier one. Loads return everything for one
/// campaign in a single call.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_insight(
        &self,
        campaign_id: &str,
        username: &str,
        insight: InsightType,
        content: &str,
    ) -> Result<(), DbError>;

    async fn save_strategy(
        &self,
        campaign_id: &str,
        username: &str,
        content: &str,
    ) -> Result<(), DbError>;

    async fn load_all_insights(&self, campaign_id: &str) -> Result<ContentMap, DbError>;

    async fn load_all_strategies(&self, campaign_id: &str) -> Result<ContentMap, DbError>;

    async fn create_campaign(&self, id: Option<&str>, data: &Value)
        -> Result<CampaignRow, DbError>;

    async fn get_campaign(&self, id: &str) -> Result<Option<CampaignRow>, DbError>;

    async fn list_campaigns(&self, limit: i64) -> Result<Vec<CampaignRow>, DbError>;

    async fn save_recommendation_data(&self, id: &str, data: &Value) -> Result<(), DbError>;

    /// Returns whether the campaign existed.
    async fn delete_campaign(&self, id: &str) -> Result<bool, DbError>;

    /// Liveness probe for the backing storage.
    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    /// Writes `content` under the slot matching `kind`.
    async fn save_content(
        &self,
        campaign_id: &str,
        username: &str,
        kind: ContentKind,
        content: &str,
    ) -> Result<(), DbError> {
        match kind {
            ContentKind::Strategy => self.save_strategy(campaign_id, username, content).await,
            ContentKind::Insight(insight) => {
                self.save_insight(campaign_id, username, insight, content)
                    .await
            }
        }
    }
}

/// [`ContentStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load(&self, campaign_id: &str, strategies: bool) -> Result<ContentMap, DbError> {
        let rows = content::list_content(&self.pool, campaign_id, Some(strategies)).await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let Ok(kind) = row.content_type.parse::<ContentKind>() else {
                tracing::warn!(
                    campaign_id,
                    content_type = %row.content_type,
                    "skipping generated content with unknown type"
                );
                continue;
            };
            map.insert(
                TaskKey::new(row.influencer_username, kind.task()),
                StoredContent {
                    content: row.content,
                    generated_at: row.generated_at,
                },
            );
        }
        Ok(map)
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn save_insight(
        &self,
        campaign_id: &str,
        username: &str,
        insight: InsightType,
        content: &str,
    ) -> Result<(), DbError> {
        content::upsert_content(
            &self.pool,
            campaign_id,
            username,
            ContentKind::Insight(insight),
            content,
        )
        .await?;
        Ok(())
    }

    async fn save_strategy(
        &self,
        campaign_id: &str,
        username: &str,
        content: &str,
    ) -> Result<(), DbError> {
        content::upsert_content(
            &self.pool,
            campaign_id,
            username,
            ContentKind::Strategy,
            content,
        )
        .await?;
        Ok(())
    }

    async fn load_all_insights(&self, campaign_id: &str) -> Result<ContentMap, DbError> {
        self.load(campaign_id, false).await
    }

    async fn load_all_strategies(&self, campaign_id: &str) -> Result<ContentMap, DbError> {
        self.load(campaign_id, true).await
    }

    async fn create_campaign(
        &self,
        id: Option<&str>,
        data: &Value,
    ) -> Result<CampaignRow, DbError> {
        campaigns::create_campaign(&self.pool, id, data).await
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<CampaignRow>, DbError> {
        campaigns::get_campaign(&self.pool, id).await
    }

    async fn list_campaigns(&self, limit: i64) -> Result<Vec<CampaignRow>, DbError> {
        campaigns::list_campaigns(&self.pool, limit).await
    }

    async fn save_recommendation_data(&self, id: &str, data: &Value) -> Result<(), DbError> {
        campaigns::save_recommendation_data(&self.pool, id, data).await
    }

    async fn delete_campaign(&self, id: &str) -> Result<bool, DbError> {
        campaigns::delete_campaign(&self.pool, id).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }
}
