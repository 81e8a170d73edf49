//! In-process [`ContentStore`] for tests and database-less dry runs.
//!
//! Mirrors the Postgres schema rules: content needs an existing campaign,
//! and deleting a campaign removes its content.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use brandmatch_core::{ContentKind, InsightType, TaskKey};
use chrono::Utc;
use serde_json::Value;

use crate::store::{ContentMap, ContentStore, StoredContent};
use crate::{CampaignRow, DbError};

#[derive(Debug, Default)]
struct Tables {
    campaigns: HashMap<String, CampaignRow>,
    content: HashMap<(String, String, ContentKind), StoredContent>,
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    tables: Mutex<Tables>,
}

impl MemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored content records across all campaigns.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.lock().content.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn upsert(
        &self,
        campaign_id: &str,
        username: &str,
        kind: ContentKind,
        content: &str,
    ) -> Result<(), DbError> {
        let mut tables = self.lock();
        if !tables.campaigns.contains_key(campaign_id) {
            return Err(DbError::UnknownCampaign(campaign_id.to_string()));
        }
        tables.content.insert(
            (campaign_id.to_string(), username.to_string(), kind),
            StoredContent {
                content: content.to_string(),
                generated_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn load(&self, campaign_id: &str, strategies: bool) -> ContentMap {
        self.lock()
            .content
            .iter()
            .filter(|((campaign, _, kind), _)| {
                campaign == campaign_id && (*kind == ContentKind::Strategy) == strategies
            })
            .map(|((_, username, kind), stored)| {
                (TaskKey::new(username.clone(), kind.task()), stored.clone())
            })
            .collect()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn save_insight(
        &self,
        campaign_id: &str,
        username: &str,
        insight: InsightType,
        content: &str,
    ) -> Result<(), DbError> {
        self.upsert(campaign_id, username, ContentKind::Insight(insight), content)
    }

    async fn save_strategy(
        &self,
        campaign_id: &str,
        username: &str,
        content: &str,
    ) -> Result<(), DbError> {
        self.upsert(campaign_id, username, ContentKind::Strategy, content)
    }

    async fn load_all_insights(&self, campaign_id: &str) -> Result<ContentMap, DbError> {
        Ok(self.load(campaign_id, false))
    }

    async fn load_all_strategies(&self, campaign_id: &str) -> Result<ContentMap, DbError> {
        Ok(self.load(campaign_id, true))
    }

    async fn create_campaign(
        &self,
        id: Option<&str>,
        data: &Value,
    ) -> Result<CampaignRow, DbError> {
        let id = id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
        let mut tables = self.lock();
        if tables.campaigns.contains_key(&id) {
            return Err(DbError::DuplicateCampaign(id));
        }
        let now = Utc::now();
        let row = CampaignRow {
            id: id.clone(),
            data: data.clone(),
            recommendation_data: None,
            created_at: now,
            updated_at: now,
        };
        tables.campaigns.insert(id, row.clone());
        Ok(row)
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<CampaignRow>, DbError> {
        Ok(self.lock().campaigns.get(id).cloned())
    }

    async fn list_campaigns(&self, limit: i64) -> Result<Vec<CampaignRow>, DbError> {
        let mut rows: Vec<CampaignRow> = self.lock().campaigns.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn save_recommendation_data(&self, id: &str, data: &Value) -> Result<(), DbError> {
        let mut tables = self.lock();
        let row = tables
            .campaigns
            .get_mut(id)
            .ok_or_else(|| DbError::UnknownCampaign(id.to_string()))?;
        row.recommendation_data = Some(data.clone());
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_campaign(&self, id: &str) -> Result<bool, DbError> {
        let mut tables = self.lock();
        let existed = tables.campaigns.remove(id).is_some();
        tables.content.retain(|(campaign, _, _), _| campaign != id);
        Ok(existed)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
