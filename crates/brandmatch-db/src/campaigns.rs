//! Database operations for the `campaigns` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A stored campaign: the loose record the dashboard saved, plus the last
/// recommendation response kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: String,
    pub data: Value,
    pub recommendation_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CAMPAIGN_COLUMNS: &str = "id, data, recommendation_data, created_at, updated_at";

/// Inserts a campaign. A missing `id` gets a generated UUID.
///
/// # Errors
///
/// Returns [`DbError::DuplicateCampaign`] if `id` is taken, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_campaign(
    pool: &PgPool,
    id: Option<&str>,
    data: &Value,
) -> Result<CampaignRow, DbError> {
    let id = id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "INSERT INTO campaigns (id, data) VALUES ($1, $2) RETURNING {CAMPAIGN_COLUMNS}"
    ))
    .bind(&id)
    .bind(data)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DbError::DuplicateCampaign(id.clone())
        }
        _ => DbError::Sqlx(e),
    })?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_campaign(pool: &PgPool, id: &str) -> Result<Option<CampaignRow>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Most recently created first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns(pool: &PgPool, limit: i64) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC, id LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replaces the stored recommendation response for a campaign.
///
/// # Errors
///
/// Returns [`DbError::UnknownCampaign`] if no campaign has `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn save_recommendation_data(
    pool: &PgPool,
    id: &str,
    recommendation_data: &Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns \
         SET recommendation_data = $2, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(recommendation_data)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::UnknownCampaign(id.to_string()));
    }
    Ok(())
}

/// Deletes a campaign and, through the foreign key, its generated content.
/// Returns whether a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_campaign(pool: &PgPool, id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
