//! Database operations for the `generated_content` table.

use brandmatch_core::ContentKind;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GeneratedContentRow {
    pub campaign_id: String,
    pub influencer_username: String,
    pub content_type: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

/// Inserts or replaces the content for `(campaign_id, username, kind)` and
/// returns the stored `generated_at`.
///
/// # Errors
///
/// Returns [`DbError::UnknownCampaign`] if the campaign does not exist, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_content(
    pool: &PgPool,
    campaign_id: &str,
    username: &str,
    kind: ContentKind,
    content: &str,
) -> Result<DateTime<Utc>, DbError> {
    let generated_at = sqlx::query_scalar::<_, DateTime<Utc>>(
        "INSERT INTO generated_content \
             (campaign_id, influencer_username, content_type, content, generated_at) \
         VALUES ($1, $2, $3, $4, NOW()) \
         ON CONFLICT (campaign_id, influencer_username, content_type) DO UPDATE SET \
             content = EXCLUDED.content, \
             generated_at = EXCLUDED.generated_at \
         RETURNING generated_at",
    )
    .bind(campaign_id)
    .bind(username)
    .bind(kind.as_str())
    .bind(content)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            DbError::UnknownCampaign(campaign_id.to_string())
        }
        _ => DbError::Sqlx(e),
    })?;

    Ok(generated_at)
}

/// All content rows for a campaign, optionally restricted to strategies
/// (`Some(true)`) or insights (`Some(false)`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content(
    pool: &PgPool,
    campaign_id: &str,
    strategies: Option<bool>,
) -> Result<Vec<GeneratedContentRow>, DbError> {
    let filter = match strategies {
        Some(true) => " AND content_type = 'strategy'",
        Some(false) => " AND content_type <> 'strategy'",
        None => "",
    };
    let rows = sqlx::query_as::<_, GeneratedContentRow>(&format!(
        "SELECT campaign_id, influencer_username, content_type, content, generated_at \
         FROM generated_content \
         WHERE campaign_id = $1{filter} \
         ORDER BY influencer_username, content_type"
    ))
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
