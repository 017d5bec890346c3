use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AssetMetadata, NewVideo, ProcessingStatus, VideoRecord, VideoStatus};
use crate::services::lifecycle::StateChange;

/// Durable video record store. The lifecycle service owns status
/// columns, the engagement aggregator owns the counters.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn insert(&self, new_video: NewVideo) -> Result<VideoRecord>;

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>>;

    async fn get_by_public_id(&self, public_id: &str) -> Result<Option<VideoRecord>>;

    /// Compare-and-set state update. Applies `change` only while the
    /// record still holds `expected`; returns None when a concurrent
    /// writer got there first.
    async fn apply_state(
        &self,
        id: Uuid,
        expected: (VideoStatus, ProcessingStatus),
        change: &StateChange,
    ) -> Result<Option<VideoRecord>>;

    /// Merges provider asset metadata without touching status columns
    /// or the status-change timestamp.
    async fn merge_asset_metadata(&self, id: Uuid, metadata: &AssetMetadata) -> Result<()>;

    async fn set_view_counters(
        &self,
        id: Uuid,
        view_count: i64,
        unique_view_count: i64,
    ) -> Result<()>;

    async fn set_average_watch_time(&self, id: Uuid, average_seconds: f64) -> Result<()>;

    async fn set_engagement_rate(&self, id: Uuid, rate: f64) -> Result<()>;
}

#[derive(Clone)]
pub struct PgVideoStore {
    pool: PgPool,
}

impl PgVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn insert(&self, new_video: NewVideo) -> Result<VideoRecord> {
        let video = sqlx::query_as::<_, VideoRecord>(
            r#"
            INSERT INTO videos (id, creator_id, title, description, provider_public_id, tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, creator_id, title, description, provider_public_id,
                      asset_url, thumbnail_url, status, processing_status,
                      duration_seconds, file_size_bytes, tags, trading_symbols,
                      view_count, unique_view_count, average_watch_time_seconds,
                      engagement_rate, processing_error, unpublish_reason,
                      published_at, last_status_change, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_video.creator_id)
        .bind(&new_video.title)
        .bind(&new_video.description)
        .bind(&new_video.provider_public_id)
        .bind(serde_json::json!(new_video.tags))
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert video")?;

        Ok(video)
    }

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>> {
        let video = sqlx::query_as::<_, VideoRecord>(
            r#"
            SELECT id, creator_id, title, description, provider_public_id,
                   asset_url, thumbnail_url, status, processing_status,
                   duration_seconds, file_size_bytes, tags, trading_symbols,
                   view_count, unique_view_count, average_watch_time_seconds,
                   engagement_rate, processing_error, unpublish_reason,
                   published_at, last_status_change, created_at, updated_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch video")?;

        Ok(video)
    }

    async fn get_by_public_id(&self, public_id: &str) -> Result<Option<VideoRecord>> {
        let video = sqlx::query_as::<_, VideoRecord>(
            r#"
            SELECT id, creator_id, title, description, provider_public_id,
                   asset_url, thumbnail_url, status, processing_status,
                   duration_seconds, file_size_bytes, tags, trading_symbols,
                   view_count, unique_view_count, average_watch_time_seconds,
                   engagement_rate, processing_error, unpublish_reason,
                   published_at, last_status_change, created_at, updated_at
            FROM videos
            WHERE provider_public_id = $1
            "#,
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch video by provider public id")?;

        Ok(video)
    }

    async fn apply_state(
        &self,
        id: Uuid,
        expected: (VideoStatus, ProcessingStatus),
        change: &StateChange,
    ) -> Result<Option<VideoRecord>> {
        let video = sqlx::query_as::<_, VideoRecord>(
            r#"
            UPDATE videos
            SET status = COALESCE($4, status),
                processing_status = COALESCE($5, processing_status),
                processing_error = COALESCE($6, processing_error),
                unpublish_reason = COALESCE($7, unpublish_reason),
                trading_symbols = COALESCE($8, trading_symbols),
                published_at = CASE WHEN $9 THEN NOW() ELSE published_at END,
                last_status_change = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = $2 AND processing_status = $3
            RETURNING id, creator_id, title, description, provider_public_id,
                      asset_url, thumbnail_url, status, processing_status,
                      duration_seconds, file_size_bytes, tags, trading_symbols,
                      view_count, unique_view_count, average_watch_time_seconds,
                      engagement_rate, processing_error, unpublish_reason,
                      published_at, last_status_change, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(expected.0.as_str())
        .bind(expected.1.as_str())
        .bind(change.status.map(|s| s.as_str()))
        .bind(change.processing_status.map(|s| s.as_str()))
        .bind(&change.processing_error)
        .bind(&change.unpublish_reason)
        .bind(change.trading_symbols.as_ref().map(|s| serde_json::json!(s)))
        .bind(change.set_published_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to apply video state change")?;

        Ok(video)
    }

    async fn merge_asset_metadata(&self, id: Uuid, metadata: &AssetMetadata) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE videos
            SET asset_url = COALESCE($2, asset_url),
                thumbnail_url = COALESCE($3, thumbnail_url),
                duration_seconds = COALESCE($4, duration_seconds),
                file_size_bytes = COALESCE($5, file_size_bytes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&metadata.asset_url)
        .bind(&metadata.thumbnail_url)
        .bind(metadata.duration_seconds)
        .bind(metadata.file_size_bytes)
        .execute(&self.pool)
        .await
        .context("Failed to merge asset metadata")?;

        Ok(())
    }

    async fn set_view_counters(
        &self,
        id: Uuid,
        view_count: i64,
        unique_view_count: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE videos
            SET view_count = $2, unique_view_count = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(view_count)
        .bind(unique_view_count)
        .execute(&self.pool)
        .await
        .context("Failed to update view counters")?;

        Ok(())
    }

    async fn set_average_watch_time(&self, id: Uuid, average_seconds: f64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE videos
            SET average_watch_time_seconds = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(average_seconds)
        .execute(&self.pool)
        .await
        .context("Failed to update average watch time")?;

        Ok(())
    }

    async fn set_engagement_rate(&self, id: Uuid, rate: f64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE videos
            SET engagement_rate = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(rate)
        .execute(&self.pool)
        .await
        .context("Failed to update engagement rate")?;

        Ok(())
    }
}
