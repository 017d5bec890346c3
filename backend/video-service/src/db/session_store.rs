use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewSession, SessionClose, SessionProgress, ViewSession};

/// Durable per-viewer session store plus the aggregate queries the
/// engagement counters are derived from.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, new_session: NewSession) -> Result<ViewSession>;

    async fn get(&self, id: Uuid) -> Result<Option<ViewSession>>;

    /// Writes progress while the session is still open; None means the
    /// session is missing or already closed.
    async fn update_progress(
        &self,
        id: Uuid,
        progress: &SessionProgress,
    ) -> Result<Option<ViewSession>>;

    /// Closes an open session exactly once. None means another call
    /// already closed it, which callers treat as a replay.
    async fn close(&self, id: Uuid, close: &SessionClose) -> Result<Option<ViewSession>>;

    async fn count_sessions(&self, video_id: Uuid) -> Result<i64>;

    async fn count_distinct_viewers(&self, video_id: Uuid) -> Result<i64>;

    async fn count_engaged(&self, video_id: Uuid) -> Result<i64>;

    async fn recent_watch_times(
        &self,
        video_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<f64>>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, new_session: NewSession) -> Result<ViewSession> {
        let session = sqlx::query_as::<_, ViewSession>(
            r#"
            INSERT INTO view_sessions (id, video_id, viewer_key, ip_address, user_agent,
                                       country, city, device_type, traffic_source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, video_id, viewer_key, ip_address, user_agent,
                      country, city, device_type, traffic_source,
                      watch_time_seconds, max_watch_time_seconds, watch_percentage,
                      completed_view, liked, shared, state, created_at, last_watched_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_session.video_id)
        .bind(&new_session.viewer_key)
        .bind(&new_session.ip_address)
        .bind(&new_session.user_agent)
        .bind(&new_session.country)
        .bind(&new_session.city)
        .bind(&new_session.device_type)
        .bind(&new_session.traffic_source)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert view session")?;

        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ViewSession>> {
        let session = sqlx::query_as::<_, ViewSession>(
            r#"
            SELECT id, video_id, viewer_key, ip_address, user_agent,
                   country, city, device_type, traffic_source,
                   watch_time_seconds, max_watch_time_seconds, watch_percentage,
                   completed_view, liked, shared, state, created_at, last_watched_at
            FROM view_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch view session")?;

        Ok(session)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: &SessionProgress,
    ) -> Result<Option<ViewSession>> {
        let session = sqlx::query_as::<_, ViewSession>(
            r#"
            UPDATE view_sessions
            SET watch_time_seconds = $2,
                max_watch_time_seconds = GREATEST(max_watch_time_seconds, $3),
                watch_percentage = $4,
                completed_view = completed_view OR $5,
                last_watched_at = NOW()
            WHERE id = $1 AND state = 'open'
            RETURNING id, video_id, viewer_key, ip_address, user_agent,
                      country, city, device_type, traffic_source,
                      watch_time_seconds, max_watch_time_seconds, watch_percentage,
                      completed_view, liked, shared, state, created_at, last_watched_at
            "#,
        )
        .bind(id)
        .bind(progress.watch_time_seconds)
        .bind(progress.max_watch_time_seconds)
        .bind(progress.watch_percentage)
        .bind(progress.completed_view)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update view session progress")?;

        Ok(session)
    }

    async fn close(&self, id: Uuid, close: &SessionClose) -> Result<Option<ViewSession>> {
        let session = sqlx::query_as::<_, ViewSession>(
            r#"
            UPDATE view_sessions
            SET watch_time_seconds = $2,
                max_watch_time_seconds = GREATEST(max_watch_time_seconds, $3),
                watch_percentage = $4,
                completed_view = completed_view OR $5,
                liked = COALESCE($6, liked),
                shared = COALESCE($7, shared),
                state = 'closed',
                last_watched_at = NOW()
            WHERE id = $1 AND state = 'open'
            RETURNING id, video_id, viewer_key, ip_address, user_agent,
                      country, city, device_type, traffic_source,
                      watch_time_seconds, max_watch_time_seconds, watch_percentage,
                      completed_view, liked, shared, state, created_at, last_watched_at
            "#,
        )
        .bind(id)
        .bind(close.watch_time_seconds)
        .bind(close.max_watch_time_seconds)
        .bind(close.watch_percentage)
        .bind(close.completed_view)
        .bind(close.liked)
        .bind(close.shared)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to close view session")?;

        Ok(session)
    }

    async fn count_sessions(&self, video_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM view_sessions WHERE video_id = $1",
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count view sessions")?;

        Ok(count)
    }

    async fn count_distinct_viewers(&self, video_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT viewer_key) FROM view_sessions WHERE video_id = $1",
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count distinct viewers")?;

        Ok(count)
    }

    async fn count_engaged(&self, video_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM view_sessions
            WHERE video_id = $1 AND (liked = TRUE OR shared = TRUE)
            "#,
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count engaged sessions")?;

        Ok(count)
    }

    async fn recent_watch_times(
        &self,
        video_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<f64>> {
        let watch_times = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT watch_time_seconds FROM view_sessions
            WHERE video_id = $1 AND last_watched_at >= $2
            ORDER BY last_watched_at DESC
            LIMIT $3
            "#,
        )
        .bind(video_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent watch times")?;

        Ok(watch_times)
    }
}
