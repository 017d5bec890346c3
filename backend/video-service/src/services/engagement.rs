use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::{SessionStore, VideoStore};
use crate::error::Result;

/// Derives the engagement counters on a video from its stored
/// sessions. Counters are recomputed rather than incremented in
/// place, so replayed calls and process restarts converge on the
/// same numbers. Never touches lifecycle status columns.
#[derive(Clone)]
pub struct EngagementAggregator {
    videos: Arc<dyn VideoStore>,
    sessions: Arc<dyn SessionStore>,
    window_days: i64,
    max_samples: i64,
}

impl EngagementAggregator {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        sessions: Arc<dyn SessionStore>,
        window_days: i64,
        max_samples: i64,
    ) -> Self {
        EngagementAggregator {
            videos,
            sessions,
            window_days,
            max_samples,
        }
    }

    /// Recounts total and distinct-viewer sessions. Distinct viewers
    /// can never exceed total sessions, which keeps the counter
    /// invariant intact without extra checks.
    pub async fn refresh_view_counters(&self, video_id: Uuid) -> Result<(i64, i64)> {
        let view_count = self.sessions.count_sessions(video_id).await?;
        let unique_view_count = self.sessions.count_distinct_viewers(video_id).await?;

        self.videos
            .set_view_counters(video_id, view_count, unique_view_count)
            .await?;

        Ok((view_count, unique_view_count))
    }

    /// Average watch time over a bounded trailing window, so the scan
    /// cost stays flat as a video accumulates history.
    pub async fn refresh_average_watch_time(&self, video_id: Uuid) -> Result<f64> {
        let since = Utc::now() - Duration::days(self.window_days);
        let watch_times = self
            .sessions
            .recent_watch_times(video_id, since, self.max_samples)
            .await?;

        let average = if watch_times.is_empty() {
            0.0
        } else {
            watch_times.iter().sum::<f64>() / watch_times.len() as f64
        };

        self.videos
            .set_average_watch_time(video_id, average)
            .await?;

        Ok(average)
    }

    /// Fraction of sessions that liked or shared.
    pub async fn refresh_engagement_rate(&self, video_id: Uuid) -> Result<f64> {
        let view_count = self.sessions.count_sessions(video_id).await?;
        let engaged = self.sessions.count_engaged(video_id).await?;

        let rate = if view_count == 0 {
            0.0
        } else {
            engaged as f64 / view_count as f64
        };

        self.videos.set_engagement_rate(video_id, rate).await?;

        Ok(rate)
    }
}
