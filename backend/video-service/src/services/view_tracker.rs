use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::config::ViewConfig;
use crate::db::{SessionStore, VideoStore};
use crate::error::{AppError, Result};
use crate::models::{
    CompleteViewRequest, NewSession, SessionClose, SessionProgress, StartViewRequest,
    UpdateViewRequest, VideoEvent, ViewSession, ViewSummary, ViewerIdentity,
};
use crate::services::engagement::EngagementAggregator;
use crate::services::events::EventPublisher;
use crate::services::throttle::{client_fingerprint, ViewThrottle};

const COMPLETED_VIEW_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Serialize)]
pub struct StartedView {
    pub session_id: Uuid,
    pub duration_seconds: i32,
}

/// Tracks playback sessions from start to completion. Sessions expire
/// a fixed interval after creation; expiry is checked lazily on the
/// next update or complete call, there is no background sweep.
pub struct ViewTracker {
    videos: Arc<dyn VideoStore>,
    sessions: Arc<dyn SessionStore>,
    throttle: Arc<dyn ViewThrottle>,
    events: Arc<dyn EventPublisher>,
    aggregator: EngagementAggregator,
    config: ViewConfig,
    update_counter: AtomicU64,
}

impl ViewTracker {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        sessions: Arc<dyn SessionStore>,
        throttle: Arc<dyn ViewThrottle>,
        events: Arc<dyn EventPublisher>,
        aggregator: EngagementAggregator,
        config: ViewConfig,
    ) -> Self {
        ViewTracker {
            videos,
            sessions,
            throttle,
            events,
            aggregator,
            config,
            update_counter: AtomicU64::new(0),
        }
    }

    /// Opens a session and counts the view immediately. A session that
    /// never completes still counts; unique views only rise when this
    /// viewer has no earlier session on the video.
    pub async fn start(&self, request: StartViewRequest) -> Result<StartedView> {
        let identity = ViewerIdentity::from_parts(request.user_id, request.anonymous_id)?;
        let viewer_key = identity.key();

        let video = self
            .videos
            .get(request.video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", request.video_id)))?;

        let fingerprint = client_fingerprint(
            request.ip_address.as_deref(),
            request.user_agent.as_deref(),
            &viewer_key,
        );
        if self.throttle.should_throttle(&fingerprint).await? {
            warn!(video_id = %video.id, "Throttled view session start");
            return Err(AppError::RateLimitExceeded);
        }

        let session = self
            .sessions
            .insert(NewSession {
                video_id: video.id,
                viewer_key,
                ip_address: request.ip_address,
                user_agent: request.user_agent,
                country: request.country,
                city: request.city,
                device_type: request.device_type,
                traffic_source: request.traffic_source,
            })
            .await?;

        self.aggregator.refresh_view_counters(video.id).await?;

        Ok(StartedView {
            session_id: session.id,
            duration_seconds: video.duration_seconds,
        })
    }

    /// Records a progress report. The max watch high-water mark only
    /// rises, the percentage is clamped to [0,100], and a completed
    /// view can never become uncompleted.
    pub async fn update(&self, request: UpdateViewRequest) -> Result<ViewSession> {
        let session = self.get_session(request.session_id).await?;

        if !session.is_open() {
            return Err(AppError::InvalidState(
                "View session is already completed".to_string(),
            ));
        }
        if session.is_expired(self.config.session_ttl_minutes) {
            return Err(AppError::SessionExpired);
        }

        let watch_percentage = request.watch_percentage.clamp(0.0, 100.0);
        let progress = SessionProgress {
            watch_time_seconds: request.watch_time_seconds.max(0.0),
            max_watch_time_seconds: request.max_watch_time_seconds.max(0.0),
            watch_percentage,
            completed_view: watch_percentage >= COMPLETED_VIEW_THRESHOLD,
        };

        let updated = match self
            .sessions
            .update_progress(request.session_id, &progress)
            .await?
        {
            Some(updated) => updated,
            // Raced with a concurrent complete call.
            None => {
                return Err(AppError::InvalidState(
                    "View session is already completed".to_string(),
                ))
            }
        };

        self.maybe_refresh_average(updated.video_id).await;

        Ok(updated)
    }

    /// Closes the session and refreshes the video's aggregates.
    /// Calling complete again for the same session replays the stored
    /// outcome instead of counting anything twice.
    pub async fn complete(&self, request: CompleteViewRequest) -> Result<ViewSummary> {
        let session = self.get_session(request.session_id).await?;

        if !session.is_open() {
            return self.replay_summary(&session).await;
        }
        if session.is_expired(self.config.session_ttl_minutes) {
            return Err(AppError::SessionExpired);
        }

        let video = self
            .videos
            .get(session.video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", session.video_id)))?;

        let final_watch = request.final_watch_time_seconds.max(0.0);
        let watch_percentage = if video.duration_seconds > 0 {
            (final_watch / video.duration_seconds as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let completed_view =
            request.completed.unwrap_or(false) || watch_percentage >= COMPLETED_VIEW_THRESHOLD;

        let close = SessionClose {
            watch_time_seconds: final_watch,
            max_watch_time_seconds: request.max_watch_time_seconds.max(0.0),
            watch_percentage,
            completed_view,
            liked: request.liked,
            shared: request.shared,
        };

        let closed = match self.sessions.close(request.session_id, &close).await? {
            Some(closed) => closed,
            // Another call closed it first; replay its result.
            None => {
                let session = self.get_session(request.session_id).await?;
                return self.replay_summary(&session).await;
            }
        };

        let (view_count, _) = self.aggregator.refresh_view_counters(closed.video_id).await?;
        self.aggregator
            .refresh_engagement_rate(closed.video_id)
            .await?;
        self.aggregator
            .refresh_average_watch_time(closed.video_id)
            .await?;

        let event = VideoEvent::Viewed {
            video_id: closed.video_id,
            creator_id: video.creator_id,
            session_id: closed.id,
            viewer_key: closed.viewer_key.clone(),
            watch_time_seconds: closed.watch_time_seconds,
            watch_percentage: closed.watch_percentage,
            completed_view: closed.completed_view,
        };
        if let Err(e) = self.events.publish(&event).await {
            warn!(
                video_id = %closed.video_id,
                "Failed to publish video.viewed event: {}",
                e
            );
        }

        Ok(ViewSummary {
            session_id: closed.id,
            video_id: closed.video_id,
            total_watch_time_seconds: closed.watch_time_seconds,
            completion_rate: closed.watch_percentage,
            completed_view: closed.completed_view,
            was_liked: closed.liked,
            was_shared: closed.shared,
            updated_view_count: view_count,
        })
    }

    async fn get_session(&self, session_id: Uuid) -> Result<ViewSession> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("View session {} not found", session_id)))
    }

    async fn replay_summary(&self, session: &ViewSession) -> Result<ViewSummary> {
        let video = self
            .videos
            .get(session.video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", session.video_id)))?;

        Ok(ViewSummary {
            session_id: session.id,
            video_id: session.video_id,
            total_watch_time_seconds: session.watch_time_seconds,
            completion_rate: session.watch_percentage,
            completed_view: session.completed_view,
            was_liked: session.liked,
            was_shared: session.shared,
            updated_view_count: video.view_count,
        })
    }

    /// Recomputing the average on every progress report would scan the
    /// session table constantly, so only every Nth update triggers it.
    async fn maybe_refresh_average(&self, video_id: Uuid) {
        let every = self.config.avg_watch_sample_every.max(1);
        let tick = self.update_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if tick % every != 0 {
            return;
        }

        if let Err(e) = self.aggregator.refresh_average_watch_time(video_id).await {
            warn!(video_id = %video_id, "Failed to refresh average watch time: {}", e);
        }
    }
}
