#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use video_service::config::ViewConfig;
use video_service::db::{SessionStore, VideoStore};
use video_service::models::{
    AssetMetadata, NewSession, NewVideo, ProcessingStatus, SessionClose, SessionProgress,
    VideoEvent, VideoRecord, VideoStatus, ViewSession,
};
use video_service::services::events::EventPublisher;
use video_service::services::lifecycle::StateChange;
use video_service::services::throttle::ViewThrottle;

pub fn view_config(sample_every: u64) -> ViewConfig {
    ViewConfig {
        session_ttl_minutes: 30,
        throttle_max_starts: 100,
        throttle_window_secs: 300,
        avg_watch_sample_every: sample_every,
        avg_watch_window_days: 7,
        avg_watch_max_samples: 500,
    }
}

pub fn video_fixture(status: VideoStatus, processing: ProcessingStatus) -> VideoRecord {
    let now = Utc::now();
    VideoRecord {
        id: Uuid::new_v4(),
        creator_id: Uuid::new_v4(),
        title: "Weekly market recap".to_string(),
        description: None,
        provider_public_id: format!("vid_{}", Uuid::new_v4().simple()),
        asset_url: None,
        thumbnail_url: None,
        status: status.as_str().to_string(),
        processing_status: processing.as_str().to_string(),
        duration_seconds: 0,
        file_size_bytes: None,
        tags: serde_json::json!([]),
        trading_symbols: serde_json::json!([]),
        view_count: 0,
        unique_view_count: 0,
        average_watch_time_seconds: 0.0,
        engagement_rate: 0.0,
        processing_error: None,
        unpublish_reason: None,
        published_at: None,
        last_status_change: now,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct MemoryVideoStore {
    videos: Mutex<Vec<VideoRecord>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, video: VideoRecord) {
        self.videos.lock().await.push(video);
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<VideoRecord> {
        self.videos.lock().await.iter().find(|v| v.id == id).cloned()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn insert(&self, new_video: NewVideo) -> Result<VideoRecord> {
        let mut video = video_fixture(VideoStatus::Uploading, ProcessingStatus::Pending);
        video.creator_id = new_video.creator_id;
        video.title = new_video.title;
        video.description = new_video.description;
        video.provider_public_id = new_video.provider_public_id;
        video.tags = serde_json::json!(new_video.tags);

        self.videos.lock().await.push(video.clone());
        Ok(video)
    }

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>> {
        Ok(self.videos.lock().await.iter().find(|v| v.id == id).cloned())
    }

    async fn get_by_public_id(&self, public_id: &str) -> Result<Option<VideoRecord>> {
        Ok(self
            .videos
            .lock()
            .await
            .iter()
            .find(|v| v.provider_public_id == public_id)
            .cloned())
    }

    async fn apply_state(
        &self,
        id: Uuid,
        expected: (VideoStatus, ProcessingStatus),
        change: &StateChange,
    ) -> Result<Option<VideoRecord>> {
        let mut videos = self.videos.lock().await;
        let video = match videos.iter_mut().find(|v| v.id == id) {
            Some(video) => video,
            None => return Ok(None),
        };

        if video.status != expected.0.as_str() || video.processing_status != expected.1.as_str() {
            return Ok(None);
        }

        if let Some(status) = change.status {
            video.status = status.as_str().to_string();
        }
        if let Some(processing) = change.processing_status {
            video.processing_status = processing.as_str().to_string();
        }
        if let Some(error) = &change.processing_error {
            video.processing_error = Some(error.clone());
        }
        if let Some(reason) = &change.unpublish_reason {
            video.unpublish_reason = Some(reason.clone());
        }
        if let Some(symbols) = &change.trading_symbols {
            video.trading_symbols = serde_json::json!(symbols);
        }
        if change.set_published_at {
            video.published_at = Some(Utc::now());
        }
        video.last_status_change = Utc::now();
        video.updated_at = Utc::now();

        Ok(Some(video.clone()))
    }

    async fn merge_asset_metadata(&self, id: Uuid, metadata: &AssetMetadata) -> Result<()> {
        let mut videos = self.videos.lock().await;
        if let Some(video) = videos.iter_mut().find(|v| v.id == id) {
            if let Some(url) = &metadata.asset_url {
                video.asset_url = Some(url.clone());
            }
            if let Some(url) = &metadata.thumbnail_url {
                video.thumbnail_url = Some(url.clone());
            }
            if let Some(duration) = metadata.duration_seconds {
                video.duration_seconds = duration;
            }
            if let Some(bytes) = metadata.file_size_bytes {
                video.file_size_bytes = Some(bytes);
            }
            video.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_view_counters(
        &self,
        id: Uuid,
        view_count: i64,
        unique_view_count: i64,
    ) -> Result<()> {
        let mut videos = self.videos.lock().await;
        if let Some(video) = videos.iter_mut().find(|v| v.id == id) {
            video.view_count = view_count;
            video.unique_view_count = unique_view_count;
        }
        Ok(())
    }

    async fn set_average_watch_time(&self, id: Uuid, average_seconds: f64) -> Result<()> {
        let mut videos = self.videos.lock().await;
        if let Some(video) = videos.iter_mut().find(|v| v.id == id) {
            video.average_watch_time_seconds = average_seconds;
        }
        Ok(())
    }

    async fn set_engagement_rate(&self, id: Uuid, rate: f64) -> Result<()> {
        let mut videos = self.videos.lock().await;
        if let Some(video) = videos.iter_mut().find(|v| v.id == id) {
            video.engagement_rate = rate;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<ViewSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts a session's creation time into the past for expiry tests.
    pub async fn backdate(&self, id: Uuid, minutes: i64) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.created_at = session.created_at - Duration::minutes(minutes);
        }
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<ViewSession> {
        self.sessions.lock().await.iter().find(|s| s.id == id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, new_session: NewSession) -> Result<ViewSession> {
        let now = Utc::now();
        let session = ViewSession {
            id: Uuid::new_v4(),
            video_id: new_session.video_id,
            viewer_key: new_session.viewer_key,
            ip_address: new_session.ip_address,
            user_agent: new_session.user_agent,
            country: new_session.country,
            city: new_session.city,
            device_type: new_session.device_type,
            traffic_source: new_session.traffic_source,
            watch_time_seconds: 0.0,
            max_watch_time_seconds: 0.0,
            watch_percentage: 0.0,
            completed_view: false,
            liked: false,
            shared: false,
            state: "open".to_string(),
            created_at: now,
            last_watched_at: now,
        };

        self.sessions.lock().await.push(session.clone());
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ViewSession>> {
        Ok(self.sessions.lock().await.iter().find(|s| s.id == id).cloned())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: &SessionProgress,
    ) -> Result<Option<ViewSession>> {
        let mut sessions = self.sessions.lock().await;
        let session = match sessions.iter_mut().find(|s| s.id == id && s.state == "open") {
            Some(session) => session,
            None => return Ok(None),
        };

        session.watch_time_seconds = progress.watch_time_seconds;
        session.max_watch_time_seconds = session
            .max_watch_time_seconds
            .max(progress.max_watch_time_seconds);
        session.watch_percentage = progress.watch_percentage;
        session.completed_view = session.completed_view || progress.completed_view;
        session.last_watched_at = Utc::now();

        Ok(Some(session.clone()))
    }

    async fn close(&self, id: Uuid, close: &SessionClose) -> Result<Option<ViewSession>> {
        let mut sessions = self.sessions.lock().await;
        let session = match sessions.iter_mut().find(|s| s.id == id && s.state == "open") {
            Some(session) => session,
            None => return Ok(None),
        };

        session.watch_time_seconds = close.watch_time_seconds;
        session.max_watch_time_seconds = session
            .max_watch_time_seconds
            .max(close.max_watch_time_seconds);
        session.watch_percentage = close.watch_percentage;
        session.completed_view = session.completed_view || close.completed_view;
        if let Some(liked) = close.liked {
            session.liked = liked;
        }
        if let Some(shared) = close.shared {
            session.shared = shared;
        }
        session.state = "closed".to_string();
        session.last_watched_at = Utc::now();

        Ok(Some(session.clone()))
    }

    async fn count_sessions(&self, video_id: Uuid) -> Result<i64> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.video_id == video_id)
            .count() as i64)
    }

    async fn count_distinct_viewers(&self, video_id: Uuid) -> Result<i64> {
        let sessions = self.sessions.lock().await;
        let viewers: HashSet<&str> = sessions
            .iter()
            .filter(|s| s.video_id == video_id)
            .map(|s| s.viewer_key.as_str())
            .collect();
        Ok(viewers.len() as i64)
    }

    async fn count_engaged(&self, video_id: Uuid) -> Result<i64> {
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .filter(|s| s.video_id == video_id && (s.liked || s.shared))
            .count() as i64)
    }

    async fn recent_watch_times(
        &self,
        video_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<f64>> {
        let sessions = self.sessions.lock().await;
        let mut recent: Vec<(DateTime<Utc>, f64)> = sessions
            .iter()
            .filter(|s| s.video_id == video_id && s.last_watched_at >= since)
            .map(|s| (s.last_watched_at, s.watch_time_seconds))
            .collect();
        recent.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(recent
            .into_iter()
            .take(limit as usize)
            .map(|(_, watch_time)| watch_time)
            .collect())
    }
}

#[derive(Default)]
pub struct CaptureEvents {
    events: Mutex<Vec<VideoEvent>>,
}

impl CaptureEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<VideoEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for CaptureEvents {
    async fn publish(&self, event: &VideoEvent) -> video_service::error::Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

pub struct MemoryThrottle {
    max_starts: u32,
    counts: Mutex<HashMap<String, u32>>,
}

impl MemoryThrottle {
    pub fn new(max_starts: u32) -> Self {
        Self {
            max_starts,
            counts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ViewThrottle for MemoryThrottle {
    async fn should_throttle(&self, fingerprint: &str) -> video_service::error::Result<bool> {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(fingerprint.to_string()).or_insert(0);
        if *count >= self.max_starts {
            return Ok(true);
        }
        *count += 1;
        Ok(false)
    }
}
