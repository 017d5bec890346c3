use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Publication lifecycle of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Uploading,
    Processing,
    ReadyToPublish,
    Published,
    Unpublished,
    ProcessingFailed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Processing => "processing",
            VideoStatus::ReadyToPublish => "ready_to_publish",
            VideoStatus::Published => "published",
            VideoStatus::Unpublished => "unpublished",
            VideoStatus::ProcessingFailed => "processing_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uploading" => Some(VideoStatus::Uploading),
            "processing" => Some(VideoStatus::Processing),
            "ready_to_publish" => Some(VideoStatus::ReadyToPublish),
            "published" => Some(VideoStatus::Published),
            "unpublished" => Some(VideoStatus::Unpublished),
            "processing_failed" => Some(VideoStatus::ProcessingFailed),
            _ => None,
        }
    }
}

/// Transcoding progress reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::InProgress => "in_progress",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingStatus::Pending),
            "in_progress" => Some(ProcessingStatus::InProgress),
            "completed" => Some(ProcessingStatus::Completed),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoRecord {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub provider_public_id: String,
    pub asset_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: String,
    pub processing_status: String,
    pub duration_seconds: i32,
    pub file_size_bytes: Option<i64>,
    pub tags: serde_json::Value,
    pub trading_symbols: serde_json::Value,
    pub view_count: i64,
    pub unique_view_count: i64,
    pub average_watch_time_seconds: f64,
    pub engagement_rate: f64,
    pub processing_error: Option<String>,
    pub unpublish_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub last_status_change: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn get_status(&self) -> VideoStatus {
        VideoStatus::from_str(&self.status).unwrap_or(VideoStatus::Uploading)
    }

    pub fn get_processing_status(&self) -> ProcessingStatus {
        ProcessingStatus::from_str(&self.processing_status).unwrap_or(ProcessingStatus::Pending)
    }

    pub fn get_tags(&self) -> Vec<String> {
        serde_json::from_value(self.tags.clone()).unwrap_or_default()
    }

    pub fn get_trading_symbols(&self) -> Vec<String> {
        serde_json::from_value(self.trading_symbols.clone()).unwrap_or_default()
    }

    pub fn is_published(&self) -> bool {
        self.get_status() == VideoStatus::Published
    }

    /// Text scanned for ticker symbols when the video is first published.
    pub fn symbol_source_text(&self) -> String {
        match &self.description {
            Some(description) => format!("{} {}", self.title, description),
            None => self.title.clone(),
        }
    }
}

/// Insert payload for a freshly registered video.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub provider_public_id: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterVideoRequest {
    pub creator_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "Description too long"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Provider public id is required"))]
    pub provider_public_id: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UnpublishRequest {
    pub reason: Option<String>,
}

/// Metadata carried on provider callbacks, merged into the record
/// independently of any status change.
#[derive(Debug, Clone, Default)]
pub struct AssetMetadata {
    pub asset_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub file_size_bytes: Option<i64>,
}

impl AssetMetadata {
    pub fn is_empty(&self) -> bool {
        self.asset_url.is_none()
            && self.thumbnail_url.is_none()
            && self.duration_seconds.is_none()
            && self.file_size_bytes.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: VideoStatus,
    pub processing_status: ProcessingStatus,
    pub asset_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i32,
    pub tags: Vec<String>,
    pub trading_symbols: Vec<String>,
    pub view_count: i64,
    pub unique_view_count: i64,
    pub average_watch_time_seconds: f64,
    pub engagement_rate: f64,
    pub processing_error: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<VideoRecord> for VideoResponse {
    fn from(record: VideoRecord) -> Self {
        VideoResponse {
            status: record.get_status(),
            processing_status: record.get_processing_status(),
            tags: record.get_tags(),
            trading_symbols: record.get_trading_symbols(),
            id: record.id,
            creator_id: record.creator_id,
            title: record.title,
            description: record.description,
            asset_url: record.asset_url,
            thumbnail_url: record.thumbnail_url,
            duration_seconds: record.duration_seconds,
            view_count: record.view_count,
            unique_view_count: record.unique_view_count,
            average_watch_time_seconds: record.average_watch_time_seconds,
            engagement_rate: record.engagement_rate,
            processing_error: record.processing_error,
            published_at: record.published_at,
            created_at: record.created_at,
        }
    }
}
