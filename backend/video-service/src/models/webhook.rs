use serde::Deserialize;

use crate::models::video::AssetMetadata;

/// Raw callback body posted by the transcoding provider. The provider
/// uses camelCase field names; aliases keep snake_case payloads from
/// internal tooling parseable as well.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderNotification {
    #[serde(alias = "notificationType")]
    pub notification_type: String,
    #[serde(alias = "publicId")]
    pub public_id: String,
    pub status: Option<String>,
    #[serde(alias = "secureUrl")]
    pub secure_url: Option<String>,
    #[serde(alias = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    #[serde(alias = "resourceType")]
    pub resource_type: Option<String>,
    #[serde(alias = "fileSizeBytes", alias = "bytes")]
    pub file_size_bytes: Option<i64>,
    #[serde(alias = "errorMessage", alias = "error")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Upload,
    VideoProcessing,
    Unknown,
}

/// Outcome reported by the provider, normalized across the status
/// spellings seen in real callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    InProgress,
    Succeeded,
    Failed,
    Unrecognized,
}

impl ProviderNotification {
    pub fn kind(&self) -> NotificationKind {
        match self.notification_type.as_str() {
            "upload" => NotificationKind::Upload,
            "video_processing" => NotificationKind::VideoProcessing,
            _ => NotificationKind::Unknown,
        }
    }

    pub fn provider_status(&self) -> ProviderStatus {
        let status = match &self.status {
            Some(status) => status.to_lowercase(),
            None => return ProviderStatus::Unrecognized,
        };
        match status.as_str() {
            "success" | "succeeded" | "complete" | "completed" => ProviderStatus::Succeeded,
            "error" | "failed" | "failure" => ProviderStatus::Failed,
            "in_progress" | "processing" => ProviderStatus::InProgress,
            _ => ProviderStatus::Unrecognized,
        }
    }

    pub fn asset_metadata(&self) -> AssetMetadata {
        AssetMetadata {
            asset_url: self.secure_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            duration_seconds: self.duration.map(|d| d.round() as i32),
            file_size_bytes: self.file_size_bytes,
        }
    }

    pub fn error_text(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "Provider reported a processing failure".to_string())
    }
}
