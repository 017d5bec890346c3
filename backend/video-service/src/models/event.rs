use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

/// Domain events emitted onto the video events topic after a state
/// change has been durably applied.
#[derive(Debug, Clone)]
pub enum VideoEvent {
    Processed {
        video_id: Uuid,
        creator_id: Uuid,
    },
    ProcessingFailed {
        video_id: Uuid,
        creator_id: Uuid,
        error: String,
    },
    Published {
        video_id: Uuid,
        creator_id: Uuid,
        trading_symbols: Vec<String>,
    },
    Unpublished {
        video_id: Uuid,
        creator_id: Uuid,
        reason: Option<String>,
    },
    Viewed {
        video_id: Uuid,
        creator_id: Uuid,
        session_id: Uuid,
        viewer_key: String,
        watch_time_seconds: f64,
        watch_percentage: f64,
        completed_view: bool,
    },
}

impl VideoEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            VideoEvent::Processed { .. } => "video.processed",
            VideoEvent::ProcessingFailed { .. } => "video.processing_failed",
            VideoEvent::Published { .. } => "video.published",
            VideoEvent::Unpublished { .. } => "video.unpublished",
            VideoEvent::Viewed { .. } => "video.viewed",
        }
    }

    /// Partition key. Events for one video stay ordered.
    pub fn video_id(&self) -> Uuid {
        match self {
            VideoEvent::Processed { video_id, .. }
            | VideoEvent::ProcessingFailed { video_id, .. }
            | VideoEvent::Published { video_id, .. }
            | VideoEvent::Unpublished { video_id, .. }
            | VideoEvent::Viewed { video_id, .. } => *video_id,
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        let data = match self {
            VideoEvent::Processed {
                video_id,
                creator_id,
            } => json!({
                "video_id": video_id,
                "creator_id": creator_id,
            }),
            VideoEvent::ProcessingFailed {
                video_id,
                creator_id,
                error,
            } => json!({
                "video_id": video_id,
                "creator_id": creator_id,
                "error": error,
            }),
            VideoEvent::Published {
                video_id,
                creator_id,
                trading_symbols,
            } => json!({
                "video_id": video_id,
                "creator_id": creator_id,
                "trading_symbols": trading_symbols,
            }),
            VideoEvent::Unpublished {
                video_id,
                creator_id,
                reason,
            } => json!({
                "video_id": video_id,
                "creator_id": creator_id,
                "reason": reason,
            }),
            VideoEvent::Viewed {
                video_id,
                creator_id,
                session_id,
                viewer_key,
                watch_time_seconds,
                watch_percentage,
                completed_view,
            } => json!({
                "video_id": video_id,
                "creator_id": creator_id,
                "session_id": session_id,
                "viewer_key": viewer_key,
                "watch_time_seconds": watch_time_seconds,
                "watch_percentage": watch_percentage,
                "completed_view": completed_view,
            }),
        };

        json!({
            "event": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
            "data": data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let video_id = Uuid::new_v4();
        let event = VideoEvent::Published {
            video_id,
            creator_id: Uuid::new_v4(),
            trading_symbols: vec!["NVDA".to_string()],
        };

        let payload = event.to_payload();
        assert_eq!(payload["event"], "video.published");
        assert_eq!(payload["data"]["video_id"], json!(video_id));
        assert_eq!(payload["data"]["trading_symbols"][0], "NVDA");
        assert!(payload["timestamp"].is_string());
        assert_eq!(event.video_id(), video_id);
    }
}
