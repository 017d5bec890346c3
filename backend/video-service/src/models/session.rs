use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// A session is open while progress updates are accepted and closed
/// once a completion has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Open,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(SessionState::Open),
            "closed" => Some(SessionState::Closed),
            _ => None,
        }
    }
}

/// Who is watching. Authenticated users take precedence over the
/// client-generated anonymous id when both are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerIdentity {
    User(Uuid),
    Anonymous(String),
}

impl ViewerIdentity {
    pub fn from_parts(
        user_id: Option<Uuid>,
        anonymous_id: Option<String>,
    ) -> Result<Self, AppError> {
        if let Some(user_id) = user_id {
            return Ok(ViewerIdentity::User(user_id));
        }
        match anonymous_id {
            Some(id) if !id.trim().is_empty() => Ok(ViewerIdentity::Anonymous(id)),
            _ => Err(AppError::Validation(
                "Either user_id or anonymous_id is required".to_string(),
            )),
        }
    }

    /// Stable key used for unique-viewer counting.
    pub fn key(&self) -> String {
        match self {
            ViewerIdentity::User(id) => format!("user:{}", id),
            ViewerIdentity::Anonymous(id) => format!("anon:{}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ViewSession {
    pub id: Uuid,
    pub video_id: Uuid,
    pub viewer_key: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub traffic_source: Option<String>,
    pub watch_time_seconds: f64,
    pub max_watch_time_seconds: f64,
    pub watch_percentage: f64,
    pub completed_view: bool,
    pub liked: bool,
    pub shared: bool,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub last_watched_at: DateTime<Utc>,
}

impl ViewSession {
    pub fn get_state(&self) -> SessionState {
        SessionState::from_str(&self.state).unwrap_or(SessionState::Open)
    }

    pub fn is_open(&self) -> bool {
        self.get_state() == SessionState::Open
    }

    /// Expiry is measured from session creation, not from the last
    /// progress update.
    pub fn is_expired(&self, ttl_minutes: i64) -> bool {
        Utc::now() - self.created_at > Duration::minutes(ttl_minutes)
    }
}

/// Insert payload for a session accepted by start.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub video_id: Uuid,
    pub viewer_key: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub traffic_source: Option<String>,
}

/// Store update for an open session. completed_view is ORed into the
/// stored flag so it can never be unset.
#[derive(Debug, Clone)]
pub struct SessionProgress {
    pub watch_time_seconds: f64,
    pub max_watch_time_seconds: f64,
    pub watch_percentage: f64,
    pub completed_view: bool,
}

/// Final update written when a session is closed.
#[derive(Debug, Clone)]
pub struct SessionClose {
    pub watch_time_seconds: f64,
    pub max_watch_time_seconds: f64,
    pub watch_percentage: f64,
    pub completed_view: bool,
    pub liked: Option<bool>,
    pub shared: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartViewRequest {
    pub video_id: Uuid,
    pub user_id: Option<Uuid>,
    #[validate(length(max = 128, message = "Anonymous id too long"))]
    pub anonymous_id: Option<String>,
    #[validate(length(max = 64, message = "IP address too long"))]
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub traffic_source: Option<String>,
}

/// Progress report from the player. The client computes percentage
/// locally from the duration returned by start.
#[derive(Debug, Deserialize)]
pub struct UpdateViewRequest {
    pub session_id: Uuid,
    pub watch_time_seconds: f64,
    pub max_watch_time_seconds: f64,
    pub watch_percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct CompleteViewRequest {
    pub session_id: Uuid,
    pub final_watch_time_seconds: f64,
    pub max_watch_time_seconds: f64,
    pub completed: Option<bool>,
    pub liked: Option<bool>,
    pub shared: Option<bool>,
}

/// Returned to the client when a session completes, including replays
/// of an already-closed session.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSummary {
    pub session_id: Uuid,
    pub video_id: Uuid,
    pub total_watch_time_seconds: f64,
    pub completion_rate: f64,
    pub completed_view: bool,
    pub was_liked: bool,
    pub was_shared: bool,
    pub updated_view_count: i64,
}
