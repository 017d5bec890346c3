use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};

use crate::db::VideoStore;
use crate::error::{AppError, Result};
use crate::models::{NotificationKind, ProviderNotification, ProviderStatus};
use crate::services::lifecycle::{ApplyOutcome, LifecycleEvent, LifecycleService};

type HmacSha256 = Hmac<Sha256>;

const MAX_DELIVERY_RETRIES: usize = 3;

/// What a delivery did to the record. Everything here is acknowledged
/// with 200; the provider redelivers on anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    Noop,
    UnknownVideo,
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied => "applied",
            WebhookOutcome::Noop => "noop",
            WebhookOutcome::UnknownVideo => "unknown_video",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

/// Verifies the hex HMAC-SHA256 of the exact raw body. The comparison
/// is case-insensitive and tolerates a `sha256=` prefix. Without a
/// configured secret, verification is skipped for local development.
pub fn verify_signature(secret: Option<&str>, body: &[u8], header: Option<&str>) -> Result<()> {
    let secret = match secret {
        Some(secret) => secret,
        None => {
            warn!("No webhook secret configured; skipping signature verification");
            return Ok(());
        }
    };

    let header = header.ok_or(AppError::InvalidSignature)?;
    let provided = header.strip_prefix("sha256=").unwrap_or(header);

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AppError::InvalidSignature)?;
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected.eq_ignore_ascii_case(provided) {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

pub struct WebhookProcessor {
    videos: Arc<dyn VideoStore>,
    lifecycle: LifecycleService,
    secret: Option<String>,
}

impl WebhookProcessor {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        lifecycle: LifecycleService,
        secret: Option<String>,
    ) -> Self {
        WebhookProcessor {
            videos,
            lifecycle,
            secret,
        }
    }

    pub fn verify_signature(&self, body: &[u8], header: Option<&str>) -> Result<()> {
        verify_signature(self.secret.as_deref(), body, header)
    }

    /// Applies one provider notification. Deliveries are at-least-once
    /// and can arrive out of order, so every path here must be safe to
    /// repeat: redundant deliveries fall through to Noop and unknown
    /// records are acknowledged without action.
    pub async fn process(&self, notification: &ProviderNotification) -> Result<WebhookOutcome> {
        if notification.kind() == NotificationKind::Unknown {
            info!(
                notification_type = %notification.notification_type,
                "Ignoring unrecognized notification type"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let mut video = match self
            .videos
            .get_by_public_id(&notification.public_id)
            .await?
        {
            Some(video) => video,
            None => {
                warn!(
                    public_id = %notification.public_id,
                    "Webhook for unknown video; acknowledging without action"
                );
                return Ok(WebhookOutcome::UnknownVideo);
            }
        };

        let metadata = notification.asset_metadata();
        if !metadata.is_empty() {
            self.videos.merge_asset_metadata(video.id, &metadata).await?;
        }

        let error_text = notification.error_text();
        let event = match notification.provider_status() {
            ProviderStatus::Succeeded => LifecycleEvent::ProviderSucceeded,
            ProviderStatus::Failed => LifecycleEvent::ProviderFailed(&error_text),
            ProviderStatus::InProgress => {
                // Only processing notifications carry progress.
                if notification.kind() != NotificationKind::VideoProcessing {
                    return Ok(WebhookOutcome::Noop);
                }
                LifecycleEvent::ProviderInProgress
            }
            ProviderStatus::Unrecognized => {
                info!(
                    public_id = %notification.public_id,
                    "Notification carried no actionable status"
                );
                return Ok(WebhookOutcome::Noop);
            }
        };

        for _ in 0..MAX_DELIVERY_RETRIES {
            match self.lifecycle.apply_event(&video, &event).await? {
                ApplyOutcome::Applied(updated) => {
                    info!(
                        video_id = %video.id,
                        status = %updated.status,
                        "Applied provider notification"
                    );
                    return Ok(WebhookOutcome::Applied);
                }
                ApplyOutcome::Noop => return Ok(WebhookOutcome::Noop),
                ApplyOutcome::LostRace => {
                    video = match self.videos.get(video.id).await? {
                        Some(video) => video,
                        None => return Ok(WebhookOutcome::UnknownVideo),
                    };
                }
            }
        }

        Err(AppError::Internal(
            "Webhook processing lost too many concurrent update races".to_string(),
        ))
    }
}
