use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::VideoStore;
use crate::error::{AppError, Result};
use crate::models::{
    NewVideo, ProcessingStatus, RegisterVideoRequest, VideoEvent, VideoRecord, VideoStatus,
};
use crate::services::events::EventPublisher;
use crate::services::symbols;

const MAX_STATE_RETRIES: usize = 3;

/// Inputs to the lifecycle state machine. Provider events come from
/// webhook ingestion, the rest are operator commands.
#[derive(Debug, Clone)]
pub enum LifecycleEvent<'a> {
    ProviderInProgress,
    ProviderSucceeded,
    ProviderFailed(&'a str),
    Publish,
    Unpublish(Option<&'a str>),
}

/// Field updates applied atomically together with the status change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateChange {
    pub status: Option<VideoStatus>,
    pub processing_status: Option<ProcessingStatus>,
    pub processing_error: Option<String>,
    pub set_published_at: bool,
    pub unpublish_reason: Option<String>,
    pub trading_symbols: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Apply(StateChange),
    Noop,
    Reject(&'static str),
}

/// Total transition function over (status, processing status, event).
///
/// Provider events are convergent: redelivering a notification that was
/// already applied yields Noop, and a stale in_progress or error can
/// never regress a record that has moved past it. Commands that violate
/// a precondition yield Reject.
pub fn next_state(
    status: VideoStatus,
    processing: ProcessingStatus,
    event: &LifecycleEvent<'_>,
) -> Transition {
    match event {
        LifecycleEvent::ProviderInProgress => match (status, processing) {
            (VideoStatus::Uploading, ProcessingStatus::Pending) => Transition::Apply(StateChange {
                status: Some(VideoStatus::Processing),
                processing_status: Some(ProcessingStatus::InProgress),
                ..StateChange::default()
            }),
            (VideoStatus::Uploading, ProcessingStatus::InProgress) => {
                Transition::Apply(StateChange {
                    status: Some(VideoStatus::Processing),
                    ..StateChange::default()
                })
            }
            (VideoStatus::Processing, ProcessingStatus::Pending) => Transition::Apply(StateChange {
                processing_status: Some(ProcessingStatus::InProgress),
                ..StateChange::default()
            }),
            _ => Transition::Noop,
        },
        LifecycleEvent::ProviderSucceeded => match status {
            VideoStatus::Uploading | VideoStatus::Processing => Transition::Apply(StateChange {
                status: Some(VideoStatus::ReadyToPublish),
                processing_status: Some(ProcessingStatus::Completed),
                ..StateChange::default()
            }),
            _ => Transition::Noop,
        },
        LifecycleEvent::ProviderFailed(error) => match status {
            VideoStatus::Uploading | VideoStatus::Processing => Transition::Apply(StateChange {
                status: Some(VideoStatus::ProcessingFailed),
                processing_status: Some(ProcessingStatus::Failed),
                processing_error: Some((*error).to_string()),
                ..StateChange::default()
            }),
            _ => Transition::Noop,
        },
        LifecycleEvent::Publish => match status {
            VideoStatus::ReadyToPublish | VideoStatus::Unpublished => {
                Transition::Apply(StateChange {
                    status: Some(VideoStatus::Published),
                    set_published_at: true,
                    ..StateChange::default()
                })
            }
            VideoStatus::Published => Transition::Reject("Video is already published"),
            VideoStatus::Uploading | VideoStatus::Processing => {
                Transition::Reject("Video is still being processed")
            }
            VideoStatus::ProcessingFailed => Transition::Reject("Video processing failed"),
        },
        LifecycleEvent::Unpublish(reason) => match status {
            VideoStatus::Published => Transition::Apply(StateChange {
                status: Some(VideoStatus::Unpublished),
                unpublish_reason: reason.map(|r| r.to_string()),
                ..StateChange::default()
            }),
            _ => Transition::Reject("Video is not currently published"),
        },
    }
}

#[derive(Debug)]
pub enum ApplyOutcome {
    Applied(VideoRecord),
    Noop,
    LostRace,
}

#[derive(Clone)]
pub struct LifecycleService {
    videos: Arc<dyn VideoStore>,
    events: Arc<dyn EventPublisher>,
}

impl LifecycleService {
    pub fn new(videos: Arc<dyn VideoStore>, events: Arc<dyn EventPublisher>) -> Self {
        LifecycleService { videos, events }
    }

    /// Registers a freshly uploaded video in Uploading/Pending, keyed
    /// by the provider public id that later webhooks will carry.
    pub async fn register(&self, request: RegisterVideoRequest) -> Result<VideoRecord> {
        if self
            .videos
            .get_by_public_id(&request.provider_public_id)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest(
                "A video with this provider public id already exists".to_string(),
            ));
        }

        let video = self
            .videos
            .insert(NewVideo {
                creator_id: request.creator_id,
                title: request.title,
                description: request.description,
                provider_public_id: request.provider_public_id,
                tags: request.tags.unwrap_or_default(),
            })
            .await?;

        info!(video_id = %video.id, "Registered video for processing");
        Ok(video)
    }

    pub async fn get(&self, video_id: Uuid) -> Result<VideoRecord> {
        self.videos
            .get(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))
    }

    pub async fn publish(&self, video_id: Uuid) -> Result<VideoRecord> {
        self.run_command(video_id, LifecycleEvent::Publish).await
    }

    pub async fn unpublish(&self, video_id: Uuid, reason: Option<String>) -> Result<VideoRecord> {
        self.run_command(video_id, LifecycleEvent::Unpublish(reason.as_deref()))
            .await
    }

    pub async fn republish(&self, video_id: Uuid) -> Result<VideoRecord> {
        self.run_command(video_id, LifecycleEvent::Publish).await
    }

    /// Applies one event against the record as read. The store update
    /// is compare-and-set on (status, processing_status), so a
    /// concurrent writer surfaces as LostRace rather than a clobbered
    /// transition.
    pub async fn apply_event(
        &self,
        video: &VideoRecord,
        event: &LifecycleEvent<'_>,
    ) -> Result<ApplyOutcome> {
        let status = video.get_status();
        let processing = video.get_processing_status();

        match next_state(status, processing, event) {
            Transition::Noop => Ok(ApplyOutcome::Noop),
            Transition::Reject(reason) => Err(AppError::InvalidState(reason.to_string())),
            Transition::Apply(mut change) => {
                if matches!(event, LifecycleEvent::Publish)
                    && video.get_trading_symbols().is_empty()
                {
                    change.trading_symbols =
                        Some(symbols::derive_symbols(&video.symbol_source_text()));
                }

                match self
                    .videos
                    .apply_state(video.id, (status, processing), &change)
                    .await?
                {
                    Some(updated) => {
                        self.emit(event, &updated).await;
                        Ok(ApplyOutcome::Applied(updated))
                    }
                    None => Ok(ApplyOutcome::LostRace),
                }
            }
        }
    }

    async fn run_command(&self, video_id: Uuid, event: LifecycleEvent<'_>) -> Result<VideoRecord> {
        for _ in 0..MAX_STATE_RETRIES {
            let video = self.get(video_id).await?;
            match self.apply_event(&video, &event).await? {
                ApplyOutcome::Applied(updated) => return Ok(updated),
                ApplyOutcome::Noop => return Ok(video),
                ApplyOutcome::LostRace => continue,
            }
        }
        Err(AppError::Internal(
            "Video state changed concurrently too many times".to_string(),
        ))
    }

    async fn emit(&self, event: &LifecycleEvent<'_>, updated: &VideoRecord) {
        let domain_event = match event {
            LifecycleEvent::ProviderInProgress => None,
            LifecycleEvent::ProviderSucceeded => Some(VideoEvent::Processed {
                video_id: updated.id,
                creator_id: updated.creator_id,
            }),
            LifecycleEvent::ProviderFailed(error) => Some(VideoEvent::ProcessingFailed {
                video_id: updated.id,
                creator_id: updated.creator_id,
                error: (*error).to_string(),
            }),
            LifecycleEvent::Publish => Some(VideoEvent::Published {
                video_id: updated.id,
                creator_id: updated.creator_id,
                trading_symbols: updated.get_trading_symbols(),
            }),
            LifecycleEvent::Unpublish(reason) => Some(VideoEvent::Unpublished {
                video_id: updated.id,
                creator_id: updated.creator_id,
                reason: reason.map(|r| r.to_string()),
            }),
        };

        if let Some(domain_event) = domain_event {
            if let Err(e) = self.events.publish(&domain_event).await {
                warn!(
                    video_id = %updated.id,
                    "Failed to publish {} event: {}",
                    domain_event.event_type(),
                    e
                );
            }
        }
    }
}
