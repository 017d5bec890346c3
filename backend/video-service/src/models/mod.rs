pub mod event;
pub mod session;
pub mod video;
pub mod webhook;

pub use event::VideoEvent;
pub use session::{
    CompleteViewRequest, NewSession, SessionClose, SessionProgress, SessionState,
    StartViewRequest, UpdateViewRequest, ViewSession, ViewSummary, ViewerIdentity,
};
pub use video::{
    AssetMetadata, NewVideo, ProcessingStatus, RegisterVideoRequest, UnpublishRequest,
    VideoRecord, VideoResponse, VideoStatus,
};
pub use webhook::{NotificationKind, ProviderNotification, ProviderStatus};
