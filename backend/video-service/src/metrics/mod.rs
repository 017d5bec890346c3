use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref WEBHOOK_NOTIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "webhook_notifications_total",
            "Provider webhook notifications by type and outcome"
        ),
        &["notification_type", "outcome"]
    )
    .expect("metric can be created");

    pub static ref WEBHOOK_PROCESSING_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "webhook_processing_duration_seconds",
            "Time spent processing a provider webhook"
        ),
        &["notification_type"]
    )
    .expect("metric can be created");

    pub static ref VIDEO_LIFECYCLE_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "video_lifecycle_transitions_total",
            "Lifecycle events by outcome"
        ),
        &["event", "outcome"]
    )
    .expect("metric can be created");

    pub static ref VIEW_SESSION_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "view_session_operations_total",
            "View session operations by outcome"
        ),
        &["operation", "outcome"]
    )
    .expect("metric can be created");
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(WEBHOOK_NOTIFICATIONS_TOTAL.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(WEBHOOK_PROCESSING_DURATION_SECONDS.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(VIDEO_LIFECYCLE_TRANSITIONS_TOTAL.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(VIEW_SESSION_OPERATIONS_TOTAL.clone()))
        .expect("collector can be registered");
}

pub fn gather_metrics() -> String {
    use prometheus::Encoder;

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

pub mod helpers {
    use super::*;

    pub fn track_webhook_notification(notification_type: &str, outcome: &str) {
        WEBHOOK_NOTIFICATIONS_TOTAL
            .with_label_values(&[notification_type, outcome])
            .inc();
    }

    pub fn observe_webhook_duration(notification_type: &str, seconds: f64) {
        WEBHOOK_PROCESSING_DURATION_SECONDS
            .with_label_values(&[notification_type])
            .observe(seconds);
    }

    pub fn track_lifecycle_transition(event: &str, outcome: &str) {
        VIDEO_LIFECYCLE_TRANSITIONS_TOTAL
            .with_label_values(&[event, outcome])
            .inc();
    }

    pub fn track_view_operation(operation: &str, outcome: &str) {
        VIEW_SESSION_OPERATIONS_TOTAL
            .with_label_values(&[operation, outcome])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_gather() {
        init_metrics();
        helpers::track_webhook_notification("video_processing", "applied");
        helpers::track_view_operation("start", "ok");

        let output = gather_metrics();
        assert!(output.contains("webhook_notifications_total"));
        assert!(output.contains("view_session_operations_total"));
    }
}
