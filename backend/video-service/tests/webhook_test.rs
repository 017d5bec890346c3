mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use common::{video_fixture, CaptureEvents, MemoryVideoStore};
use video_service::handlers::webhooks::{provider_webhook, SIGNATURE_HEADER};
use video_service::models::{ProcessingStatus, ProviderNotification, VideoEvent, VideoStatus};
use video_service::services::lifecycle::LifecycleService;
use video_service::services::webhooks::{WebhookOutcome, WebhookProcessor};

struct Harness {
    videos: Arc<MemoryVideoStore>,
    events: Arc<CaptureEvents>,
    processor: WebhookProcessor,
}

fn harness(secret: Option<&str>) -> Harness {
    let videos = Arc::new(MemoryVideoStore::new());
    let events = Arc::new(CaptureEvents::new());
    let lifecycle = LifecycleService::new(videos.clone(), events.clone());
    let processor = WebhookProcessor::new(
        videos.clone(),
        lifecycle,
        secret.map(|s| s.to_string()),
    );
    Harness {
        videos,
        events,
        processor,
    }
}

fn notification(body: serde_json::Value) -> ProviderNotification {
    serde_json::from_value(body).unwrap()
}

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[actix_rt::test]
async fn test_processing_success_promotes_and_merges_metadata() {
    let h = harness(None);
    let mut video = video_fixture(VideoStatus::Processing, ProcessingStatus::InProgress);
    video.provider_public_id = "vid_success".to_string();
    h.videos.seed(video.clone()).await;

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_success",
            "status": "success",
            "secureUrl": "https://cdn.example.com/vid_success.mp4",
            "thumbnailUrl": "https://cdn.example.com/vid_success.jpg",
            "duration": 94.6,
            "bytes": 10485760
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied);

    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::ReadyToPublish);
    assert_eq!(stored.get_processing_status(), ProcessingStatus::Completed);
    assert_eq!(
        stored.asset_url.as_deref(),
        Some("https://cdn.example.com/vid_success.mp4")
    );
    assert_eq!(stored.duration_seconds, 95);
    assert_eq!(stored.file_size_bytes, Some(10485760));

    let recorded = h.events.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert!(matches!(recorded[0], VideoEvent::Processed { .. }));
}

#[actix_rt::test]
async fn test_redelivered_success_is_noop() {
    let h = harness(None);
    let mut video = video_fixture(VideoStatus::Processing, ProcessingStatus::InProgress);
    video.provider_public_id = "vid_redelivered".to_string();
    h.videos.seed(video.clone()).await;

    let body = json!({
        "notificationType": "video_processing",
        "publicId": "vid_redelivered",
        "status": "success"
    });

    let first = h.processor.process(&notification(body.clone())).await.unwrap();
    assert_eq!(first, WebhookOutcome::Applied);
    let after_first = h.videos.snapshot(video.id).await.unwrap();

    let second = h.processor.process(&notification(body)).await.unwrap();
    assert_eq!(second, WebhookOutcome::Noop);

    let after_second = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(after_second.get_status(), VideoStatus::ReadyToPublish);
    assert_eq!(
        after_second.last_status_change,
        after_first.last_status_change
    );
    assert_eq!(h.events.recorded().await.len(), 1);
}

#[actix_rt::test]
async fn test_unknown_public_id_acknowledged_without_action() {
    let h = harness(None);

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_never_registered",
            "status": "success"
        })))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::UnknownVideo);
    assert!(h.events.recorded().await.is_empty());
}

#[actix_rt::test]
async fn test_unrecognized_notification_type_ignored() {
    let h = harness(None);
    let mut video = video_fixture(VideoStatus::Processing, ProcessingStatus::InProgress);
    video.provider_public_id = "vid_moderated".to_string();
    h.videos.seed(video.clone()).await;

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "moderation",
            "publicId": "vid_moderated",
            "status": "flagged"
        })))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::Ignored);
    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::Processing);
    assert_eq!(stored.last_status_change, video.last_status_change);
}

#[actix_rt::test]
async fn test_in_progress_promotes_upload_without_event() {
    let h = harness(None);
    let mut video = video_fixture(VideoStatus::Uploading, ProcessingStatus::Pending);
    video.provider_public_id = "vid_progress".to_string();
    h.videos.seed(video.clone()).await;

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_progress",
            "status": "in_progress"
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied);

    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::Processing);
    assert_eq!(stored.get_processing_status(), ProcessingStatus::InProgress);
    assert!(h.events.recorded().await.is_empty());

    // Progress on an upload notification carries nothing actionable.
    let mut raw_upload = video_fixture(VideoStatus::Uploading, ProcessingStatus::Pending);
    raw_upload.provider_public_id = "vid_raw_upload".to_string();
    h.videos.seed(raw_upload.clone()).await;

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "upload",
            "publicId": "vid_raw_upload",
            "status": "in_progress"
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Noop);

    let stored = h.videos.snapshot(raw_upload.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::Uploading);
}

#[actix_rt::test]
async fn test_out_of_order_delivery_converges() {
    let h = harness(None);
    let mut video = video_fixture(VideoStatus::Uploading, ProcessingStatus::Pending);
    video.provider_public_id = "vid_out_of_order".to_string();
    h.videos.seed(video.clone()).await;

    // Success lands before the in_progress notification it overtook.
    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_out_of_order",
            "status": "success"
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied);

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_out_of_order",
            "status": "in_progress"
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Noop);

    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::ReadyToPublish);
    assert_eq!(stored.get_processing_status(), ProcessingStatus::Completed);
    assert_eq!(h.events.recorded().await.len(), 1);
}

#[actix_rt::test]
async fn test_failure_records_error_and_sticks() {
    let h = harness(None);
    let mut video = video_fixture(VideoStatus::Processing, ProcessingStatus::InProgress);
    video.provider_public_id = "vid_failed".to_string();
    h.videos.seed(video.clone()).await;

    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_failed",
            "status": "error",
            "errorMessage": "Transcode timed out"
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied);

    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::ProcessingFailed);
    assert_eq!(stored.processing_error.as_deref(), Some("Transcode timed out"));

    let recorded = h.events.recorded().await;
    assert_eq!(recorded.len(), 1);
    match &recorded[0] {
        VideoEvent::ProcessingFailed { error, .. } => assert_eq!(error, "Transcode timed out"),
        other => panic!("expected processing failed event, got {:?}", other),
    }

    // A success that straggles in after the failure must not revive it.
    let outcome = h
        .processor
        .process(&notification(json!({
            "notificationType": "video_processing",
            "publicId": "vid_failed",
            "status": "success"
        })))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::Noop);

    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::ProcessingFailed);
}

#[actix_rt::test]
async fn test_webhook_endpoint_verifies_signature() {
    let h = harness(Some("testsecret"));
    let mut video = video_fixture(VideoStatus::Processing, ProcessingStatus::InProgress);
    video.provider_public_id = "vid_http".to_string();
    h.videos.seed(video.clone()).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(h.processor))
            .route("/api/v1/webhooks/provider", web::post().to(provider_webhook)),
    )
    .await;

    let body = json!({
        "notificationType": "video_processing",
        "publicId": "vid_http",
        "status": "success"
    })
    .to_string();

    // Correct signature is acknowledged with the applied outcome.
    let req = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .insert_header((SIGNATURE_HEADER, sign("testsecret", body.as_bytes())))
        .set_payload(body.clone())
        .to_request();
    let response: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(response["received"], true);
    assert_eq!(response["outcome"], "applied");

    // Wrong secret fails closed.
    let req = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .insert_header((SIGNATURE_HEADER, sign("wrongsecret", body.as_bytes())))
        .set_payload(body.clone())
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Missing header fails closed.
    let req = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .set_payload(body)
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A signed but unparseable body is a client error.
    let garbage = "not json at all";
    let req = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .insert_header((SIGNATURE_HEADER, sign("testsecret", garbage.as_bytes())))
        .set_payload(garbage)
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = h.videos.snapshot(video.id).await.unwrap();
    assert_eq!(stored.get_status(), VideoStatus::ReadyToPublish);
}
