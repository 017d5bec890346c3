use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::metrics::helpers;
use crate::models::{RegisterVideoRequest, UnpublishRequest, VideoResponse};
use crate::services::lifecycle::LifecycleService;

fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid video id".to_string()))
}

pub async fn register_video(
    lifecycle: web::Data<LifecycleService>,
    request: web::Json<RegisterVideoRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let video = lifecycle.register(request.into_inner()).await?;
    helpers::track_lifecycle_transition("register", "ok");

    Ok(HttpResponse::Created().json(VideoResponse::from(video)))
}

pub async fn get_video(
    lifecycle: web::Data<LifecycleService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let video_id = parse_video_id(&path)?;
    let video = lifecycle.get(video_id).await?;

    Ok(HttpResponse::Ok().json(VideoResponse::from(video)))
}

pub async fn publish_video(
    lifecycle: web::Data<LifecycleService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let video_id = parse_video_id(&path)?;

    match lifecycle.publish(video_id).await {
        Ok(video) => {
            helpers::track_lifecycle_transition("publish", "ok");
            Ok(HttpResponse::Ok().json(VideoResponse::from(video)))
        }
        Err(e) => {
            helpers::track_lifecycle_transition("publish", "rejected");
            Err(e)
        }
    }
}

pub async fn unpublish_video(
    lifecycle: web::Data<LifecycleService>,
    path: web::Path<String>,
    body: Option<web::Json<UnpublishRequest>>,
) -> Result<HttpResponse, AppError> {
    let video_id = parse_video_id(&path)?;
    let reason = body.and_then(|body| body.into_inner().reason);

    match lifecycle.unpublish(video_id, reason).await {
        Ok(video) => {
            helpers::track_lifecycle_transition("unpublish", "ok");
            Ok(HttpResponse::Ok().json(VideoResponse::from(video)))
        }
        Err(e) => {
            helpers::track_lifecycle_transition("unpublish", "rejected");
            Err(e)
        }
    }
}

pub async fn republish_video(
    lifecycle: web::Data<LifecycleService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let video_id = parse_video_id(&path)?;

    match lifecycle.republish(video_id).await {
        Ok(video) => {
            helpers::track_lifecycle_transition("republish", "ok");
            Ok(HttpResponse::Ok().json(VideoResponse::from(video)))
        }
        Err(e) => {
            helpers::track_lifecycle_transition("republish", "rejected");
            Err(e)
        }
    }
}
