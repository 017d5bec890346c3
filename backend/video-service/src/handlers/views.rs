use actix_web::{web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::error::AppError;
use crate::metrics::helpers;
use crate::models::{CompleteViewRequest, StartViewRequest, UpdateViewRequest};
use crate::services::view_tracker::ViewTracker;

pub async fn start_view(
    tracker: web::Data<ViewTracker>,
    request: web::Json<StartViewRequest>,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = request.validate() {
        helpers::track_view_operation("start", "invalid");
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error_message": errors.to_string(),
        })));
    }

    match tracker.start(request.into_inner()).await {
        Ok(started) => {
            helpers::track_view_operation("start", "ok");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "session_id": started.session_id,
                "duration_seconds": started.duration_seconds,
            })))
        }
        Err(AppError::NotFound(message)) => {
            helpers::track_view_operation("start", "not_found");
            Ok(HttpResponse::NotFound().json(json!({
                "success": false,
                "error_message": message,
            })))
        }
        Err(AppError::Validation(message)) => {
            helpers::track_view_operation("start", "invalid");
            Ok(HttpResponse::BadRequest().json(json!({
                "success": false,
                "error_message": message,
            })))
        }
        Err(AppError::RateLimitExceeded) => {
            helpers::track_view_operation("start", "throttled");
            Ok(HttpResponse::TooManyRequests().json(json!({
                "success": false,
                "error_message": "Too many view sessions started from this client",
            })))
        }
        Err(e) => {
            helpers::track_view_operation("start", "error");
            Err(e)
        }
    }
}

/// Expired sessions come back as success:false with a dedicated flag,
/// telling the client to start a new session rather than retry.
pub async fn update_view(
    tracker: web::Data<ViewTracker>,
    request: web::Json<UpdateViewRequest>,
) -> Result<HttpResponse, AppError> {
    match tracker.update(request.into_inner()).await {
        Ok(_) => {
            helpers::track_view_operation("update", "ok");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "session_expired": false,
            })))
        }
        Err(AppError::SessionExpired) => {
            helpers::track_view_operation("update", "expired");
            Ok(HttpResponse::Ok().json(json!({
                "success": false,
                "session_expired": true,
                "error_message": "View session expired; start a new session",
            })))
        }
        Err(AppError::InvalidState(message)) => {
            helpers::track_view_operation("update", "closed");
            Ok(HttpResponse::Ok().json(json!({
                "success": false,
                "session_expired": false,
                "error_message": message,
            })))
        }
        Err(AppError::NotFound(message)) => {
            helpers::track_view_operation("update", "not_found");
            Ok(HttpResponse::NotFound().json(json!({
                "success": false,
                "error_message": message,
            })))
        }
        Err(e) => {
            helpers::track_view_operation("update", "error");
            Err(e)
        }
    }
}

pub async fn complete_view(
    tracker: web::Data<ViewTracker>,
    request: web::Json<CompleteViewRequest>,
) -> Result<HttpResponse, AppError> {
    match tracker.complete(request.into_inner()).await {
        Ok(summary) => {
            helpers::track_view_operation("complete", "ok");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "summary": summary,
            })))
        }
        Err(AppError::NotFound(message)) => {
            helpers::track_view_operation("complete", "not_found");
            Ok(HttpResponse::NotFound().json(json!({
                "success": false,
                "error_message": message,
            })))
        }
        Err(AppError::SessionExpired) => {
            helpers::track_view_operation("complete", "expired");
            Ok(HttpResponse::Gone().json(json!({
                "success": false,
                "error_message": "View session expired; nothing to finalize",
            })))
        }
        Err(e) => {
            helpers::track_view_operation("complete", "error");
            Err(e)
        }
    }
}
