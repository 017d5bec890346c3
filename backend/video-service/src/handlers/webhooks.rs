use std::time::Instant;

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::AppError;
use crate::metrics::helpers;
use crate::models::ProviderNotification;
use crate::services::webhooks::WebhookProcessor;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Provider callback endpoint. Signature failures are 401, unparseable
/// bodies 400; everything the processor handles, including no-ops and
/// unknown records, is acknowledged with 200 so the provider stops
/// redelivering.
pub async fn provider_webhook(
    req: HttpRequest,
    body: web::Bytes,
    processor: web::Data<WebhookProcessor>,
) -> Result<HttpResponse, AppError> {
    let started = Instant::now();

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    processor.verify_signature(&body, signature)?;

    let notification: ProviderNotification = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Unparseable webhook body: {}", e)))?;

    let notification_type = notification.notification_type.clone();
    let outcome = processor.process(&notification).await?;

    helpers::track_webhook_notification(&notification_type, outcome.as_str());
    helpers::observe_webhook_duration(&notification_type, started.elapsed().as_secs_f64());

    Ok(HttpResponse::Ok().json(json!({
        "received": true,
        "outcome": outcome.as_str(),
    })))
}
