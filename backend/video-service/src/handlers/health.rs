use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use redis::aio::ConnectionManager;
use serde_json::json;
use sqlx::PgPool;

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "video-service",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn readiness_check(
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
) -> impl Responder {
    let database_ready = sqlx::query("SELECT 1").execute(pool.get_ref()).await.is_ok();

    let mut redis_conn = redis.get_ref().clone();
    let redis_ready = redis::cmd("PING")
        .query_async::<_, String>(&mut redis_conn)
        .await
        .is_ok();

    let body = json!({
        "status": if database_ready && redis_ready { "ready" } else { "not_ready" },
        "database": database_ready,
        "redis": redis_ready,
    });

    if database_ready && redis_ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
