use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use video_service::config::Config;
use video_service::db::{self, PgSessionStore, PgVideoStore, SessionStore, VideoStore};
use video_service::metrics::init_metrics;
use video_service::routes::configure_routes;
use video_service::services::engagement::EngagementAggregator;
use video_service::services::events::{EventPublisher, KafkaEventPublisher, LogEventPublisher};
use video_service::services::lifecycle::LifecycleService;
use video_service::services::throttle::{RedisViewThrottle, ViewThrottle};
use video_service::services::view_tracker::ViewTracker;
use video_service::services::webhooks::WebhookProcessor;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("Failed to load configuration");

    init_metrics();

    let pool = db::create_pool(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let redis_client =
        redis::Client::open(config.redis.url.as_str()).expect("Failed to create Redis client");
    let redis_manager = redis::aio::ConnectionManager::new(redis_client)
        .await
        .expect("Failed to connect to Redis");

    let events: Arc<dyn EventPublisher> = match &config.kafka.brokers {
        Some(brokers) => Arc::new(
            KafkaEventPublisher::new(brokers, &config.kafka.topic)
                .expect("Failed to create Kafka producer"),
        ),
        None => {
            tracing::warn!("KAFKA_BROKERS not set; video events will only be logged");
            Arc::new(LogEventPublisher)
        }
    };

    let videos: Arc<dyn VideoStore> = Arc::new(PgVideoStore::new(pool.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool.clone()));
    let throttle: Arc<dyn ViewThrottle> = Arc::new(RedisViewThrottle::new(
        redis_manager.clone(),
        config.view.throttle_max_starts,
        config.view.throttle_window_secs,
    ));

    let aggregator = EngagementAggregator::new(
        videos.clone(),
        sessions.clone(),
        config.view.avg_watch_window_days,
        config.view.avg_watch_max_samples,
    );
    let lifecycle = LifecycleService::new(videos.clone(), events.clone());
    let webhook_processor = WebhookProcessor::new(
        videos.clone(),
        lifecycle.clone(),
        config.webhook.provider_secret.clone(),
    );
    let view_tracker = ViewTracker::new(
        videos,
        sessions,
        throttle,
        events,
        aggregator,
        config.view.clone(),
    );

    let host = config.app.host.clone();
    let port = config.app.port;
    let is_production = config.is_production();

    tracing::info!("Starting video-service on {}:{}", host, port);

    let lifecycle_data = web::Data::new(lifecycle);
    let processor_data = web::Data::new(webhook_processor);
    let tracker_data = web::Data::new(view_tracker);
    let pool_data = web::Data::new(pool);
    let redis_data = web::Data::new(redis_manager);

    HttpServer::new(move || {
        let cors = if is_production {
            Cors::default()
                .allowed_methods(vec!["GET", "POST"])
                .max_age(3600)
        } else {
            Cors::permissive()
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(lifecycle_data.clone())
            .app_data(processor_data.clone())
            .app_data(tracker_data.clone())
            .app_data(pool_data.clone())
            .app_data(redis_data.clone())
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await
}
