use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::models::VideoEvent;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &VideoEvent) -> Result<()>;
}

/// Kafka-backed publisher. Events are keyed by video id so consumers
/// see one video's events in order.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEventPublisher {
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.timeout.ms", "5000")
            .set("queue.buffering.max.messages", "100000")
            .set("compression.type", "lz4")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &VideoEvent) -> Result<()> {
        let key = event.video_id().to_string();
        let payload = event.to_payload().to_string();

        let delivery = tokio::time::timeout(
            DELIVERY_TIMEOUT,
            self.producer.send(
                FutureRecord::to(&self.topic).payload(&payload).key(&key),
                Duration::from_secs(0),
            ),
        )
        .await;

        match delivery {
            Ok(Ok(_)) => Ok(()),
            Ok(Err((e, _))) => {
                error!("Failed to deliver {} event: {}", event.event_type(), e);
                Err(e.into())
            }
            Err(_) => {
                error!("Timed out delivering {} event", event.event_type());
                Err(AppError::Internal(
                    "Kafka delivery timed out".to_string(),
                ))
            }
        }
    }
}

/// Used when no Kafka brokers are configured, typically local
/// development.
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: &VideoEvent) -> Result<()> {
        info!(
            event_type = event.event_type(),
            payload = %event.to_payload(),
            "Video event"
        );
        Ok(())
    }
}
