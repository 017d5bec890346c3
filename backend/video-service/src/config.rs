use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub webhook: WebhookConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
    #[serde(default = "default_kafka_topic")]
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret for provider callback signatures. When unset,
    /// signature verification is skipped (local development only).
    pub provider_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
    #[serde(default = "default_throttle_max_starts")]
    pub throttle_max_starts: u32,
    #[serde(default = "default_throttle_window_secs")]
    pub throttle_window_secs: u64,
    #[serde(default = "default_avg_watch_sample_every")]
    pub avg_watch_sample_every: u64,
    #[serde(default = "default_avg_watch_window_days")]
    pub avg_watch_window_days: i64,
    #[serde(default = "default_avg_watch_max_samples")]
    pub avg_watch_max_samples: i64,
}

// Default value functions
fn default_env() -> String {
    "development".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_max_connections() -> u32 {
    10
}

fn default_kafka_topic() -> String {
    "video-events".to_string()
}

fn default_session_ttl_minutes() -> i64 {
    30
}

fn default_throttle_max_starts() -> u32 {
    10
}

fn default_throttle_window_secs() -> u64 {
    300
}

fn default_avg_watch_sample_every() -> u64 {
    20
}

fn default_avg_watch_window_days() -> i64 {
    7
}

fn default_avg_watch_max_samples() -> i64 {
    500
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| default_env()),
                host: env::var("APP_HOST").unwrap_or_else(|_| default_host()),
                port: env::var("APP_PORT")
                    .unwrap_or_else(|_| default_port().to_string())
                    .parse()
                    .unwrap_or(default_port()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| default_max_connections().to_string())
                    .parse()
                    .unwrap_or(default_max_connections()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            },
            kafka: KafkaConfig {
                brokers: env::var("KAFKA_BROKERS").ok(),
                topic: env::var("KAFKA_VIDEO_TOPIC").unwrap_or_else(|_| default_kafka_topic()),
            },
            webhook: WebhookConfig {
                provider_secret: env::var("PROVIDER_WEBHOOK_SECRET").ok(),
            },
            view: ViewConfig {
                session_ttl_minutes: env::var("VIEW_SESSION_TTL_MINUTES")
                    .unwrap_or_else(|_| default_session_ttl_minutes().to_string())
                    .parse()
                    .unwrap_or(default_session_ttl_minutes()),
                throttle_max_starts: env::var("VIEW_THROTTLE_MAX_STARTS")
                    .unwrap_or_else(|_| default_throttle_max_starts().to_string())
                    .parse()
                    .unwrap_or(default_throttle_max_starts()),
                throttle_window_secs: env::var("VIEW_THROTTLE_WINDOW_SECS")
                    .unwrap_or_else(|_| default_throttle_window_secs().to_string())
                    .parse()
                    .unwrap_or(default_throttle_window_secs()),
                avg_watch_sample_every: env::var("AVG_WATCH_SAMPLE_EVERY")
                    .unwrap_or_else(|_| default_avg_watch_sample_every().to_string())
                    .parse()
                    .unwrap_or(default_avg_watch_sample_every()),
                avg_watch_window_days: env::var("AVG_WATCH_WINDOW_DAYS")
                    .unwrap_or_else(|_| default_avg_watch_window_days().to_string())
                    .parse()
                    .unwrap_or(default_avg_watch_window_days()),
                avg_watch_max_samples: env::var("AVG_WATCH_MAX_SAMPLES")
                    .unwrap_or_else(|_| default_avg_watch_max_samples().to_string())
                    .parse()
                    .unwrap_or(default_avg_watch_max_samples()),
            },
        };

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }

    pub fn is_development(&self) -> bool {
        self.app.env == "development"
    }
}
