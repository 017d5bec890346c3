use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::Result;

/// Start-rate check keyed on a client fingerprint, so one device in a
/// tight loop cannot inflate view counts.
#[async_trait]
pub trait ViewThrottle: Send + Sync {
    async fn should_throttle(&self, fingerprint: &str) -> Result<bool>;
}

/// Hashes the (ip, user agent, viewer) tuple so raw client details
/// never become storage keys.
pub fn client_fingerprint(ip: Option<&str>, user_agent: Option<&str>, viewer_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(viewer_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct RedisViewThrottle {
    redis: ConnectionManager,
    max_starts: u32,
    window_secs: u64,
}

impl RedisViewThrottle {
    pub fn new(redis: ConnectionManager, max_starts: u32, window_secs: u64) -> Self {
        Self {
            redis,
            max_starts,
            window_secs,
        }
    }
}

#[async_trait]
impl ViewThrottle for RedisViewThrottle {
    async fn should_throttle(&self, fingerprint: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        let key = format!("view_throttle:{}", fingerprint);

        // Fails open on Redis errors.
        let count: u32 = match conn.get::<_, Option<u32>>(&key).await {
            Ok(value) => value.unwrap_or(0),
            Err(e) => {
                warn!("View throttle lookup failed: {}", e);
                return Ok(false);
            }
        };

        if count >= self.max_starts {
            return Ok(true);
        }

        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, count + 1, self.window_secs)
            .await
        {
            warn!("View throttle update failed: {}", e);
        }

        Ok(false)
    }
}
