//! Redis list-backed delivery queue.
//!
//! Jobs are JSON documents pushed with `RPUSH` and popped with `BLPOP`, so they
//! survive service restarts and can be consumed by any instance. Delayed
//! retries sit in a sorted set scored by their due time in epoch milliseconds
//! and are moved onto the list by whichever consumer polls after they come due.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::RedisConfig;

use super::backend::{DeliveryQueue, EmailJob, QueueError};

pub struct RedisDeliveryQueue {
    /// Connection for RPUSH / LLEN
    producer: ConnectionManager,

    /// Dedicated connection for BLPOP, which holds its connection while waiting
    consumer: ConnectionManager,

    key: String,

    /// Sorted set holding delayed retries
    delayed_key: String,
}

/// Delayed jobs promoted per poll
const PROMOTE_BATCH: isize = 100;

impl RedisDeliveryQueue {
    /// Connect to Redis and use the list at `key`.
    pub async fn connect(config: &RedisConfig, key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(config.url.as_str())?;
        let producer = ConnectionManager::new(client.clone()).await?;
        let consumer = ConnectionManager::new(client).await?;
        let key = key.into();
        let delayed_key = format!("{}:delayed", key);

        tracing::info!(key = %key, delayed_key = %delayed_key, "Connected Redis delivery queue");

        Ok(Self {
            producer,
            consumer,
            key,
            delayed_key,
        })
    }

    /// Move due delayed jobs to the list. `ZREM` decides which instance wins a job.
    async fn promote_due(&self) -> Result<(), QueueError> {
        let mut conn = self.producer.clone();
        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore_limit(&self.delayed_key, "-inf", now, 0, PROMOTE_BATCH)
            .await?;

        for payload in due {
            let removed: i64 = conn.zrem(&self.delayed_key, &payload).await?;
            if removed == 1 {
                let _: i64 = conn.rpush(&self.key, &payload).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryQueue for RedisDeliveryQueue {
    async fn enqueue(&self, job: EmailJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&job)?;
        let mut conn = self.producer.clone();
        let _: i64 = conn.rpush(&self.key, payload).await?;

        tracing::debug!(
            send_record_id = %job.send_record_id,
            attempts = job.attempts,
            key = %self.key,
            "Job pushed to Redis queue"
        );

        Ok(())
    }

    async fn enqueue_delayed(&self, job: EmailJob, delay: Duration) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&job)?;
        let due_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let mut conn = self.producer.clone();
        let _: i64 = conn.zadd(&self.delayed_key, payload, due_at).await?;

        tracing::debug!(
            send_record_id = %job.send_record_id,
            attempts = job.attempts,
            delay_ms = delay.as_millis() as u64,
            "Retry parked in Redis delayed set"
        );

        Ok(())
    }

    async fn next_job(&self, timeout: Duration) -> Result<Option<EmailJob>, QueueError> {
        self.promote_due().await?;

        let mut conn = self.consumer.clone();
        let popped: Option<(String, String)> = conn.blpop(&self.key, timeout.as_secs_f64()).await?;

        match popped {
            Some((_, payload)) => match serde_json::from_str(&payload) {
                Ok(job) => Ok(Some(job)),
                Err(e) => {
                    tracing::error!(error = %e, key = %self.key, "Discarding malformed queue payload");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.producer.clone();
        let ready: usize = conn.llen(&self.key).await?;
        let delayed: usize = conn.zcard(&self.delayed_key).await?;
        Ok(ready + delayed)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
