//! Delivery queue factory

use std::sync::Arc;

use crate::config::{QueueConfig, RedisConfig};

use super::backend::DeliveryQueue;
use super::memory_backend::MemoryDeliveryQueue;
use super::redis_backend::RedisDeliveryQueue;

/// Create a delivery queue based on configuration.
///
/// - `"redis"`: a `RedisDeliveryQueue` on the configured list key; falls back to
///   memory when Redis is unreachable
/// - `"memory"` (default): a `MemoryDeliveryQueue`
pub async fn create_delivery_queue(
    settings: &QueueConfig,
    redis: &RedisConfig,
) -> Arc<dyn DeliveryQueue> {
    match settings.backend.as_str() {
        "redis" => match RedisDeliveryQueue::connect(redis, settings.key.clone()).await {
            Ok(queue) => {
                tracing::info!(backend = "redis", key = %settings.key, "Creating Redis delivery queue");
                Arc::new(queue)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Redis queue requested but connection failed, falling back to memory"
                );
                Arc::new(MemoryDeliveryQueue::new())
            }
        },
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory delivery queue");
            Arc::new(MemoryDeliveryQueue::new())
        }
        other => {
            tracing::warn!(backend = %other, "Unknown queue backend, using memory");
            Arc::new(MemoryDeliveryQueue::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_by_default() {
        let queue = create_delivery_queue(&QueueConfig::default(), &RedisConfig::default()).await;
        assert_eq!(queue.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unknown_backend_falls_back() {
        let settings = QueueConfig {
            backend: "kafka".to_string(),
            ..Default::default()
        };
        let queue = create_delivery_queue(&settings, &RedisConfig::default()).await;
        assert_eq!(queue.backend_name(), "memory");
    }
}
