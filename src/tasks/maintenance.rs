use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::metrics::DeliveryMetrics;
use crate::queue::DeliveryQueue;
use crate::ratelimit::ApiKeyRateLimiter;

/// Idle rate limit buckets older than this are dropped
const BUCKET_TTL: Duration = Duration::from_secs(600);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
const QUEUE_GAUGE_INTERVAL: Duration = Duration::from_secs(15);

/// Periodic housekeeping: expires idle rate limit buckets and samples queue depth.
pub struct MaintenanceTask {
    rate_limiter: Arc<ApiKeyRateLimiter>,
    queue: Arc<dyn DeliveryQueue>,
    shutdown: broadcast::Receiver<()>,
}

impl MaintenanceTask {
    pub fn new(
        rate_limiter: Arc<ApiKeyRateLimiter>,
        queue: Arc<dyn DeliveryQueue>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            rate_limiter,
            queue,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut cleanup_timer = tokio::time::interval(CLEANUP_INTERVAL);
        let mut gauge_timer = tokio::time::interval(QUEUE_GAUGE_INTERVAL);

        // Skip immediate first tick
        cleanup_timer.tick().await;

        tracing::info!(
            cleanup_interval_secs = CLEANUP_INTERVAL.as_secs(),
            "Maintenance task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Maintenance task received shutdown signal");
                    break;
                }
                _ = cleanup_timer.tick() => {
                    self.rate_limiter.cleanup_stale(BUCKET_TTL);
                }
                _ = gauge_timer.tick() => {
                    self.sample_queue_depth().await;
                }
            }
        }

        tracing::info!("Maintenance task stopped");
    }

    async fn sample_queue_depth(&self) {
        match self.queue.len().await {
            Ok(depth) => DeliveryMetrics::set_queue_depth(depth),
            Err(e) => tracing::debug!(error = %e, "Failed to sample queue depth"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryDeliveryQueue;

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let task = MaintenanceTask::new(
            Arc::new(ApiKeyRateLimiter::new()),
            Arc::new(MemoryDeliveryQueue::new()),
            rx,
        );

        let handle = tokio::spawn(task.run());
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should stop")
            .unwrap();
    }
}
