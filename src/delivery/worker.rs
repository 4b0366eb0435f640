//! Background worker that drains the delivery queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, Semaphore};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::email::SendRecordRepository;
use crate::error::AppError;
use crate::metrics::DeliveryMetrics;
use crate::queue::{BackoffConfig, DeliveryQueue, EmailJob, ExponentialBackoff};

use super::provider::{EmailProvider, OutboundEmail};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Total attempts per job, the first included
    pub max_attempts: u32,
    /// Jobs processed at the same time
    pub concurrency: usize,
    /// How long one queue poll waits for a job
    pub poll_timeout: Duration,
    /// Delay schedule between attempts
    pub backoff: BackoffConfig,
}

impl WorkerConfig {
    pub fn from_queue(config: &QueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            concurrency: config.concurrency.max(1),
            poll_timeout: Duration::from_secs(config.poll_timeout_seconds.max(1)),
            backoff: BackoffConfig::from_queue(config),
        }
    }
}

/// What happened to one job
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Provider accepted the message
    Sent { external_id: String },
    /// Attempt failed; the job is parked on the queue until `delay` has passed
    Retrying { attempt: u32, delay: Duration },
    /// Last attempt failed; the record is marked failed
    Failed { error: String },
    /// Record missing or already finished
    Skipped,
}

/// Pops jobs, calls the provider and records the outcome on the send record.
#[derive(Clone)]
pub struct DeliveryWorker {
    queue: Arc<dyn DeliveryQueue>,
    records: Arc<dyn SendRecordRepository>,
    provider: Arc<dyn EmailProvider>,
    config: WorkerConfig,
}

impl DeliveryWorker {
    pub fn new(
        queue: Arc<dyn DeliveryQueue>,
        records: Arc<dyn SendRecordRepository>,
        provider: Arc<dyn EmailProvider>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            records,
            provider,
            config,
        }
    }

    /// Run until a shutdown signal arrives, then wait for in-flight jobs.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut reconnect = ExponentialBackoff::with_config(BackoffConfig {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            ..Default::default()
        });

        tracing::info!(
            provider = self.provider.name(),
            queue = self.queue.backend_name(),
            concurrency = self.config.concurrency,
            max_attempts = self.config.max_attempts,
            "Delivery worker started"
        );

        loop {
            // Checked between polls so a popped job is never abandoned
            if !matches!(
                shutdown.try_recv(),
                Err(broadcast::error::TryRecvError::Empty)
            ) {
                break;
            }

            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            match self.queue.next_job(self.config.poll_timeout).await {
                Ok(Some(job)) => {
                    reconnect.reset();
                    let worker = self.clone();
                    tokio::spawn(async move {
                        worker.process(job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    if let Ok(depth) = self.queue.len().await {
                        DeliveryMetrics::set_queue_depth(depth);
                    }
                }
                Err(e) => {
                    let delay = reconnect.next_delay();
                    tracing::error!(
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to poll delivery queue"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => break,
                    }
                }
            }
        }

        let _ = permits.acquire_many(self.config.concurrency as u32).await;
        tracing::info!("Delivery worker stopped");
    }

    /// Deliver one job and record the result.
    #[tracing::instrument(
        name = "delivery.process",
        skip(self, job),
        fields(send_record_id = %job.send_record_id, attempt = job.attempts + 1)
    )]
    pub async fn process(&self, job: EmailJob) -> DeliveryOutcome {
        let attempt = job.attempts + 1;
        let id = job.send_record_id;

        match self.records.mark_pending(id, attempt).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("Send record missing or already finished, dropping job");
                return DeliveryOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to mark send record pending");
                return self.retry_or_fail(job, attempt, e.to_string()).await;
            }
        }

        let started = Instant::now();
        match self.provider.send(&OutboundEmail::from(&job)).await {
            Ok(external_id) => {
                DeliveryMetrics::record_sent(self.provider.name(), started.elapsed().as_secs_f64());

                if let Err(e) = self.records.mark_sent(id, &external_id, Utc::now()).await {
                    tracing::error!(error = %e, external_id = %external_id, "Failed to record sent email");
                }

                tracing::info!(external_id = %external_id, "Email sent");
                DeliveryOutcome::Sent { external_id }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Email provider call failed");
                let error = AppError::from(e).to_string();
                self.retry_or_fail(job, attempt, error).await
            }
        }
    }

    async fn retry_or_fail(&self, job: EmailJob, attempt: u32, error: String) -> DeliveryOutcome {
        if attempt >= self.config.max_attempts {
            return self.fail(job.send_record_id, attempt, error).await;
        }

        let delay = self.config.backoff.delay_for_retry(attempt);
        if let Err(e) = self.queue.enqueue_delayed(job.next_attempt(), delay).await {
            tracing::error!(error = %e, "Failed to schedule delivery retry");
            return self.fail(job.send_record_id, attempt, error).await;
        }

        DeliveryMetrics::record_retry();
        tracing::info!(
            retry_in_ms = delay.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Scheduled delivery retry"
        );

        DeliveryOutcome::Retrying { attempt, delay }
    }

    async fn fail(&self, id: Uuid, attempt: u32, error: String) -> DeliveryOutcome {
        DeliveryMetrics::record_failed();
        if let Err(e) = self.records.mark_failed(id, &error, attempt).await {
            tracing::error!(error = %e, "Failed to record failed email");
        }
        tracing::error!(attempts = attempt, error = %error, "Email delivery failed permanently");
        DeliveryOutcome::Failed { error }
    }
}
