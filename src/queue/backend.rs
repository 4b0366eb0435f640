//! Backend trait for the delivery queue.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The queue no longer accepts or yields jobs
    #[error("Delivery queue is closed")]
    Closed,
}

/// One email to hand to the provider.
///
/// Everything the worker needs is carried in the job, so delivery never
/// re-renders the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub send_record_id: Uuid,
    pub recipient: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Delivery attempts already made
    #[serde(default)]
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl EmailJob {
    /// The same job, counted as having made one more attempt.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempts: self.attempts + 1,
            enqueued_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Storage backend for queued jobs.
///
/// Implementations must be thread-safe (`Send + Sync`) as the queue is shared
/// between request handlers and the delivery worker.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Append a job to the tail of the queue
    async fn enqueue(&self, job: EmailJob) -> Result<(), QueueError>;

    /// Store a job that becomes available once `delay` has passed.
    ///
    /// The job is held by the queue from the moment this returns, so a retry
    /// waiting out its backoff is not lost when the worker stops.
    async fn enqueue_delayed(&self, job: EmailJob, delay: Duration) -> Result<(), QueueError>;

    /// Pop the head of the queue, waiting up to `timeout` for one to arrive.
    /// Delayed jobs that have come due are moved to the tail first.
    async fn next_job(&self, timeout: Duration) -> Result<Option<EmailJob>, QueueError>;

    /// Number of jobs waiting, delayed ones included
    async fn len(&self) -> Result<usize, QueueError>;

    /// Backend type identifier
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_wire_format() {
        let job = EmailJob {
            send_record_id: Uuid::nil(),
            recipient: "ana@example.com".to_string(),
            from: "noreply@edunotifysim.com".to_string(),
            reply_to: None,
            subject: "[SIMULATION] Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: None,
            attempts: 0,
            enqueued_at: Utc::now(),
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["sendRecordId"], "00000000-0000-0000-0000-000000000000");
        assert!(value.get("replyTo").is_none());

        let decoded: EmailJob = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_next_attempt() {
        let job = EmailJob {
            send_record_id: Uuid::new_v4(),
            recipient: "ana@example.com".to_string(),
            from: "noreply@edunotifysim.com".to_string(),
            reply_to: Some("help@example.com".to_string()),
            subject: "s".to_string(),
            html: "h".to_string(),
            text: Some("t".to_string()),
            attempts: 1,
            enqueued_at: Utc::now(),
        };

        let retry = job.next_attempt();
        assert_eq!(retry.attempts, 2);
        assert_eq!(retry.send_record_id, job.send_record_id);
        assert_eq!(retry.reply_to, job.reply_to);
    }
}
