//! In-memory delivery queue backed by a tokio channel.
//!
//! Delayed retries wait in a side list until due. Jobs are lost on service
//! restart.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::Instant;

use super::backend::{DeliveryQueue, EmailJob, QueueError};

pub struct MemoryDeliveryQueue {
    sender: mpsc::UnboundedSender<EmailJob>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<EmailJob>>,
    depth: AtomicUsize,
    delayed: Mutex<Vec<(Instant, EmailJob)>>,
}

impl Default for MemoryDeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDeliveryQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: AsyncMutex::new(receiver),
            depth: AtomicUsize::new(0),
            delayed: Mutex::new(Vec::new()),
        }
    }

    fn delayed(&self) -> MutexGuard<'_, Vec<(Instant, EmailJob)>> {
        self.delayed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, job: EmailJob) -> Result<(), QueueError> {
        self.sender.send(job).map_err(|_| QueueError::Closed)?;
        self.depth.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Move due delayed jobs onto the channel. Returns when the next one is due.
    fn promote_due(&self, now: Instant) -> Result<Option<Instant>, QueueError> {
        let mut delayed = self.delayed();
        let mut due = Vec::new();
        delayed.retain(|(ready_at, job)| {
            if *ready_at <= now {
                due.push((*ready_at, job.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(ready_at, _)| *ready_at);
        let next = delayed.iter().map(|(ready_at, _)| *ready_at).min();
        drop(delayed);

        for (_, job) in due {
            self.push(job)?;
        }
        Ok(next)
    }
}

#[async_trait]
impl DeliveryQueue for MemoryDeliveryQueue {
    async fn enqueue(&self, job: EmailJob) -> Result<(), QueueError> {
        self.push(job)
    }

    async fn enqueue_delayed(&self, job: EmailJob, delay: Duration) -> Result<(), QueueError> {
        if self.sender.is_closed() {
            return Err(QueueError::Closed);
        }
        self.delayed().push((Instant::now() + delay, job));
        Ok(())
    }

    async fn next_job(&self, timeout: Duration) -> Result<Option<EmailJob>, QueueError> {
        let deadline = Instant::now() + timeout;
        let mut receiver = self.receiver.lock().await;

        loop {
            let now = Instant::now();
            let next_due = self.promote_due(now)?;
            let wake_at = next_due.map_or(deadline, |due| due.min(deadline));

            match tokio::time::timeout_at(wake_at, receiver.recv()).await {
                Ok(Some(job)) => {
                    self.depth.fetch_sub(1, Ordering::Relaxed);
                    return Ok(Some(job));
                }
                Ok(None) => return Err(QueueError::Closed),
                Err(_) if Instant::now() >= deadline => return Ok(None),
                Err(_) => continue,
            }
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.depth.load(Ordering::Relaxed) + self.delayed().len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job(subject: &str) -> EmailJob {
        EmailJob {
            send_record_id: Uuid::new_v4(),
            recipient: "ana@example.com".to_string(),
            from: "noreply@edunotifysim.com".to_string(),
            reply_to: None,
            subject: subject.to_string(),
            html: "<p>hi</p>".to_string(),
            text: None,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryDeliveryQueue::new();
        queue.enqueue(job("first")).await.unwrap();
        queue.enqueue(job("second")).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);

        let timeout = Duration::from_millis(50);
        assert_eq!(queue.next_job(timeout).await.unwrap().unwrap().subject, "first");
        assert_eq!(queue.next_job(timeout).await.unwrap().unwrap().subject, "second");
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delayed_job_waits_until_due() {
        let queue = MemoryDeliveryQueue::new();
        queue
            .enqueue_delayed(job("retry"), Duration::from_millis(80))
            .await
            .unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);

        assert!(queue.next_job(Duration::from_millis(10)).await.unwrap().is_none());
        assert_eq!(queue.len().await.unwrap(), 1);

        let due = queue.next_job(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(due.subject, "retry");
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ready_jobs_are_not_blocked_by_delayed_ones() {
        let queue = MemoryDeliveryQueue::new();
        queue
            .enqueue_delayed(job("later"), Duration::from_secs(60))
            .await
            .unwrap();
        queue.enqueue(job("now")).await.unwrap();

        let next = queue.next_job(Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(next.subject, "now");
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_times_out() {
        let queue = MemoryDeliveryQueue::new();
        let next = queue.next_job(Duration::from_millis(20)).await.unwrap();
        assert!(next.is_none());
    }
}
