//! Send-to-delivery flow through the services, the in-memory queue and the worker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use edunotify_sim::delivery::{
    DeliveryError, DeliveryOutcome, DeliveryWorker, EmailProvider, OutboundEmail,
    SimulatedProvider, WorkerConfig,
};
use edunotify_sim::email::{EmailService, SendEmailRequest, SendStatus};
use edunotify_sim::queue::{BackoffConfig, DeliveryQueue, MemoryDeliveryQueue};
use edunotify_sim::storage::Repositories;
use edunotify_sim::template::{
    CreateTemplateRequest, TemplateCategory, TemplateService, VariableValue, EDUCATION_DISCLAIMER,
};

/// Provider that rejects every message
struct DownProvider {
    calls: AtomicU32,
}

#[async_trait]
impl EmailProvider for DownProvider {
    async fn send(&self, _email: &OutboundEmail) -> Result<String, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Rejected {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "down"
    }
}

struct Fixture {
    repositories: Repositories,
    queue: Arc<dyn DeliveryQueue>,
    emails: EmailService,
}

async fn fixture() -> Fixture {
    let repositories = Repositories::memory();
    let queue: Arc<dyn DeliveryQueue> = Arc::new(MemoryDeliveryQueue::new());
    let templates = TemplateService::new(repositories.templates.clone());

    templates
        .create(
            "instructor-1",
            CreateTemplateRequest {
                id: Some("grade-posted".to_string()),
                name: "Grade posted".to_string(),
                description: None,
                category: TemplateCategory::Custom,
                subject: "Your grade for {{course}}".to_string(),
                html_body: "<p>{{name}}, you scored {{score}} in {{course}}.</p>".to_string(),
                text_body: Some("{{name}}: {{score}}".to_string()),
                is_public: false,
            },
        )
        .await
        .unwrap();

    let emails = EmailService::new(
        templates,
        repositories.send_records.clone(),
        queue.clone(),
        "noreply@edunotifysim.com",
    );

    Fixture {
        repositories,
        queue,
        emails,
    }
}

fn request() -> SendEmailRequest {
    let mut variables = BTreeMap::new();
    variables.insert("name".to_string(), VariableValue::from("Ada"));
    variables.insert("score".to_string(), VariableValue::from(97));
    variables.insert("course".to_string(), VariableValue::from("Algebra"));

    SendEmailRequest {
        template_id: "grade-posted".to_string(),
        recipient_email: "ada@example.com".to_string(),
        variables,
        reply_to_email: None,
    }
}

fn worker_config(max_attempts: u32) -> WorkerConfig {
    WorkerConfig {
        max_attempts,
        concurrency: 2,
        poll_timeout: Duration::from_millis(50),
        backoff: BackoffConfig {
            initial_delay_ms: 10,
            max_delay_ms: 20,
            multiplier: 2.0,
            jitter_factor: 0.0,
        },
    }
}

#[tokio::test]
async fn test_queued_email_is_rendered_and_delivered() {
    let fx = fixture().await;

    let response = fx.emails.send("instructor-1", None, request()).await.unwrap();
    assert_eq!(response.status, SendStatus::Queued);

    let job = fx
        .queue
        .next_job(Duration::from_millis(50))
        .await
        .unwrap()
        .expect("job should be queued");
    assert_eq!(job.send_record_id, response.id);
    assert_eq!(job.subject, "[SIMULATION] Your grade for Algebra");
    assert!(job.html.contains("Ada, you scored 97 in Algebra."));
    assert!(job.html.ends_with(EDUCATION_DISCLAIMER));
    assert_eq!(job.text.as_deref(), Some("Ada: 97"));

    let worker = DeliveryWorker::new(
        fx.queue.clone(),
        fx.repositories.send_records.clone(),
        Arc::new(SimulatedProvider),
        worker_config(3),
    );

    match worker.process(job).await {
        DeliveryOutcome::Sent { external_id } => assert!(external_id.starts_with("mock-")),
        other => panic!("expected Sent, got {:?}", other),
    }

    let record = fx.emails.get_log("instructor-1", response.id).await.unwrap();
    assert_eq!(record.status, SendStatus::Sent);
    assert!(record.sent_at.is_some());
    assert_eq!(record.attempts, 1);

    let stats = fx.emails.stats("instructor-1").await.unwrap();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.success_rate, 100.0);
}

#[tokio::test]
async fn test_failing_provider_exhausts_attempts() {
    let fx = fixture().await;
    let provider = Arc::new(DownProvider {
        calls: AtomicU32::new(0),
    });

    let response = fx.emails.send("instructor-1", None, request()).await.unwrap();

    let worker = DeliveryWorker::new(
        fx.queue.clone(),
        fx.repositories.send_records.clone(),
        provider.clone(),
        worker_config(2),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(worker.run(shutdown_rx));

    let mut status = SendStatus::Queued;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        status = fx
            .emails
            .get_log("instructor-1", response.id)
            .await
            .unwrap()
            .status;
        if status == SendStatus::Failed {
            break;
        }
    }

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker should stop")
        .unwrap();

    let record = fx.emails.get_log("instructor-1", response.id).await.unwrap();
    assert_eq!(status, SendStatus::Failed);
    assert_eq!(record.attempts, 2);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    assert!(record
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Failed to send email:"));

    let stats = fx.emails.stats("instructor-1").await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn test_other_users_cannot_send_private_templates() {
    let fx = fixture().await;
    let result = fx.emails.send("student-9", None, request()).await;

    assert!(result.is_err());
    assert_eq!(fx.queue.len().await.unwrap(), 0);
}
