use std::sync::Arc;

use chrono::Utc;
use email_address::EmailAddress;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::SendMetrics;
use crate::queue::{DeliveryQueue, EmailJob};
use crate::template::{
    render_email, substitute_variables, validate_variables, TemplateService,
};

use super::store::SendRecordRepository;
use super::types::{
    EmailStats, LogPage, LogQuery, Pagination, SendEmailRequest, SendEmailResponse, SendRecord,
    SendStatus, DEFAULT_RECENT_LIMIT, MAX_PAGE_SIZE,
};

const QUEUED_MESSAGE: &str = "Email queued for sending";

/// Accepts send requests and serves the delivery dashboard.
#[derive(Clone)]
pub struct EmailService {
    templates: TemplateService,
    records: Arc<dyn SendRecordRepository>,
    queue: Arc<dyn DeliveryQueue>,
    from_email: String,
}

impl EmailService {
    pub fn new(
        templates: TemplateService,
        records: Arc<dyn SendRecordRepository>,
        queue: Arc<dyn DeliveryQueue>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            templates,
            records,
            queue,
            from_email: from_email.into(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.records.backend_name()
    }

    /// Validate, render and queue one email built from a template.
    ///
    /// `api_key_id` is the key that authorized the request, if any.
    pub async fn send(
        &self,
        user_id: &str,
        api_key_id: Option<Uuid>,
        request: SendEmailRequest,
    ) -> Result<SendEmailResponse> {
        if !EmailAddress::is_valid(request.recipient_email.trim()) {
            SendMetrics::record_rejected("invalid_recipient");
            return Err(AppError::InvalidInput(format!(
                "Invalid recipient email: {}",
                request.recipient_email
            )));
        }

        if let Some(reply_to) = &request.reply_to_email {
            if !EmailAddress::is_valid(reply_to.trim()) {
                SendMetrics::record_rejected("invalid_reply_to");
                return Err(AppError::InvalidInput(format!(
                    "Invalid reply-to email: {}",
                    reply_to
                )));
            }
        }

        let template = self
            .templates
            .get_visible(user_id, &request.template_id)
            .await?;

        if !template.is_active {
            SendMetrics::record_rejected("inactive_template");
            return Err(AppError::InvalidInput(format!(
                "Template is not active: {}",
                template.id
            )));
        }

        let check = validate_variables(&template.source_text(), &request.variables);
        if !check.valid {
            SendMetrics::record_rejected("missing_variables");
            return Err(AppError::MissingVariables(check.missing));
        }

        let rendered = render_email(&template.html_body, &template.subject, &request.variables);
        let text_body = template
            .text_body
            .as_deref()
            .map(|text| substitute_variables(text, &request.variables));

        let now = Utc::now();
        let record = SendRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            template_id: template.id.clone(),
            api_key_id,
            recipient_email: request.recipient_email.trim().to_string(),
            from_email: self.from_email.clone(),
            reply_to_email: request.reply_to_email.map(|r| r.trim().to_string()),
            subject: rendered.rendered_subject,
            html_body: rendered.rendered_html,
            text_body,
            variables: request.variables,
            status: SendStatus::Queued,
            external_id: None,
            error_message: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            sent_at: None,
        };

        self.records.insert(&record).await?;

        let job = EmailJob {
            send_record_id: record.id,
            recipient: record.recipient_email.clone(),
            from: record.from_email.clone(),
            reply_to: record.reply_to_email.clone(),
            subject: record.subject.clone(),
            html: record.html_body.clone(),
            text: record.text_body.clone(),
            attempts: 0,
            enqueued_at: now,
        };

        if let Err(e) = self.queue.enqueue(job).await {
            tracing::error!(send_record_id = %record.id, error = %e, "Failed to enqueue email");
            self.records
                .mark_failed(record.id, &format!("Queue unavailable: {}", e), 0)
                .await?;
            return Err(AppError::Internal(format!("Failed to queue email: {}", e)));
        }

        self.templates.increment_usage(&template.id).await?;
        SendMetrics::record_queued();

        tracing::info!(
            send_record_id = %record.id,
            template_id = %template.id,
            user_id = %user_id,
            "Email queued"
        );

        Ok(SendEmailResponse {
            id: record.id,
            status: SendStatus::Queued,
            message: QUEUED_MESSAGE.to_string(),
        })
    }

    pub async fn stats(&self, user_id: &str) -> Result<EmailStats> {
        let counts = self.records.status_counts(user_id).await?;
        Ok(EmailStats::from(counts))
    }

    /// One page of the caller's send records, newest first.
    pub async fn list_logs(&self, user_id: &str, query: &LogQuery) -> Result<LogPage> {
        let page = query.page();
        let limit = query.limit();

        let (logs, total) = self
            .records
            .list(user_id, &query.filter(), query.offset(), limit)
            .await?;

        Ok(LogPage {
            logs,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit as u64),
            },
        })
    }

    pub async fn recent_logs(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<SendRecord>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_PAGE_SIZE);
        let (logs, _) = self
            .records
            .list(user_id, &Default::default(), 0, limit)
            .await?;
        Ok(logs)
    }

    /// A single record; other users' records are reported as missing.
    pub async fn get_log(&self, user_id: &str, id: Uuid) -> Result<SendRecord> {
        match self.records.get(id).await? {
            Some(record) if record.user_id == user_id => Ok(record),
            _ => Err(AppError::NotFound(format!("Email log not found: {}", id))),
        }
    }
}
