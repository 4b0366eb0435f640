use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::storage::{to_int4, StoreError};
use crate::template::Variables;

use super::store::SendRecordRepository;
use super::types::{LogFilter, SendRecord, SendStatus, StatusCounts};

const SELECT_COLUMNS: &str = "id, user_id, template_id, api_key_id, recipient, from_email, \
     reply_to, subject, html_body, text_body, variables, status, external_id, error_message, \
     attempts, created_at, updated_at, sent_at";

#[derive(sqlx::FromRow)]
struct SendRecordRow {
    id: Uuid,
    user_id: String,
    template_id: String,
    api_key_id: Option<Uuid>,
    recipient: String,
    from_email: String,
    reply_to: Option<String>,
    subject: String,
    html_body: String,
    text_body: Option<String>,
    variables: Json<Variables>,
    status: String,
    external_id: Option<String>,
    error_message: Option<String>,
    attempts: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<SendRecordRow> for SendRecord {
    type Error = StoreError;

    fn try_from(row: SendRecordRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("send record {}: {}", row.id, e)))?;

        Ok(SendRecord {
            id: row.id,
            user_id: row.user_id,
            template_id: row.template_id,
            api_key_id: row.api_key_id,
            recipient_email: row.recipient,
            from_email: row.from_email,
            reply_to_email: row.reply_to,
            subject: row.subject,
            html_body: row.html_body,
            text_body: row.text_body,
            variables: row.variables.0,
            status,
            external_id: row.external_id,
            error_message: row.error_message,
            attempts: row.attempts.max(0) as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sent_at: row.sent_at,
        })
    }
}

fn sources(next: SendStatus) -> Vec<&'static str> {
    SendStatus::allowed_sources(next)
        .iter()
        .map(SendStatus::as_str)
        .collect()
}

/// Send records stored in the `email_logs` table.
pub struct PostgresSendRecordRepository {
    pool: PgPool,
}

impl PostgresSendRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SendRecordRepository for PostgresSendRecordRepository {
    async fn insert(&self, record: &SendRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO email_logs
                (id, user_id, template_id, api_key_id, recipient, from_email, reply_to, subject,
                 html_body, text_body, variables, status, external_id, error_message, attempts,
                 created_at, updated_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.template_id)
        .bind(record.api_key_id)
        .bind(&record.recipient_email)
        .bind(&record.from_email)
        .bind(&record.reply_to_email)
        .bind(&record.subject)
        .bind(&record.html_body)
        .bind(&record.text_body)
        .bind(Json(&record.variables))
        .bind(record.status.as_str())
        .bind(&record.external_id)
        .bind(&record.error_message)
        .bind(to_int4(record.attempts, "attempts")?)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, &record.id.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SendRecord>, StoreError> {
        let row: Option<SendRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM email_logs WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SendRecord::try_from).transpose()
    }

    async fn list(
        &self,
        user_id: &str,
        filter: &LogFilter,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<SendRecord>, u64), StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let template_id = filter.template_id.as_deref();

        let rows: Vec<SendRecordRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM email_logs
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR template_id = $3)
            ORDER BY created_at DESC
            OFFSET $4 LIMIT $5
            "#,
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(status)
        .bind(template_id)
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM email_logs
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR template_id = $3)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(template_id)
        .fetch_one(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(SendRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, total.max(0) as u64))
    }

    async fn status_counts(&self, user_id: &str) -> Result<StatusCounts, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM email_logs WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.parse::<SendStatus>() {
                Ok(status) => counts.add(status, count.max(0) as u64),
                Err(e) => tracing::warn!(error = %e, "Skipping unknown status in counts"),
            }
        }
        Ok(counts)
    }

    async fn mark_pending(&self, id: Uuid, attempts: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_logs SET status = 'pending', attempts = $2, updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(to_int4(attempts, "attempts")?)
        .bind(sources(SendStatus::Pending))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        external_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_logs
            SET status = 'sent', external_id = $2, sent_at = $3, error_message = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($4)
            "#,
        )
        .bind(id)
        .bind(external_id)
        .bind(sent_at)
        .bind(sources(SendStatus::Sent))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, error: &str, attempts: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_logs
            SET status = 'failed', error_message = $2, attempts = $3, updated_at = NOW()
            WHERE id = $1 AND status = ANY($4)
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(to_int4(attempts, "attempts")?)
        .bind(sources(SendStatus::Failed))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
