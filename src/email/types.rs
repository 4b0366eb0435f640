use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::template::Variables;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

/// Delivery state of a send record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Queued,
    Pending,
    Sent,
    Failed,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Queued => "queued",
            SendStatus::Pending => "pending",
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        }
    }

    /// States a record may be in when moving to `next`.
    ///
    /// `pending -> pending` covers a retried attempt; `queued -> failed` covers a
    /// job that never reached the worker.
    pub fn allowed_sources(next: SendStatus) -> &'static [SendStatus] {
        match next {
            SendStatus::Queued => &[],
            SendStatus::Pending => &[SendStatus::Queued, SendStatus::Pending],
            SendStatus::Sent => &[SendStatus::Pending],
            SendStatus::Failed => &[SendStatus::Queued, SendStatus::Pending],
        }
    }

    pub fn can_transition_to(&self, next: SendStatus) -> bool {
        Self::allowed_sources(next).contains(self)
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(SendStatus::Queued),
            "pending" => Ok(SendStatus::Pending),
            "sent" => Ok(SendStatus::Sent),
            "failed" => Ok(SendStatus::Failed),
            other => Err(format!("Unknown send status: {}", other)),
        }
    }
}

/// One accepted send request and its delivery outcome
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRecord {
    pub id: Uuid,
    pub user_id: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<Uuid>,
    pub recipient_email: String,
    pub from_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_email: Option<String>,
    /// Rendered subject
    pub subject: String,
    /// Rendered HTML body, disclaimer included
    pub html_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    /// Variables as supplied with the request
    pub variables: Variables,
    pub status: SendStatus,
    /// Provider message id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub template_id: String,
    pub recipient_email: String,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub reply_to_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub id: Uuid,
    pub status: SendStatus,
    pub message: String,
}

/// Per-status record counts for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: u64,
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.queued + self.pending + self.sent + self.failed
    }

    pub fn add(&mut self, status: SendStatus, count: u64) {
        match status {
            SendStatus::Queued => self.queued += count,
            SendStatus::Pending => self.pending += count,
            SendStatus::Sent => self.sent += count,
            SendStatus::Failed => self.failed += count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    /// Queued plus pending
    pub pending: u64,
    /// Percentage of sent records, two decimals
    pub success_rate: f64,
}

impl From<StatusCounts> for EmailStats {
    fn from(counts: StatusCounts) -> Self {
        let total = counts.total();
        let success_rate = if total == 0 {
            0.0
        } else {
            (counts.sent as f64 / total as f64 * 10_000.0).round() / 100.0
        };

        Self {
            total,
            sent: counts.sent,
            failed: counts.failed,
            pending: counts.queued + counts.pending,
            success_rate,
        }
    }
}

/// Query string for the paginated log listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<SendStatus>,
    #[serde(alias = "template_id")]
    pub template_id: Option<String>,
}

impl LogQuery {
    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.limit() as u64
    }

    pub fn filter(&self) -> LogFilter {
        LogFilter {
            status: self.status,
            template_id: self.template_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub status: Option<SendStatus>,
    pub template_id: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, record: &SendRecord) -> bool {
        self.status.map_or(true, |s| s == record.status)
            && self
                .template_id
                .as_deref()
                .map_or(true, |id| id == record.template_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct LogPage {
    pub logs: Vec<SendRecord>,
    pub pagination: Pagination,
}
