use async_trait::async_trait;
use thiserror::Error;

use crate::queue::EmailJob;

/// Transport failures reported by a provider. Every variant is retried by the worker.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The message as handed to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

impl From<&EmailJob> for OutboundEmail {
    fn from(job: &EmailJob) -> Self {
        Self {
            to: job.recipient.clone(),
            from: job.from.clone(),
            reply_to: job.reply_to.clone(),
            subject: job.subject.clone(),
            html: job.html.clone(),
            text: job.text.clone(),
        }
    }
}

/// Third-party email transport.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one email and return the provider's message id.
    async fn send(&self, email: &OutboundEmail) -> Result<String, DeliveryError>;

    /// Provider identifier used in logs and metrics
    fn name(&self) -> &'static str;

    /// Whether messages actually leave the service
    fn is_simulated(&self) -> bool {
        false
    }
}
