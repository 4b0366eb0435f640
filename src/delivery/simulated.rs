use async_trait::async_trait;
use chrono::Utc;

use super::provider::{DeliveryError, EmailProvider, OutboundEmail};

/// Stand-in used when no provider credentials are configured. Nothing is sent;
/// every call succeeds with a `mock-<millis>` id.
#[derive(Debug, Default)]
pub struct SimulatedProvider;

#[async_trait]
impl EmailProvider for SimulatedProvider {
    async fn send(&self, email: &OutboundEmail) -> Result<String, DeliveryError> {
        tracing::warn!(
            to = %email.to,
            subject = %email.subject,
            "Email provider not configured, email not actually sent"
        );

        Ok(format!("mock-{}", Utc::now().timestamp_millis()))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_send_returns_mock_id() {
        let email = OutboundEmail {
            to: "ana@example.com".to_string(),
            from: "noreply@edunotifysim.com".to_string(),
            reply_to: None,
            subject: "[SIMULATION] Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: None,
        };

        let id = SimulatedProvider.send(&email).await.unwrap();
        assert!(id.starts_with("mock-"));
        assert!(id["mock-".len()..].parse::<i64>().is_ok());
    }
}
