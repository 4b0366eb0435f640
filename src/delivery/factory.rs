use std::sync::Arc;

use crate::config::EmailConfig;

use super::provider::{DeliveryError, EmailProvider};
use super::sendgrid::SendGridProvider;
use super::simulated::SimulatedProvider;

/// SendGrid when an API key is configured, otherwise the simulated provider.
pub fn create_email_provider(config: &EmailConfig) -> Result<Arc<dyn EmailProvider>, DeliveryError> {
    match config.sendgrid_api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            tracing::info!(provider = "sendgrid", url = %config.sendgrid_url, "Creating email provider");
            Ok(Arc::new(SendGridProvider::new(config, key)?))
        }
        _ => {
            tracing::warn!(
                provider = "simulated",
                "SendGrid API key not configured, emails will not actually be sent"
            );
            Ok(Arc::new(SimulatedProvider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_without_key() {
        let provider = create_email_provider(&EmailConfig::default()).unwrap();
        assert!(provider.is_simulated());

        let blank = EmailConfig {
            sendgrid_api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(create_email_provider(&blank).unwrap().name(), "simulated");
    }

    #[test]
    fn test_sendgrid_with_key() {
        let config = EmailConfig {
            sendgrid_api_key: Some("SG.key".to_string()),
            ..Default::default()
        };
        let provider = create_email_provider(&config).unwrap();
        assert_eq!(provider.name(), "sendgrid");
        assert!(!provider.is_simulated());
    }
}
