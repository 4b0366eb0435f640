//! SendGrid v3 mail-send transport.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::EmailConfig;

use super::provider::{DeliveryError, EmailProvider, OutboundEmail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MESSAGE_ID_HEADER: &str = "x-message-id";
const MAX_ERROR_BODY: usize = 500;

pub struct SendGridProvider {
    client: Client,
    api_key: String,
    url: String,
    from_name: String,
}

impl SendGridProvider {
    pub fn new(config: &EmailConfig, api_key: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            url: config.sendgrid_url.clone(),
            from_name: config.from_name.clone(),
        })
    }

    /// Request body for `POST /v3/mail/send`. Plain text must precede HTML.
    fn payload(&self, email: &OutboundEmail) -> Value {
        let mut content = Vec::new();
        if let Some(text) = &email.text {
            content.push(json!({ "type": "text/plain", "value": text }));
        }
        content.push(json!({ "type": "text/html", "value": email.html }));

        let mut body = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": email.from, "name": self.from_name },
            "subject": email.subject,
            "content": content,
        });

        if let Some(reply_to) = &email.reply_to {
            body["reply_to"] = json!({ "email": reply_to });
        }

        body
    }
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, email: &OutboundEmail) -> Result<String, DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = response
            .headers()
            .get(MESSAGE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("sg-{}", Utc::now().timestamp_millis()));

        tracing::debug!(to = %email.to, message_id = %message_id, "SendGrid accepted message");
        Ok(message_id)
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Router};

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: "ana@example.com".to_string(),
            from: "noreply@edunotifysim.com".to_string(),
            reply_to: Some("help@example.com".to_string()),
            subject: "[SIMULATION] Hi Ana".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: Some("Hi".to_string()),
        }
    }

    fn provider(url: String) -> SendGridProvider {
        let config = EmailConfig {
            sendgrid_url: url,
            ..Default::default()
        };
        SendGridProvider::new(&config, "SG.test").unwrap()
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v3/mail/send", addr)
    }

    #[test]
    fn test_payload_shape() {
        let payload = provider("http://localhost".to_string()).payload(&email());

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "ana@example.com");
        assert_eq!(payload["from"]["name"], "EduNotify Sim");
        assert_eq!(payload["reply_to"]["email"], "help@example.com");
        assert_eq!(payload["content"][0]["type"], "text/plain");
        assert_eq!(payload["content"][1]["type"], "text/html");
    }

    #[tokio::test]
    async fn test_message_id_from_header() {
        let router = Router::new().route(
            "/v3/mail/send",
            post(|| async { (StatusCode::ACCEPTED, [("x-message-id", "abc123")]) }),
        );
        let url = serve(router).await;

        let id = provider(url).send(&email()).await.unwrap();
        assert_eq!(id, "abc123");
    }

    #[tokio::test]
    async fn test_rejection_is_error() {
        let router = Router::new().route(
            "/v3/mail/send",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let url = serve(router).await;

        let err = provider(url).send(&email()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 401, ref body } if body == "bad key"));
    }
}
