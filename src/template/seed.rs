//! Public sample templates installed at startup.

use crate::error::Result;
use crate::storage::StoreError;

use super::store::TemplateRepository;
use super::types::{CreateTemplateRequest, Template, TemplateCategory};

const CRYPTO_DEPOSIT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Crypto Deposit</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #667eea;">Crypto Deposit Received</h1>
  <p>Hello {{name}},</p>
  <p>This is an educational simulation of a cryptocurrency deposit notification.</p>
  <table style="width: 100%;">
    <tr><td><strong>Amount:</strong></td><td>{{amount}} {{currency}}</td></tr>
    <tr><td><strong>Date:</strong></td><td>{{date}}</td></tr>
    <tr><td><strong>Transaction ID:</strong></td><td style="font-family: monospace;">{{reference_id}}</td></tr>
    <tr><td><strong>Network:</strong></td><td>{{network}}</td></tr>
  </table>
  <p style="background: #fef3c7; padding: 15px;"><strong>Educational Note:</strong> Real crypto transactions involve actual blockchain confirmations and wallet addresses.</p>
</body>
</html>"#;

const ORDER_CONFIRMATION_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Order Confirmation</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #2563eb;">Order Confirmed</h1>
  <p>Dear {{name}},</p>
  <p>Thank you for your order! This is an educational simulation of an e-commerce order confirmation.</p>
  <table style="width: 100%;">
    <tr><td><strong>Order Number:</strong></td><td>#{{order_number}}</td></tr>
    <tr><td><strong>Item:</strong></td><td>{{item_name}}</td></tr>
    <tr><td><strong>Quantity:</strong></td><td>{{quantity}}</td></tr>
    <tr><td><strong>Total Amount:</strong></td><td>{{amount}}</td></tr>
    <tr><td><strong>Order Date:</strong></td><td>{{date}}</td></tr>
  </table>
  <p>Estimated Delivery: {{delivery_date}}</p>
  <p>Tracking Number: {{reference_id}}</p>
  <p style="background: #dbeafe; padding: 15px;"><strong>Educational Simulation:</strong> No real transaction or shipping has occurred.</p>
</body>
</html>"#;

const BANKING_ALERT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Transaction Alert</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #059669;">Transaction Alert</h1>
  <p>Hello {{name}},</p>
  <p>This is an educational simulation of a banking transaction alert.</p>
  <table style="width: 100%;">
    <tr><td><strong>Type:</strong></td><td>{{transaction_type}}</td></tr>
    <tr><td><strong>Amount:</strong></td><td>{{amount}}</td></tr>
    <tr><td><strong>Date &amp; Time:</strong></td><td>{{date}}</td></tr>
    <tr><td><strong>Reference:</strong></td><td style="font-family: monospace;">{{reference_id}}</td></tr>
    <tr><td><strong>Account:</strong></td><td>****{{account_last_four}}</td></tr>
  </table>
  <p style="background: #fef2f2; padding: 15px;"><strong>Security Note:</strong> A real bank never asks for your full account number or banking details via email.</p>
</body>
</html>"#;

const SHIPMENT_UPDATE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Shipment Update</title></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #7c3aed;">Shipment Update</h1>
  <p>Dear {{name}},</p>
  <p>Your package has a new status update! This is an educational simulation of a logistics tracking notification.</p>
  <h2 style="color: #7c3aed;">{{status}}</h2>
  <p style="color: #6b7280;">as of {{date}}</p>
  <table style="width: 100%;">
    <tr><td><strong>Tracking Number:</strong></td><td style="font-family: monospace;">{{tracking_number}}</td></tr>
    <tr><td><strong>Carrier:</strong></td><td>{{carrier}}</td></tr>
    <tr><td><strong>Origin:</strong></td><td>{{origin}}</td></tr>
    <tr><td><strong>Destination:</strong></td><td>{{destination}}</td></tr>
    <tr><td><strong>Est. Delivery:</strong></td><td>{{estimated_delivery}}</td></tr>
  </table>
  <p style="background: #f3e8ff; padding: 15px;"><strong>Educational Simulation:</strong> No real package is in transit.</p>
</body>
</html>"#;

#[allow(clippy::too_many_arguments)]
fn sample(
    owner_id: &str,
    id: &str,
    name: &str,
    description: &str,
    category: TemplateCategory,
    subject: &str,
    html_body: &str,
    text_body: &str,
) -> Template {
    Template::from_request(
        owner_id,
        CreateTemplateRequest {
            id: Some(id.to_string()),
            name: name.to_string(),
            description: Some(description.to_string()),
            category,
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            text_body: Some(text_body.to_string()),
            is_public: true,
        },
    )
}

/// The four public sample templates, owned by `owner_id`.
pub fn sample_templates(owner_id: &str) -> Vec<Template> {
    vec![
        sample(
            owner_id,
            "crypto-edu-deposit-1",
            "Crypto Education - Deposit Simulation",
            "Educational simulation of a cryptocurrency deposit notification",
            TemplateCategory::CryptoEducation,
            "Crypto Deposit Received - {{amount}} {{currency}}",
            CRYPTO_DEPOSIT_HTML,
            "Crypto Deposit: {{amount}} {{currency}} on {{date}}. Transaction: {{reference_id}}",
        ),
        sample(
            owner_id,
            "ecommerce-order-1",
            "E-commerce - Order Confirmation Simulation",
            "Educational simulation of an online order confirmation",
            TemplateCategory::Ecommerce,
            "Order Confirmation #{{order_number}} - {{item_name}}",
            ORDER_CONFIRMATION_HTML,
            "Order #{{order_number}} confirmed. Item: {{item_name}}, Amount: {{amount}}, Date: {{date}}",
        ),
        sample(
            owner_id,
            "banking-alert-1",
            "Banking - Transaction Alert Simulation",
            "Educational simulation of a bank transaction notification",
            TemplateCategory::Banking,
            "Transaction Alert - {{amount}} {{transaction_type}}",
            BANKING_ALERT_HTML,
            "Transaction Alert: {{transaction_type}} of {{amount}} on {{date}}. Reference: {{reference_id}}",
        ),
        sample(
            owner_id,
            "logistics-shipment-1",
            "Logistics - Shipment Update Simulation",
            "Educational simulation of a package tracking notification",
            TemplateCategory::Logistics,
            "Package Update: {{status}} - Tracking #{{tracking_number}}",
            SHIPMENT_UPDATE_HTML,
            "Shipment {{status}}. Tracking: {{tracking_number}}, Carrier: {{carrier}}, Est. Delivery: {{estimated_delivery}}",
        ),
    ]
}

/// Insert any sample template that is not already stored. Returns how many were added.
pub async fn seed_templates(repository: &dyn TemplateRepository, owner_id: &str) -> Result<usize> {
    let mut inserted = 0;

    for template in sample_templates(owner_id) {
        match repository.insert(&template).await {
            Ok(()) => inserted += 1,
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(template_id = %template.id, "Sample template already present");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if inserted > 0 {
        tracing::info!(count = inserted, owner_id = %owner_id, "Seeded sample templates");
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MemoryTemplateRepository;

    #[test]
    fn test_samples_are_valid_and_public() {
        let samples = sample_templates("system");
        assert_eq!(samples.len(), 4);

        for template in &samples {
            assert!(template.validate().is_ok(), "{} invalid", template.id);
            assert!(template.is_public);
            assert!(template.variables.contains(&"name".to_string()));
        }
    }

    #[test]
    fn test_banking_variables() {
        let banking = sample_templates("system")
            .into_iter()
            .find(|t| t.id == "banking-alert-1")
            .unwrap();

        let mut vars = banking.variables.clone();
        vars.sort();
        assert_eq!(
            vars,
            vec![
                "account_last_four",
                "amount",
                "date",
                "name",
                "reference_id",
                "transaction_type"
            ]
        );
    }

    #[tokio::test]
    async fn test_seed_is_repeatable() {
        let repo = MemoryTemplateRepository::new();

        assert_eq!(seed_templates(&repo, "system").await.unwrap(), 4);
        assert_eq!(seed_templates(&repo, "system").await.unwrap(), 0);
        assert_eq!(repo.count(), 4);
    }
}
