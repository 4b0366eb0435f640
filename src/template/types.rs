//! Template types and error definitions

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::extract::extract_variables;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template ID: {0}")]
    InvalidId(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Missing required variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A scalar value supplied for a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Text(s) => f.write_str(s),
            VariableValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_string())
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Number(value.into())
    }
}

/// Variables supplied at send time, keyed by placeholder name
pub type Variables = BTreeMap<String, VariableValue>;

/// Template category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateCategory {
    CryptoEducation,
    Ecommerce,
    Banking,
    Logistics,
    Custom,
}

impl TemplateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::CryptoEducation => "CRYPTO_EDUCATION",
            TemplateCategory::Ecommerce => "ECOMMERCE",
            TemplateCategory::Banking => "BANKING",
            TemplateCategory::Logistics => "LOGISTICS",
            TemplateCategory::Custom => "CUSTOM",
        }
    }
}

impl FromStr for TemplateCategory {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRYPTO_EDUCATION" => Ok(TemplateCategory::CryptoEducation),
            "ECOMMERCE" => Ok(TemplateCategory::Ecommerce),
            "BANKING" => Ok(TemplateCategory::Banking),
            "LOGISTICS" => Ok(TemplateCategory::Logistics),
            "CUSTOM" => Ok(TemplateCategory::Custom),
            other => Err(TemplateError::InvalidTemplate(format!(
                "Unknown category: {}",
                other
            ))),
        }
    }
}

/// An email template definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique template identifier (alphanumeric, dash, underscore)
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Human-readable template name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub category: TemplateCategory,

    /// Subject line with {{variable}} placeholders
    pub subject: String,

    /// HTML body with {{variable}} placeholders
    pub html_body: String,

    /// Optional plain-text alternative
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,

    /// Distinct placeholder names found in subject + HTML body
    pub variables: Vec<String>,

    /// Number of accepted send requests
    pub usage_count: i64,

    pub is_public: bool,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        if self.id.is_empty() || self.id.len() > 64 {
            return Err(TemplateError::InvalidId(
                "ID must be 1-64 characters".to_string(),
            ));
        }

        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TemplateError::InvalidId(
                "ID must contain only alphanumeric, dash, or underscore".to_string(),
            ));
        }

        if self.name.trim().is_empty() || self.name.len() > 256 {
            return Err(TemplateError::InvalidTemplate(
                "Name must be 1-256 characters".to_string(),
            ));
        }

        if self.subject.trim().is_empty() || self.subject.len() > 998 {
            return Err(TemplateError::InvalidTemplate(
                "Subject must be 1-998 characters".to_string(),
            ));
        }

        if self.html_body.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "HTML body must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Subject and HTML body as scanned for required variables
    pub fn source_text(&self) -> String {
        format!("{}{}", self.subject, self.html_body)
    }

    /// Recompute `variables` from the current subject and body.
    pub fn refresh_variables(&mut self) {
        self.variables = extract_variables(&self.source_text());
    }

    /// Owned by `user_id`, or public
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.is_public || self.user_id == user_id
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Build a new template owned by `user_id` from a create request.
    pub fn from_request(user_id: &str, req: CreateTemplateRequest) -> Self {
        let now = Utc::now();
        let mut template = Template {
            id: req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            user_id: user_id.to_string(),
            name: req.name,
            description: req.description,
            category: req.category,
            subject: req.subject,
            html_body: req.html_body,
            text_body: req.text_body,
            variables: Vec::new(),
            usage_count: 0,
            is_public: req.is_public,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        template.refresh_variables();
        template
    }

    /// Apply a partial update, recomputing variables when content changes.
    pub fn apply(&mut self, updates: UpdateTemplateRequest) {
        let mut content_changed = false;

        if let Some(name) = updates.name {
            self.name = name;
        }

        if let Some(description) = updates.description {
            self.description = description;
        }

        if let Some(category) = updates.category {
            self.category = category;
        }

        if let Some(subject) = updates.subject {
            self.subject = subject;
            content_changed = true;
        }

        if let Some(html_body) = updates.html_body {
            self.html_body = html_body;
            content_changed = true;
        }

        if let Some(text_body) = updates.text_body {
            self.text_body = text_body;
        }

        if let Some(is_active) = updates.is_active {
            self.is_active = is_active;
        }

        if let Some(is_public) = updates.is_public {
            self.is_public = is_public;
        }

        if content_changed {
            self.refresh_variables();
        }

        self.updated_at = Utc::now();
    }
}

/// Request to create a new template
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    /// Template identifier (optional, generated when absent)
    #[serde(default)]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub category: TemplateCategory,

    pub subject: String,

    pub html_body: String,

    #[serde(default)]
    pub text_body: Option<String>,

    #[serde(default)]
    pub is_public: bool,
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,

    /// Use null to clear
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub category: Option<TemplateCategory>,

    pub subject: Option<String>,

    pub html_body: Option<String>,

    /// Use null to clear
    #[serde(default, deserialize_with = "double_option")]
    pub text_body: Option<Option<String>>,

    pub is_active: Option<bool>,

    pub is_public: Option<bool>,
}

/// Distinguish an absent field (`None`) from an explicit null (`Some(None)`).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Listing filters
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilter {
    pub category: Option<TemplateCategory>,
    #[serde(alias = "is_public")]
    pub is_public: Option<bool>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &Template) -> bool {
        self.category.map_or(true, |c| c == template.category)
            && self.is_public.map_or(true, |p| p == template.is_public)
    }
}

/// Response for listing templates
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
    pub total: usize,
}

/// Variables for a render-only preview
#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub variables: Variables,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateTemplateRequest {
        CreateTemplateRequest {
            id: Some("order-shipped".to_string()),
            name: "Order Shipped".to_string(),
            description: None,
            category: TemplateCategory::Ecommerce,
            subject: "Order {{order_id}} shipped".to_string(),
            html_body: "<p>{{name}}, order {{order_id}} via {{carrier}}</p>".to_string(),
            text_body: None,
            is_public: false,
        }
    }

    #[test]
    fn test_from_request_derives_variables() {
        let template = Template::from_request("user-1", request());
        assert_eq!(template.variables, vec!["order_id", "name", "carrier"]);
        assert_eq!(template.usage_count, 0);
        assert!(template.is_active);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_generated_id_is_valid() {
        let mut req = request();
        req.id = None;
        let template = Template::from_request("user-1", req);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_apply_recomputes_variables_on_content_change() {
        let mut template = Template::from_request("user-1", request());
        template.apply(UpdateTemplateRequest {
            html_body: Some("<p>Tracking {{tracking}}</p>".to_string()),
            ..Default::default()
        });
        assert_eq!(template.variables, vec!["order_id", "tracking"]);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let mut req = request();
        req.id = Some("bad id!".to_string());
        let template = Template::from_request("user-1", req);
        assert!(matches!(template.validate(), Err(TemplateError::InvalidId(_))));
    }

    #[test]
    fn test_category_wire_format() {
        let category: TemplateCategory = serde_json::from_str("\"CRYPTO_EDUCATION\"").unwrap();
        assert_eq!(category, TemplateCategory::CryptoEducation);
        assert_eq!("BANKING".parse::<TemplateCategory>().unwrap(), TemplateCategory::Banking);
        assert!("crypto".parse::<TemplateCategory>().is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let cleared: UpdateTemplateRequest =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let untouched: UpdateTemplateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.description, None);
    }

    #[test]
    fn test_variable_value_display() {
        let vars: Variables =
            serde_json::from_str(r#"{"a": "text", "b": 10, "c": 2.5}"#).unwrap();
        assert_eq!(vars["a"].to_string(), "text");
        assert_eq!(vars["b"].to_string(), "10");
        assert_eq!(vars["c"].to_string(), "2.5");
    }

    #[test]
    fn test_non_scalar_variables_rejected() {
        let result: Result<Variables, _> = serde_json::from_str(r#"{"a": [1, 2]}"#);
        assert!(result.is_err());
    }
}
