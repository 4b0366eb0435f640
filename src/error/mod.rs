use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::storage::StoreError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64, limit: u32 },

    #[error("Failed to send email: {0}")]
    TransportFailure(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::TransportFailure(err.to_string())
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(id) => AppError::NotFound(format!("Template not found: {}", id)),
            TemplateError::MissingVariables(missing) => AppError::MissingVariables(missing),
            TemplateError::InvalidId(msg) | TemplateError::InvalidTemplate(msg) => {
                AppError::InvalidInput(msg)
            }
            TemplateError::AlreadyExists(id) => {
                AppError::InvalidInput(format!("Template already exists: {}", id))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<Vec<String>>,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    /// Stable machine-readable code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::MissingVariables(_) => "MISSING_VARIABLES",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::TransportFailure(_) => "TRANSPORT_FAILURE",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::MissingVariables(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::TransportFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let log_message = self.to_string();

        let client_message = match &self {
            AppError::Config(_) if is_production() => "Configuration error".to_string(),
            AppError::Storage(_) if is_production() => "Service temporarily unavailable".to_string(),
            AppError::Internal(_) if is_production() => "Internal server error".to_string(),
            _ => log_message.clone(),
        };

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::debug!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let missing = match &self {
            AppError::MissingVariables(names) => Some(names.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
                missing,
            },
        };

        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited { retry_after, limit } = &self {
            let headers = response.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert(header::RETRY_AFTER, v);
            }
            if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert("X-RateLimit-Limit", v);
            }
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variables_message_lists_names() {
        let err = AppError::MissingVariables(vec!["amount".into(), "currency".into()]);
        assert_eq!(err.to_string(), "Missing required variables: amount, currency");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "MISSING_VARIABLES");
    }

    #[test]
    fn test_template_error_conversion() {
        let err: AppError = TemplateError::NotFound("welcome".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: AppError = TemplateError::MissingVariables(vec!["name".into()]).into();
        assert!(matches!(err, AppError::MissingVariables(ref m) if m == &vec!["name".to_string()]));
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: 12,
            limit: 50,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "12");
        assert_eq!(response.headers().get("X-RateLimit-Limit").unwrap(), "50");
    }

    #[test]
    fn test_transport_failure_maps_to_bad_gateway() {
        let err = AppError::from(DeliveryError::Rejected {
            status: 503,
            body: "busy".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "TRANSPORT_FAILURE");
        assert_eq!(
            err.to_string(),
            "Failed to send email: Provider rejected message with status 503: busy"
        );
    }
}
