//! API layer - HTTP endpoint handlers organized by domain.

mod api_key;
mod email;
mod health;
mod logs;
mod metrics;
mod routes;
mod template;

pub use api_key::{create_api_key, list_api_keys, revoke_api_key};
pub use email::{email_stats, send_email};
pub use health::{health, HealthResponse};
pub use logs::{get_log, list_logs, recent_logs};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use template::{
    create_template, delete_template, get_template, list_templates, preview_template,
    update_template,
};
