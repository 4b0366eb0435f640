use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::server::AppState;

use super::api_key::{create_api_key, list_api_keys, revoke_api_key};
use super::email::{email_stats, send_email};
use super::logs::{get_log, list_logs, recent_logs};
use super::template::{
    create_template, delete_template, get_template, list_templates, preview_template,
    update_template,
};

/// Authenticated routes, nested under the configured API prefix.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Templates
        .route("/templates", post(create_template).get(list_templates))
        .route(
            "/templates/{id}",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
        .route("/templates/{id}/preview", post(preview_template))
        // Sending
        .route("/emails/send", post(send_email))
        .route("/emails/stats", get(email_stats))
        // Logs
        .route("/logs", get(list_logs))
        .route("/logs/recent", get(recent_logs))
        .route("/logs/{id}", get(get_log))
        // API keys
        .route("/api-keys", post(create_api_key).get(list_api_keys))
        .route("/api-keys/{id}/revoke", patch(revoke_api_key))
}
