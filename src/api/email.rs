//! Send and statistics endpoints.

use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::apikey::Permission;
use crate::auth::AuthContext;
use crate::email::{EmailStats, SendEmailRequest, SendEmailResponse};
use crate::error::Result;
use crate::server::AppState;

/// POST /emails/send - Render a template and queue it for delivery
#[tracing::instrument(
    name = "http.send_email",
    skip(state, auth, request),
    fields(user_id = %auth.user_id, template_id = %request.template_id)
)]
pub async fn send_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SendEmailRequest>,
) -> Result<(StatusCode, Json<SendEmailResponse>)> {
    auth.require(Permission::SendEmail)?;

    let response = state
        .emails
        .send(&auth.user_id, auth.api_key_id(), request)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /emails/stats
#[tracing::instrument(name = "http.email_stats", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn email_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<EmailStats>> {
    auth.require(Permission::ReadLogs)?;
    Ok(Json(state.emails.stats(&auth.user_id).await?))
}
