//! API key management. Only session callers may use these routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::apikey::{ApiKey, CreateApiKeyRequest, IssuedApiKey};
use crate::auth::AuthContext;
use crate::error::{AppError, Result};
use crate::server::AppState;

/// POST /api-keys - The plaintext key is returned once, here
#[tracing::instrument(name = "http.create_api_key", skip(state, auth, request), fields(user_id = %auth.user_id))]
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<IssuedApiKey>)> {
    auth.require_session()?;
    let issued = state.api_keys.issue(&auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// GET /api-keys
#[tracing::instrument(name = "http.list_api_keys", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ApiKey>>> {
    auth.require_session()?;
    Ok(Json(state.api_keys.list(&auth.user_id).await?))
}

/// PATCH /api-keys/{id}/revoke
#[tracing::instrument(name = "http.revoke_api_key", skip(state, auth))]
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiKey>> {
    auth.require_session()?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidInput(format!("Invalid API key id: {}", id)))?;
    Ok(Json(state.api_keys.revoke(&auth.user_id, id).await?))
}
