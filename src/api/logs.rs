//! Send log endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::apikey::Permission;
use crate::auth::AuthContext;
use crate::email::{LogPage, LogQuery, SendRecord};
use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

/// GET /logs - Paginated send history
#[tracing::instrument(name = "http.list_logs", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn list_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogPage>> {
    auth.require(Permission::ReadLogs)?;
    Ok(Json(state.emails.list_logs(&auth.user_id, &query).await?))
}

/// GET /logs/recent
#[tracing::instrument(name = "http.recent_logs", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn recent_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<SendRecord>>> {
    auth.require(Permission::ReadLogs)?;
    Ok(Json(
        state.emails.recent_logs(&auth.user_id, query.limit).await?,
    ))
}

/// GET /logs/{id}
#[tracing::instrument(name = "http.get_log", skip(state, auth))]
pub async fn get_log(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<SendRecord>> {
    auth.require(Permission::ReadLogs)?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidInput(format!("Invalid log id: {}", id)))?;
    Ok(Json(state.emails.get_log(&auth.user_id, id).await?))
}
