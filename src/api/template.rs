//! Template CRUD and preview endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::apikey::Permission;
use crate::auth::AuthContext;
use crate::error::Result;
use crate::server::AppState;
use crate::template::{
    CreateTemplateRequest, PreviewRequest, RenderedEmail, Template, TemplateFilter,
    TemplateListResponse, UpdateTemplateRequest,
};

/// POST /templates - Create a template owned by the caller
#[tracing::instrument(
    name = "http.create_template",
    skip(state, auth, request),
    fields(user_id = %auth.user_id)
)]
pub async fn create_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Template>)> {
    auth.require(Permission::ManageTemplates)?;
    let created = state.templates.create(&auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /templates - Owned and public templates, newest first
#[tracing::instrument(name = "http.list_templates", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn list_templates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<TemplateFilter>,
) -> Result<Json<TemplateListResponse>> {
    Ok(Json(state.templates.list(&auth.user_id, &filter).await?))
}

/// GET /templates/{id}
#[tracing::instrument(name = "http.get_template", skip(state, auth))]
pub async fn get_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Template>> {
    Ok(Json(state.templates.get_visible(&auth.user_id, &id).await?))
}

/// PATCH /templates/{id}
#[tracing::instrument(name = "http.update_template", skip(state, auth, request))]
pub async fn update_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<Template>> {
    auth.require(Permission::ManageTemplates)?;
    Ok(Json(state.templates.update(&auth.user_id, &id, request).await?))
}

/// DELETE /templates/{id}
#[tracing::instrument(name = "http.delete_template", skip(state, auth))]
pub async fn delete_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    auth.require(Permission::ManageTemplates)?;
    state.templates.delete(&auth.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /templates/{id}/preview - Render with the given variables without sending
#[tracing::instrument(name = "http.preview_template", skip(state, auth, request))]
pub async fn preview_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<RenderedEmail>> {
    Ok(Json(
        state
            .templates
            .preview(&auth.user_id, &id, &request.variables)
            .await?,
    ))
}
