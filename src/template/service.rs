//! Template CRUD with ownership and visibility rules.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::storage::StoreError;

use super::compose::{render_email, RenderedEmail};
use super::extract::require_variables;
use super::store::TemplateRepository;
use super::types::{
    CreateTemplateRequest, Template, TemplateError, TemplateFilter, TemplateListResponse,
    UpdateTemplateRequest, Variables,
};

/// Template operations on behalf of an authenticated user.
#[derive(Clone)]
pub struct TemplateService {
    repository: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    pub fn new(repository: Arc<dyn TemplateRepository>) -> Self {
        Self { repository }
    }

    pub fn backend_name(&self) -> &'static str {
        self.repository.backend_name()
    }

    /// Create a template owned by `user_id`.
    pub async fn create(&self, user_id: &str, request: CreateTemplateRequest) -> Result<Template> {
        let template = Template::from_request(user_id, request);
        template.validate()?;

        match self.repository.insert(&template).await {
            Ok(()) => {}
            Err(StoreError::Conflict(id)) => return Err(TemplateError::AlreadyExists(id).into()),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            template_id = %template.id,
            user_id = %user_id,
            variables = template.variables.len(),
            "Template created"
        );

        Ok(template)
    }

    /// Templates owned by `user_id` or public, newest first.
    pub async fn list(&self, user_id: &str, filter: &TemplateFilter) -> Result<TemplateListResponse> {
        let templates = self.repository.list_visible(user_id, filter).await?;
        let total = templates.len();

        Ok(TemplateListResponse { templates, total })
    }

    /// Fetch a template the caller may see. Other users' private templates are
    /// reported as missing.
    pub async fn get_visible(&self, user_id: &str, id: &str) -> Result<Template> {
        match self.repository.get(id).await? {
            Some(template) if template.is_visible_to(user_id) => Ok(template),
            _ => Err(TemplateError::NotFound(id.to_string()).into()),
        }
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        request: UpdateTemplateRequest,
    ) -> Result<Template> {
        let mut template = self.owned(user_id, id).await?;

        template.apply(request);
        template.validate()?;
        self.repository.update(&template).await?;

        tracing::info!(template_id = %id, user_id = %user_id, "Template updated");
        Ok(template)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        self.owned(user_id, id).await?;

        if !self.repository.delete(id).await? {
            return Err(TemplateError::NotFound(id.to_string()).into());
        }

        tracing::info!(template_id = %id, user_id = %user_id, "Template deleted");
        Ok(())
    }

    /// Validate and render a template without sending it.
    pub async fn preview(
        &self,
        user_id: &str,
        id: &str,
        variables: &Variables,
    ) -> Result<RenderedEmail> {
        let template = self.get_visible(user_id, id).await?;
        require_variables(&template.source_text(), variables)?;

        Ok(render_email(&template.html_body, &template.subject, variables))
    }

    pub async fn increment_usage(&self, id: &str) -> Result<()> {
        self.repository.increment_usage(id).await?;
        Ok(())
    }

    /// Load a template for mutation: missing or invisible is `NotFound`, visible
    /// but owned by someone else is `Forbidden`.
    async fn owned(&self, user_id: &str, id: &str) -> Result<Template> {
        let template = self.get_visible(user_id, id).await?;

        if !template.is_owned_by(user_id) {
            return Err(AppError::Forbidden(format!(
                "Template {} belongs to another user",
                id
            )));
        }

        Ok(template)
    }
}
