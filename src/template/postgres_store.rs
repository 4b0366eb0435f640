//! PostgreSQL-based template storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::storage::StoreError;

use super::store::TemplateRepository;
use super::types::{Template, TemplateFilter};

const SELECT_COLUMNS: &str = "id, user_id, name, description, category, subject, html_body, \
     text_body, variables, usage_count, is_public, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: String,
    user_id: String,
    name: String,
    description: Option<String>,
    category: String,
    subject: String,
    html_body: String,
    text_body: Option<String>,
    variables: Json<Vec<String>>,
    usage_count: i64,
    is_public: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for Template {
    type Error = StoreError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("template {}: {}", row.id, e)))?;

        Ok(Template {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            category,
            subject: row.subject,
            html_body: row.html_body,
            text_body: row.text_body,
            variables: row.variables.0,
            usage_count: row.usage_count,
            is_public: row.is_public,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Templates stored in the `email_templates` table.
pub struct PostgresTemplateRepository {
    pool: PgPool,
}

impl PostgresTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepository {
    async fn insert(&self, template: &Template) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO email_templates
                (id, user_id, name, description, category, subject, html_body, text_body,
                 variables, usage_count, is_public, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&template.id)
        .bind(&template.user_id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.category.as_str())
        .bind(&template.subject)
        .bind(&template.html_body)
        .bind(&template.text_body)
        .bind(Json(&template.variables))
        .bind(template.usage_count)
        .bind(template.is_public)
        .bind(template.is_active)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, &template.id))?;

        tracing::trace!(template_id = %template.id, "Template inserted into PostgreSQL");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Template>, StoreError> {
        let row: Option<TemplateRow> = sqlx::query_as(&format!(
            "SELECT {} FROM email_templates WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Template::try_from).transpose()
    }

    async fn list_visible(
        &self,
        user_id: &str,
        filter: &TemplateFilter,
    ) -> Result<Vec<Template>, StoreError> {
        let rows: Vec<TemplateRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM email_templates
            WHERE (user_id = $1 OR is_public)
              AND ($2::TEXT IS NULL OR category = $2)
              AND ($3::BOOLEAN IS NULL OR is_public = $3)
            ORDER BY created_at DESC
            "#,
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.is_public)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Template::try_from).collect()
    }

    async fn update(&self, template: &Template) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE email_templates
            SET name = $2, description = $3, category = $4, subject = $5, html_body = $6,
                text_body = $7, variables = $8, is_public = $9, is_active = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(&template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.category.as_str())
        .bind(&template.subject)
        .bind(&template.html_body)
        .bind(&template.text_body)
        .bind(Json(&template.variables))
        .bind(template.is_public)
        .bind(template.is_active)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM email_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_usage(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE email_templates SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
