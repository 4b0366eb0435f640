//! Template storage with CRUD operations

use async_trait::async_trait;
use dashmap::DashMap;

use crate::storage::StoreError;

use super::types::{Template, TemplateFilter};

/// Storage backend for templates.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are shared
/// across request handlers.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Insert a new template; fails with `StoreError::Conflict` on a duplicate id.
    async fn insert(&self, template: &Template) -> Result<(), StoreError>;

    /// Get a template by ID
    async fn get(&self, id: &str) -> Result<Option<Template>, StoreError>;

    /// Templates owned by `user_id` or public, newest first
    async fn list_visible(
        &self,
        user_id: &str,
        filter: &TemplateFilter,
    ) -> Result<Vec<Template>, StoreError>;

    /// Overwrite an existing template
    async fn update(&self, template: &Template) -> Result<(), StoreError>;

    /// Delete a template; returns whether it existed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Add one to the usage counter
    async fn increment_usage(&self, id: &str) -> Result<(), StoreError>;

    /// Backend type identifier
    fn backend_name(&self) -> &'static str;
}

/// In-memory template storage
pub struct MemoryTemplateRepository {
    templates: DashMap<String, Template>,
}

impl Default for MemoryTemplateRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTemplateRepository {
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }
}

#[async_trait]
impl TemplateRepository for MemoryTemplateRepository {
    async fn insert(&self, template: &Template) -> Result<(), StoreError> {
        match self.templates.entry(template.id.clone()) {
            dashmap::Entry::Occupied(_) => Err(StoreError::Conflict(template.id.clone())),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(template.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Template>, StoreError> {
        Ok(self.templates.get(id).map(|t| t.clone()))
    }

    async fn list_visible(
        &self,
        user_id: &str,
        filter: &TemplateFilter,
    ) -> Result<Vec<Template>, StoreError> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .filter(|entry| entry.is_visible_to(user_id) && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn update(&self, template: &Template) -> Result<(), StoreError> {
        self.templates.insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.templates.remove(id).is_some())
    }

    async fn increment_usage(&self, id: &str) -> Result<(), StoreError> {
        if let Some(mut template) = self.templates.get_mut(id) {
            template.usage_count += 1;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
