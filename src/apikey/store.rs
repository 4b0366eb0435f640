use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::storage::StoreError;

use super::types::ApiKey;

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Insert a new key; a duplicate digest is `StoreError::Conflict`.
    async fn insert(&self, key: &ApiKey) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ApiKey>, StoreError>;

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError>;

    /// Keys owned by `user_id`, newest first
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ApiKey>, StoreError>;

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Deactivate and stamp `revoked_at`
    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// In-memory key storage with a digest index
#[derive(Default)]
pub struct MemoryApiKeyRepository {
    keys: DashMap<Uuid, ApiKey>,
    by_hash: DashMap<String, Uuid>,
}

impl MemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for MemoryApiKeyRepository {
    async fn insert(&self, key: &ApiKey) -> Result<(), StoreError> {
        match self.by_hash.entry(key.key_hash.clone()) {
            dashmap::Entry::Occupied(_) => Err(StoreError::Conflict(key.key_prefix.clone())),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(key.id);
                self.keys.insert(key.id, key.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<ApiKey>, StoreError> {
        Ok(self.keys.get(&id).map(|k| k.clone()))
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        let id = match self.by_hash.get(key_hash) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.keys.get(&id).map(|k| k.clone()))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ApiKey>, StoreError> {
        let mut keys: Vec<ApiKey> = self
            .keys
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut key) = self.keys.get_mut(&id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut key) = self.keys.get_mut(&id) {
            key.is_active = false;
            key.revoked_at = Some(at);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
