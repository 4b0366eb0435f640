use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::ApiKeyMetrics;

use super::codec::{display_prefix, generate_secret, hash_secret};
use super::store::ApiKeyRepository;
use super::types::{
    ApiKey, ApiKeyIdentity, CreateApiKeyRequest, IssuedApiKey, DEFAULT_PERMISSIONS,
    DEFAULT_RATE_LIMIT, MAX_RATE_LIMIT,
};

/// Issues, validates and revokes API keys.
#[derive(Clone)]
pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
}

impl ApiKeyService {
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self { repository }
    }

    pub fn backend_name(&self) -> &'static str {
        self.repository.backend_name()
    }

    /// Create a key for `user_id`. The plaintext is only in the returned value.
    pub async fn issue(&self, user_id: &str, request: CreateApiKeyRequest) -> Result<IssuedApiKey> {
        let name = request.name.trim();
        if name.is_empty() || name.len() > 100 {
            return Err(AppError::InvalidInput(
                "API key name must be 1-100 characters".to_string(),
            ));
        }

        let rate_limit = request.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);
        if rate_limit == 0 {
            return Err(AppError::InvalidInput(
                "Rate limit must be at least 1 request per minute".to_string(),
            ));
        }
        if rate_limit > MAX_RATE_LIMIT {
            return Err(AppError::InvalidInput(format!(
                "Rate limit must be at most {} requests per minute",
                MAX_RATE_LIMIT
            )));
        }

        let now = Utc::now();
        if request.expires_at.is_some_and(|at| at <= now) {
            return Err(AppError::InvalidInput(
                "Expiry must be in the future".to_string(),
            ));
        }

        let permissions = match request.permissions {
            Some(requested) if !requested.is_empty() => {
                requested.into_iter().fold(Vec::new(), |mut acc, p| {
                    if !acc.contains(&p) {
                        acc.push(p);
                    }
                    acc
                })
            }
            _ => DEFAULT_PERMISSIONS.to_vec(),
        };

        let secret = generate_secret();
        let key = ApiKey {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            key_hash: hash_secret(&secret),
            key_prefix: display_prefix(&secret),
            permissions,
            rate_limit,
            is_active: true,
            expires_at: request.expires_at,
            last_used_at: None,
            revoked_at: None,
            created_at: now,
        };

        self.repository.insert(&key).await?;
        ApiKeyMetrics::record_issued();

        tracing::info!(
            api_key_id = %key.id,
            key_prefix = %key.key_prefix,
            user_id = %user_id,
            "API key issued"
        );

        Ok(IssuedApiKey {
            key,
            api_key: secret,
        })
    }

    /// Keys owned by `user_id`, newest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<ApiKey>> {
        Ok(self.repository.list_by_user(user_id).await?)
    }

    /// Resolve a presented key. `None` when unknown, revoked or expired.
    pub async fn validate(&self, candidate: &str) -> Result<Option<ApiKeyIdentity>> {
        let now = Utc::now();
        let key = match self.repository.find_by_hash(&hash_secret(candidate)).await? {
            Some(key) if key.is_usable(now) => key,
            _ => {
                ApiKeyMetrics::record_validation(false);
                tracing::debug!(key_prefix = %display_prefix(candidate), "API key rejected");
                return Ok(None);
            }
        };

        self.repository.touch_last_used(key.id, now).await?;
        ApiKeyMetrics::record_validation(true);

        Ok(Some(ApiKeyIdentity::from(&key)))
    }

    /// Deactivate a key owned by `user_id`.
    pub async fn revoke(&self, user_id: &str, id: Uuid) -> Result<ApiKey> {
        let mut key = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("API key not found: {}", id)))?;

        if key.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only revoke your own API keys".to_string(),
            ));
        }

        let now = Utc::now();
        self.repository.revoke(id, now).await?;
        key.is_active = false;
        key.revoked_at = Some(now);
        ApiKeyMetrics::record_revoked();

        tracing::info!(api_key_id = %id, key_prefix = %key.key_prefix, "API key revoked");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apikey::{MemoryApiKeyRepository, Permission, API_KEY_PREFIX};
    use chrono::Duration;

    fn service() -> ApiKeyService {
        ApiKeyService::new(Arc::new(MemoryApiKeyRepository::new()))
    }

    fn request(name: &str) -> CreateApiKeyRequest {
        CreateApiKeyRequest {
            name: name.to_string(),
            permissions: None,
            rate_limit: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_issue_defaults() {
        let service = service();
        let issued = service.issue("alice", request("ci")).await.unwrap();

        assert!(issued.api_key.starts_with(API_KEY_PREFIX));
        assert_eq!(issued.key.key_prefix, &issued.api_key[..16]);
        assert_eq!(issued.key.key_hash, hash_secret(&issued.api_key));
        assert_eq!(
            issued.key.permissions,
            vec![Permission::SendEmail, Permission::ReadLogs]
        );
        assert_eq!(issued.key.rate_limit, 50);
    }

    #[tokio::test]
    async fn test_validate_updates_last_used() {
        let service = service();
        let issued = service.issue("alice", request("ci")).await.unwrap();

        let identity = service.validate(&issued.api_key).await.unwrap().unwrap();
        assert_eq!(identity.user_id, "alice");
        assert_eq!(identity.key_id, issued.key.id);

        let stored = service.list("alice").await.unwrap();
        assert!(stored[0].last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_altered_key_fails() {
        let service = service();
        let issued = service.issue("alice", request("ci")).await.unwrap();

        let mut altered = issued.api_key.clone();
        let last = altered.pop().unwrap();
        altered.push(if last == 'a' { 'b' } else { 'a' });

        assert!(service.validate(&altered).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_rules() {
        let service = service();
        let issued = service.issue("alice", request("ci")).await.unwrap();

        let err = service.revoke("bob", issued.key.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(service.validate(&issued.api_key).await.unwrap().is_some());

        let revoked = service.revoke("alice", issued.key.id).await.unwrap();
        assert!(!revoked.is_active);
        assert!(revoked.revoked_at.is_some());
        assert!(service.validate(&issued.api_key).await.unwrap().is_none());

        let err = service.revoke("alice", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expiry_validation() {
        let service = service();
        let mut req = request("ci");
        req.expires_at = Some(Utc::now() - Duration::minutes(1));
        assert!(matches!(
            service.issue("alice", req).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let mut req = request("ci");
        req.rate_limit = Some(0);
        assert!(matches!(
            service.issue("alice", req).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_upper_bound() {
        let service = service();

        let mut req = request("ci");
        req.rate_limit = Some(3_000_000_000);
        assert!(matches!(
            service.issue("alice", req).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
        assert!(service.list("alice").await.unwrap().is_empty());

        let mut req = request("ci");
        req.rate_limit = Some(MAX_RATE_LIMIT);
        let issued = service.issue("alice", req).await.unwrap();
        assert_eq!(issued.key.rate_limit, MAX_RATE_LIMIT);
    }

    #[tokio::test]
    async fn test_expired_key_is_rejected_without_touching() {
        let repository = Arc::new(MemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repository.clone());

        let secret = generate_secret();
        let created_at = Utc::now() - Duration::days(2);
        let key = ApiKey {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            name: "old".to_string(),
            key_hash: hash_secret(&secret),
            key_prefix: display_prefix(&secret),
            permissions: DEFAULT_PERMISSIONS.to_vec(),
            rate_limit: DEFAULT_RATE_LIMIT,
            is_active: true,
            expires_at: Some(Utc::now() - Duration::days(1)),
            last_used_at: None,
            revoked_at: None,
            created_at,
        };
        repository.insert(&key).await.unwrap();

        assert!(service.validate(&secret).await.unwrap().is_none());

        let stored = repository.get(key.id).await.unwrap().unwrap();
        assert!(stored.last_used_at.is_none());
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped() {
        let service = service();
        service.issue("alice", request("one")).await.unwrap();
        service.issue("alice", request("two")).await.unwrap();
        service.issue("bob", request("three")).await.unwrap();

        assert_eq!(service.list("alice").await.unwrap().len(), 2);
        assert_eq!(service.list("bob").await.unwrap().len(), 1);
    }
}
