use uuid::Uuid;

use crate::apikey::{ApiKeyIdentity, Permission};
use crate::error::AppError;

/// How the caller proved its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Session,
    ApiKey { key_id: Uuid, key_prefix: String },
}

/// Authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub method: AuthMethod,
    pub permissions: Vec<Permission>,
}

impl AuthContext {
    /// Session callers hold every permission.
    pub fn session(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            method: AuthMethod::Session,
            permissions: Permission::ALL.to_vec(),
        }
    }

    pub fn api_key(identity: &ApiKeyIdentity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            method: AuthMethod::ApiKey {
                key_id: identity.key_id,
                key_prefix: identity.key_prefix.clone(),
            },
            permissions: identity.permissions.clone(),
        }
    }

    pub fn is_session(&self) -> bool {
        self.method == AuthMethod::Session
    }

    pub fn api_key_id(&self) -> Option<Uuid> {
        match &self.method {
            AuthMethod::ApiKey { key_id, .. } => Some(*key_id),
            AuthMethod::Session => None,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing permission: {}",
                permission
            )))
        }
    }

    /// API keys cannot manage other API keys.
    pub fn require_session(&self) -> Result<(), AppError> {
        if self.is_session() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "API keys can only be managed with a session token".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_identity(permissions: Vec<Permission>) -> ApiKeyIdentity {
        ApiKeyIdentity {
            key_id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            key_prefix: "edunotify_0123ab".to_string(),
            permissions,
            rate_limit: 50,
        }
    }

    #[test]
    fn test_session_holds_all_permissions() {
        let ctx = AuthContext::session("user-1");
        assert!(ctx.is_session());
        assert!(ctx.api_key_id().is_none());
        for permission in Permission::ALL {
            assert!(ctx.require(permission).is_ok());
        }
        assert!(ctx.require_session().is_ok());
    }

    #[test]
    fn test_api_key_limited_to_its_permissions() {
        let identity = key_identity(vec![Permission::SendEmail]);
        let ctx = AuthContext::api_key(&identity);

        assert_eq!(ctx.api_key_id(), Some(identity.key_id));
        assert!(ctx.require(Permission::SendEmail).is_ok());
        assert!(matches!(
            ctx.require(Permission::ManageTemplates),
            Err(AppError::Forbidden(_))
        ));
        assert!(ctx.require_session().is_err());
    }
}
