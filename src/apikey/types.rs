use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operations an API key may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    SendEmail,
    ReadLogs,
    ManageTemplates,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::SendEmail,
        Permission::ReadLogs,
        Permission::ManageTemplates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::SendEmail => "send_email",
            Permission::ReadLogs => "read_logs",
            Permission::ManageTemplates => "manage_templates",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send_email" => Ok(Permission::SendEmail),
            "read_logs" => Ok(Permission::ReadLogs),
            "manage_templates" => Ok(Permission::ManageTemplates),
            other => Err(format!("Unknown permission: {}", other)),
        }
    }
}

/// Granted when a creation request names no permissions
pub const DEFAULT_PERMISSIONS: [Permission; 2] = [Permission::SendEmail, Permission::ReadLogs];

/// Requests per minute when a creation request names no limit
pub const DEFAULT_RATE_LIMIT: u32 = 50;

/// Largest accepted limit; stored in an `INTEGER` column
pub const MAX_RATE_LIMIT: u32 = i32::MAX as u32;

/// A stored API key. The plaintext is never part of this record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub key_prefix: String,
    pub permissions: Vec<Permission>,
    pub rate_limit: u32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Active and not past its expiry
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
    #[serde(default)]
    pub rate_limit: Option<u32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Creation response: the stored key plus the plaintext, shown only here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKey {
    #[serde(flatten)]
    pub key: ApiKey,
    pub api_key: String,
}

/// Who a validated key acts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyIdentity {
    pub key_id: Uuid,
    pub user_id: String,
    pub key_prefix: String,
    pub permissions: Vec<Permission>,
    pub rate_limit: u32,
}

impl From<&ApiKey> for ApiKeyIdentity {
    fn from(key: &ApiKey) -> Self {
        Self {
            key_id: key.id,
            user_id: key.user_id.clone(),
            key_prefix: key.key_prefix.clone(),
            permissions: key.permissions.clone(),
            rate_limit: key.rate_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key() -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            name: "ci".to_string(),
            key_hash: "deadbeef".to_string(),
            key_prefix: "edunotify_abcdef".to_string(),
            permissions: DEFAULT_PERMISSIONS.to_vec(),
            rate_limit: DEFAULT_RATE_LIMIT,
            is_active: true,
            expires_at: None,
            last_used_at: None,
            revoked_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_hash_not_serialized() {
        let json = serde_json::to_value(key()).unwrap();
        assert!(json.get("keyHash").is_none());
        assert_eq!(json["keyPrefix"], "edunotify_abcdef");
        assert_eq!(json["permissions"], serde_json::json!(["send_email", "read_logs"]));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut key = key();
        assert!(key.is_usable(now));

        key.expires_at = Some(now - Duration::seconds(1));
        assert!(key.is_expired(now));
        assert!(!key.is_usable(now));

        key.expires_at = Some(now + Duration::hours(1));
        key.is_active = false;
        assert!(!key.is_usable(now));
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("read_logs".parse::<Permission>().unwrap(), Permission::ReadLogs);
        assert!("admin".parse::<Permission>().is_err());
        let parsed: Permission = serde_json::from_str("\"manage_templates\"").unwrap();
        assert_eq!(parsed, Permission::ManageTemplates);
    }
}
