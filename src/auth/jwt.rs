use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;

use super::Claims;

/// Verifies HS256 session tokens issued by the account service.
pub struct JwtValidator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::default();

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has no subject".to_string()));
        }

        Ok(token_data.claims)
    }

    /// Sign claims with the configured secret. Used by tooling and tests.
    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            issuer: None,
            audience: None,
        }
    }

    #[test]
    fn test_valid_token() {
        let validator = JwtValidator::new(&test_config());
        let token = validator.sign(&Claims::new("user-123", 3600)).unwrap();

        let claims = validator.validate(&token).unwrap();
        assert_eq!(claims.user_id(), "user-123");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_invalid_token() {
        let validator = JwtValidator::new(&test_config());
        let result = validator.validate("invalid-token");
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new(&test_config());
        let token = validator.sign(&Claims::new("user-123", -3600)).unwrap();
        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = JwtValidator::new(&JwtConfig {
            secret: "another-secret".to_string(),
            issuer: None,
            audience: None,
        });
        let token = other.sign(&Claims::new("user-123", 3600)).unwrap();

        let validator = JwtValidator::new(&test_config());
        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_empty_subject_rejected() {
        let validator = JwtValidator::new(&test_config());
        let token = validator.sign(&Claims::new("  ", 3600)).unwrap();
        assert!(matches!(
            validator.validate(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
