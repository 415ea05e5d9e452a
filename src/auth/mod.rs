mod extractor;

pub use extractor::{FORWARDED_ROLE_HEADER, FORWARDED_USER_HEADER};

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AuthUser, Claims};

/// JWT Authentication Service
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
    trust_forwarded_identity: bool,
    admin_role: String,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry_seconds: config.jwt_expiry_seconds,
            trust_forwarded_identity: config.trust_forwarded_identity,
            admin_role: config.admin_role.clone(),
        }
    }

    /// Generate a JWT token for a user with the given role
    pub fn generate_token(&self, user_id: &str, role: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let exp = now + self.expiry_seconds as i64;

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a JWT token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;

        if token_data.claims.sub.is_empty() || token_data.claims.role.is_empty() {
            return Err(AppError::Unauthenticated(
                "Token is missing identity or role".to_string(),
            ));
        }

        Ok(token_data.claims)
    }

    pub fn trusts_forwarded_identity(&self) -> bool {
        self.trust_forwarded_identity
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub fn is_admin(&self, user: &AuthUser) -> bool {
        user.role == self.admin_role
    }
}

impl AuthUser {
    /// Capability check against an allowed role set.
    pub fn require_role(&self, allowed: &[&str]) -> Result<()> {
        if allowed.iter().any(|role| *role == self.role) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, role = %self.role, "Role not permitted");
            Err(AppError::Unauthorized(
                "Insufficient role for this operation".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_generate_and_validate_token() {
        let config = test_config();
        let auth = AuthService::new(&config);

        let token = auth
            .generate_token("user-123", "teacher")
            .expect("Should generate token");

        let claims = auth.validate_token(&token).expect("Should validate token");

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.role, "teacher");
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();
        let auth = AuthService::new(&config);

        let result = auth.validate_token("invalid-token");
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let mut other = test_config();
        other.jwt_secret = "another-secret".to_string();
        let token = AuthService::new(&other)
            .generate_token("user-123", "teacher")
            .unwrap();

        let auth = AuthService::new(&test_config());
        assert!(auth.validate_token(&token).is_err());
    }

    #[test]
    fn test_require_role() {
        let admin = AuthUser {
            user_id: "a1".to_string(),
            role: "admin".to_string(),
        };
        let parent = AuthUser {
            user_id: "p1".to_string(),
            role: "parent".to_string(),
        };

        assert!(admin.require_role(&["admin"]).is_ok());
        assert!(matches!(
            parent.require_role(&["admin"]),
            Err(AppError::Unauthorized(_))
        ));

        let auth = AuthService::new(&test_config());
        assert!(auth.is_admin(&admin));
        assert!(!auth.is_admin(&parent));
    }
}
