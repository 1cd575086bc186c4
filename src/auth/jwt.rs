//! JWT handling for report callers
//!
//! Tokens are HS256 signed and carry the caller's role and territory so the
//! reporting endpoints can scope data without a user lookup.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{Role, User};
use crate::types::ReportError;

const MIN_SECRET_LEN: usize = 32;

/// Payload stored in JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub territory: Vec<String>,
    #[serde(default)]
    pub principals: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    pub fn to_user(&self) -> User {
        User::new(self.sub.clone(), self.role.clone())
            .with_territory(self.territory.iter().cloned())
            .with_principals(self.principals.iter().cloned())
    }
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }

    /// Collapse into the caller's claims or an `Unauthorized` error
    pub fn into_claims(self) -> Result<Claims, ReportError> {
        match (self.valid, self.claims) {
            (true, Some(claims)) => Ok(claims),
            _ => Err(ReportError::Unauthorized(
                self.error.unwrap_or_else(|| "Invalid token".to_string()),
            )),
        }
    }
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, ReportError> {
        if secret.is_empty() {
            return Err(ReportError::Config(
                "JWT_SECRET is required outside dev mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(ReportError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Create a validator for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry_seconds: 3600,
        }
    }

    /// Issue a token for a user
    pub fn generate_token(&self, user: &User) -> Result<String, ReportError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ReportError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role.clone(),
            territory: user.territory.clone(),
            principals: user.principals.clone(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ReportError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(token_data) => TokenValidationResult::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new(
            "test-secret-that-is-at-least-32-characters-long".into(),
            3600,
        )
        .unwrap()
    }

    #[test]
    fn test_generate_and_verify_token() {
        let validator = test_validator();
        let user = User::new("broker-7", Role::Broker)
            .with_territory(["CA", "90210"])
            .with_principals(["Acme Foods"]);

        let token = validator.generate_token(&user).unwrap();
        let claims = validator.verify_token(&token).into_claims().unwrap();

        assert_eq!(claims.sub, "broker-7");
        assert_eq!(claims.role, Role::Broker);
        assert_eq!(claims.principals, vec!["Acme Foods"]);
        assert_eq!(claims.to_user(), user);
    }

    #[test]
    fn test_invalid_token() {
        let result = test_validator().verify_token("invalid-token");
        assert!(!result.valid);
        assert!(matches!(
            result.into_claims(),
            Err(ReportError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let other = JwtValidator::new(
            "different-secret-that-is-at-least-32-characters".into(),
            3600,
        )
        .unwrap();
        let token = test_validator()
            .generate_token(&User::new("u1", Role::Admin))
            .unwrap();

        assert!(!other.verify_token(&token).valid);
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
        assert_eq!(extract_token_from_header(Some("abc123")), None);
    }

    #[test]
    fn test_secret_validation() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new("".into(), 3600).is_err());
        assert!(JwtValidator::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }
}
