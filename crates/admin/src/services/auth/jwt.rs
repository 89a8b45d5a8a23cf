//! Bearer tokens for API clients.
//!
//! HS256 tokens carrying the admin's identity and role. A valid token is
//! turned back into a [`CurrentAdmin`] without touching the database, so
//! role changes take effect when the token expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cobbler_core::{AdminRole, AdminUserId, Email};

use crate::config::JwtConfig;
use crate::models::CurrentAdmin;

pub const ISSUER: &str = "cobbler-admin";
pub const AUDIENCE: &str = "cobbler-admin-api";

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin user ID.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token generation failed: {0}")]
    GenerationFailed(String),
}

/// A freshly signed token and when it stops being accepted.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    /// Sign a token for `admin`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::GenerationFailed` if encoding fails.
    pub fn issue(&self, admin: &CurrentAdmin) -> Result<IssuedToken, JwtError> {
        self.issue_at(admin, Utc::now())
    }

    fn issue_at(&self, admin: &CurrentAdmin, now: DateTime<Utc>) -> Result<IssuedToken, JwtError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: admin.id.to_string(),
            email: admin.email.to_string(),
            name: admin.name.clone(),
            role: admin.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: ISSUER.to_owned(),
            aud: AUDIENCE.to_owned(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token and decode its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::ExpiredToken`, `JwtError::InvalidSignature` or
    /// `JwtError::InvalidToken`.
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.leeway = 30;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            })
    }

    /// Validate a token and rebuild the admin identity it carries.
    ///
    /// # Errors
    ///
    /// Returns a [`JwtError`] if the token is invalid or its claims are
    /// malformed.
    pub fn authenticate(&self, token: &str) -> Result<CurrentAdmin, JwtError> {
        let claims = self.validate(token)?;
        let id: i32 = claims
            .sub
            .parse()
            .map_err(|_| JwtError::InvalidToken("subject is not an admin id".to_owned()))?;
        let email = Email::parse(&claims.email)
            .map_err(|e| JwtError::InvalidToken(format!("bad email claim: {e}")))?;

        Ok(CurrentAdmin {
            id: AdminUserId::new(id),
            email,
            name: claims.name,
            role: claims.role,
        })
    }

    /// Extract the token from an `Authorization` header value.
    #[must_use]
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(secret: &str, ttl_minutes: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: SecretString::from(secret.to_owned()),
            ttl_minutes,
        })
    }

    fn admin() -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(7),
            email: Email::parse("cobbler@example.com").unwrap(),
            name: "Ada Cobbler".to_owned(),
            role: AdminRole::Admin,
        }
    }

    #[test]
    fn test_issue_and_authenticate() {
        let jwt = service("k3P9xQ2mV7rT5wY8zB4nL6cF1hJ0sD3a", 60);
        let issued = jwt.issue(&admin()).unwrap();
        assert_eq!(jwt.authenticate(&issued.token).unwrap(), admin());

        let claims = jwt.validate(&issued.token).unwrap();
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = service("k3P9xQ2mV7rT5wY8zB4nL6cF1hJ0sD3a", 10);
        let issued = jwt
            .issue_at(&admin(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(matches!(
            jwt.validate(&issued.token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = service("k3P9xQ2mV7rT5wY8zB4nL6cF1hJ0sD3a", 60)
            .issue(&admin())
            .unwrap();
        let other = service("Zq8Lw3Nv6Xb1Mc4Kd7Jf0Hg2Ps5Rt9Ye", 60);
        assert!(matches!(
            other.validate(&issued.token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = service("k3P9xQ2mV7rT5wY8zB4nL6cF1hJ0sD3a", 60);
        assert!(matches!(
            jwt.validate("not.a.token"),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc.def"), Some("abc.def"));
        assert_eq!(JwtService::extract_from_header("Bearer  "), None);
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
