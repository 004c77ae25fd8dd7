//! Authentication utilities
//!
//! Identity is issued by an external provider. This module only verifies
//! its HS256 bearer tokens and resolves the owner every flashcard operation
//! is scoped to.

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Owner of every record this request touches
    pub user_id: Uuid,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// JWT token manager
pub struct JwtManager {
    keys: Option<Keys>,
    dev_user_id: Option<Uuid>,
}

impl JwtManager {
    pub fn new(config: &AuthConfig) -> Self {
        let keys = config
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });

        Self {
            keys,
            dev_user_id: config.dev_user_id,
        }
    }

    /// Sign a token for `user_id`; used by tooling and tests
    pub fn generate_token(&self, user_id: Uuid, ttl_secs: i64) -> Result<String> {
        let keys = self.keys.as_ref().ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret is not configured".to_string(),
        })?;

        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &keys.encoding).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate a token and return the owner it names
    pub fn validate_token(&self, token: &str) -> Result<Uuid> {
        let keys = self.keys.as_ref().ok_or_else(|| AppError::Unauthorized {
            message: "Bearer tokens are not accepted by this deployment".to_string(),
        })?;

        let claims = decode::<JwtClaims>(token, &keys.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized {
                message: match e.kind() {
                    ErrorKind::ExpiredSignature => "Token has expired".to_string(),
                    _ => "Invalid token".to_string(),
                },
            })?;

        Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized {
            message: "Token subject is not a user id".to_string(),
        })
    }

    /// Owner for a request, from its Authorization header value
    pub fn resolve(&self, authorization: Option<&str>) -> Result<Uuid> {
        match authorization {
            Some(header) => {
                let token = extract_bearer(header).ok_or_else(|| AppError::Unauthorized {
                    message: "Authorization header must use the Bearer scheme".to_string(),
                })?;
                self.validate_token(token)
            }
            None => match (&self.keys, self.dev_user_id) {
                (None, Some(dev_user)) => Ok(dev_user),
                _ => Err(AppError::Unauthorized {
                    message: "Missing Authorization header".to_string(),
                }),
            },
        }
    }
}

/// Extract the token from an Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let authorization = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok());

        let jwt = Arc::<JwtManager>::from_ref(state);
        let user_id = jwt.resolve(authorization)?;

        Ok(AuthContext { user_id, request_id })
    }
}
