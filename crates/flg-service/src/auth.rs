//! Authentication extractor.
//!
//! Callers authenticate with an HS256 JWT issued by the identity provider.
//! A request without an `Authorization` header is served as
//! [`Identity::Anonymous`] so the ledger can reject it itself; a header that
//! is present but invalid is rejected here with 401.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use flg_core::{Identity, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The identity behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Who is calling.
    pub identity: Identity,
}

#[async_trait::async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self {
                identity: Identity::Anonymous,
            });
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let verifier = state.verifier.as_ref().ok_or_else(|| {
            tracing::debug!("Bearer token received but no JWT secret is configured");
            ApiError::Unauthorized
        })?;

        let user_id = verifier.verify(token)?;

        Ok(Self {
            identity: Identity::User(user_id),
        })
    }
}

/// JWT claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Audience (can be string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Validates bearer tokens against the shared secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for tokens signed with `secret` for `audience`.
    #[must_use]
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and return its subject.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the signature, audience or expiry
    /// is wrong, or the subject is not a valid user id.
    pub fn verify(&self, token: &str) -> Result<UserId, ApiError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })?;

        data.claims.sub.parse().map_err(|e| {
            tracing::debug!(error = %e, "JWT subject is not a valid user id");
            ApiError::Unauthorized
        })
    }
}
