//! JWT authentication module.
//!
//! Tokens are minted by the external auth gate; this server only validates
//! them and turns the claims into a [`SessionContext`].
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! extract_bearer_token ──► JwtManager::validate_access_token ──► Claims
//!                                                                  │
//!                          Session(SessionContext) ◄── ensure_active(now)
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tally_core::SessionContext;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Display name of the signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: String,
}

impl Claims {
    pub fn into_session(self) -> Result<SessionContext, ApiError> {
        let issued_at = DateTime::<Utc>::from_timestamp(self.iat, 0)
            .ok_or_else(|| ApiError::unauthorized("Invalid token: bad iat"))?;
        let expires_at = DateTime::<Utc>::from_timestamp(self.exp, 0)
            .ok_or_else(|| ApiError::unauthorized("Invalid token: bad exp"))?;

        Ok(SessionContext {
            subject: self.sub,
            username: self.username,
            issued_at,
            expires_at,
        })
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>) -> Self {
        JwtManager {
            secret: secret.into(),
        }
    }

    /// Issue an access token. Used by tests and local tooling; production
    /// tokens come from the auth gate sharing the same secret.
    pub fn issue_token(
        &self,
        subject: &str,
        username: Option<&str>,
        lifetime: Duration,
    ) -> Result<String, ApiError> {
        let now = Utc::now();

        let claims = Claims {
            sub: subject.to_string(),
            username: username.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: "access".to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != "access" {
            return Err(ApiError::unauthorized("Expected access token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// Authenticated caller. Handlers that take this never run for an
/// anonymous or expired request.
#[derive(Debug, Clone)]
pub struct Session(pub SessionContext);

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Expected a bearer token"))?;

        let session = state.jwt.validate_access_token(token)?.into_session()?;
        session.ensure_active(Utc::now())?;

        debug!(user = %session.display_name(), "Authenticated request");
        Ok(Session(session))
    }
}
