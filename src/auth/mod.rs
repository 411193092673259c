//! Bearer token verification.
//!
//! Tokens are issued elsewhere. This module only checks them: signature,
//! `exp`, and optionally `iss`/`aud`, before trusting `sub` as the caller's
//! identity. Handlers receive the result through the [`AuthUser`] extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::config::AuthConfig;
use crate::domain::UserId;
use crate::error::ApiError;

/// Role carried in the token's `roles` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May donate.
    Backer,
    /// May create and manage own campaigns.
    Creator,
    /// May delete any campaign.
    Admin,
}

/// Claims this service reads from a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: u64,
    /// Roles granted to the subject.
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User id from `sub`.
    pub user_id: UserId,
    /// Granted roles; `[Backer]` when the token lists none.
    pub roles: Vec<Role>,
}

impl Identity {
    /// Whether the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Requires `role`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Forbidden`] if the caller lacks it.
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("{role:?} role required")))
        }
    }
}

/// Token rejection reasons.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` header.
    #[error("missing bearer token")]
    MissingToken,

    /// Signature, expiry, issuer or audience check failed.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// `sub` is empty.
    #[error("token has no subject")]
    MissingSubject,

    /// Configured key material is unusable.
    #[error("invalid verification key: {0}")]
    Key(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

/// Verifies bearer tokens against the configured key.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("iss", &self.validation.iss)
            .field("aud", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Builds a verifier from configuration. RS256 wins when a public key
    /// is configured, HS256 is used otherwise.
    ///
    /// # Errors
    ///
    /// [`AuthError::Key`] when no key is configured or the PEM is invalid.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let (key, algorithm) = if let Some(pem) = &config.jwt_public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::Key(e.to_string()))?;
            (key, Algorithm::RS256)
        } else if let Some(secret) = &config.jwt_secret {
            (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        } else {
            return Err(AuthError::Key("no verification key configured".to_string()));
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Ok(Self { key, validation })
    }

    /// Verifies `token` and returns the caller identity.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] on any failed check,
    /// [`AuthError::MissingSubject`] for a blank `sub`.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }
        let roles = if claims.roles.is_empty() {
            vec![Role::Backer]
        } else {
            claims.roles
        };
        Ok(Identity {
            user_id: UserId::new(claims.sub),
            roles,
        })
    }
}

/// Extractor for an authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let identity = state.verifier.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            err
        })?;
        Ok(Self(identity))
    }
}
