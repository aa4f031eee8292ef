use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    config::{AppConfig, AuthProvider},
    error::ApiError,
    policy::{AccessLevel, authorize},
};

/// Google's published signing keys for Firebase ID tokens, in JWK form.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// AuthError
///
/// Outcome of a failed credential check. The two variants map to different status codes:
/// no credential at all is a 401, a credential that fails verification is a 403.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unauthorized: No token")]
    MissingToken,

    /// Carries the verifier's reason for logging; it is never sent to the client.
    #[error("Forbidden: Invalid token")]
    InvalidToken(String),
}

/// Claims
///
/// The subset of JWT claims the service reads. `email` is optional at the wire level
/// because some identity providers omit it, but a token without one is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity provider's user id.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    /// Resolves the caller identity carried by a verified token.
    pub fn into_identity(self) -> Result<Identity, AuthError> {
        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("token carries no email claim".to_string()))?;

        let name = match self.name.filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => email.split('@').next().unwrap_or_default().to_string(),
        };

        Ok(Identity {
            id: self.sub,
            email,
            name,
        })
    }
}

/// Identity
///
/// The verified caller of a single request. It is produced by [`IdentityVerifier::verify`]
/// and handed to handlers as an argument; nothing about it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// IdentityVerifier
///
/// Validates a bearer credential and resolves it to an [`Identity`]. Results are not
/// cached; every protected request pays for one verification.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// VerifierState
///
/// The shared handle stored in the application state.
pub type VerifierState = Arc<dyn IdentityVerifier>;

/// Builds the verifier selected by `AUTH_PROVIDER`.
pub fn verifier_from_config(config: &AppConfig) -> VerifierState {
    match &config.auth {
        AuthProvider::SharedSecret { secret } => Arc::new(JwtVerifier::new(secret)),
        AuthProvider::Firebase { project_id } => Arc::new(FirebaseVerifier::new(project_id)),
    }
}

/// JwtVerifier
///
/// HS256 tokens signed with a shared secret. Expiry is always enforced.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::InvalidToken("token expired".to_string()),
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        token_data.claims.into_identity()
    }
}

/// FirebaseVerifier
///
/// Verifies Firebase ID tokens: RS256, signed by one of Google's rotating keys, with the
/// project id as audience and `https://securetoken.google.com/<project>` as issuer.
/// The key set is fetched for every verification.
pub struct FirebaseVerifier {
    project_id: String,
    keys_url: String,
    client: reqwest::Client,
}

impl FirebaseVerifier {
    pub fn new(project_id: &str) -> Self {
        Self::with_keys_url(project_id, FIREBASE_JWKS_URL)
    }

    /// Points the verifier at a different JWK endpoint (used by tests).
    pub fn with_keys_url(project_id: &str, keys_url: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            keys_url: keys_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.keys_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::InvalidToken(format!("key fetch failed: {}", e)))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("key set unreadable: {}", e)))
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".to_string()))?;

        let keys = self.fetch_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key {}", kid)))?;
        let decoding_key =
            DecodingKey::from_jwk(jwk).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let token_data = decode::<Claims>(token, &decoding_key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        token_data.claims.into_identity()
    }
}

/// Pulls the raw token out of an `Authorization: Bearer <token>` header.
///
/// A missing header, a non-UTF-8 header, or a non-Bearer scheme all count as "no
/// credential". An empty token after the prefix is a credential that fails verification.
pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidToken("empty bearer token".to_string()));
    }

    Ok(token)
}

/// Resolves the caller of a request, if it presented a credential.
///
/// No credential is `Ok(None)`; whether that is acceptable is up to the access policy.
/// A credential that fails verification is always an error.
pub async fn resolve_caller(
    parts: &Parts,
    verifier: &dyn IdentityVerifier,
) -> Result<Option<Identity>, AuthError> {
    let token = match bearer_token(parts) {
        Ok(token) => token,
        Err(AuthError::MissingToken) => return Ok(None),
        Err(e) => return Err(e),
    };

    verifier.verify(token).await.map(Some)
}

/// Identity Extractor Implementation
///
/// Any handler that takes an [`Identity`] argument is an authenticated route: the
/// extractor resolves the caller with the configured verifier, then asks the access policy
/// to admit it at [`AccessLevel::Authenticated`]. Rejections are structured 401/403s.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = VerifierState::from_ref(state);

        let caller = resolve_caller(parts, verifier.as_ref())
            .await
            .inspect_err(|e| {
                if let AuthError::InvalidToken(reason) = e {
                    tracing::warn!(uri = %parts.uri, %reason, "token verification failed");
                }
            })?;

        if let Err(denial) = authorize(AccessLevel::Authenticated, caller.as_ref(), None) {
            tracing::debug!(uri = %parts.uri, "request without bearer credential");
            return Err(denial.into_api_error("access"));
        }

        caller.ok_or_else(|| AuthError::MissingToken.into())
    }
}
