//! Verification of access tokens issued by the external identity provider.
//!
//! The provider signs HS256 tokens with a project secret shared with this
//! service. The `sub` claim is the user id and doubles as the profile id.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
/// Only an absent header counts as a missing token.
pub fn bearer_token(header_value: Option<&str>) -> Result<&str, IdentityError> {
    let value = header_value.ok_or(IdentityError::MissingToken)?;
    let malformed = || IdentityError::Invalid("expected `Bearer <token>`".to_string());
    let (scheme, token) = value.trim().split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(malformed());
    }
    Ok(token.trim())
}

pub fn verify_access_token(
    token: &str,
    secret: &[u8],
    audience: &str,
) -> Result<IdentityClaims, IdentityError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);
    validation.leeway = 30;

    decode::<IdentityClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => IdentityError::Expired,
            _ => IdentityError::Invalid(e.to_string()),
        })
}
