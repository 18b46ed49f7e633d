//! Request extractors that resolve the caller from the bearer token.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use db::models::user::User;
use deployment::Deployment;
use secrecy::ExposeSecret;
use utils::identity::{self, IdentityError};

use crate::{DeploymentImpl, error::ApiError};

/// The signed-in caller. Rejects the request with 401 when the token is
/// missing, expired or not signed by the identity provider.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The caller when a token is present, `None` for anonymous requests.
/// A token that is present but invalid still yields 401.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<User>);

async fn resolve(parts: &Parts, deployment: &DeploymentImpl) -> Result<User, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = identity::bearer_token(header)?;

    let config = deployment.config();
    let claims = identity::verify_access_token(
        token,
        config.auth_jwt_secret.expose_secret().as_bytes(),
        &config.auth_jwt_audience,
    )?;

    Ok(deployment.ensure_user(&claims).await?)
}

impl FromRequestParts<DeploymentImpl> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, deployment).await.map(CurrentUser)
    }
}

impl FromRequestParts<DeploymentImpl> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        match resolve(parts, deployment).await {
            Ok(user) => Ok(OptionalUser(Some(user))),
            Err(ApiError::Identity(IdentityError::MissingToken)) => Ok(OptionalUser(None)),
            Err(e) => Err(e),
        }
    }
}
