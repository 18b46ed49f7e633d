use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::user::{UpdateProfile, User};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

const MAX_NAME_LENGTH: usize = 120;

pub async fn get_me(
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(user)))
}

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

pub async fn update_me(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfile>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let payload = UpdateProfile {
        full_name: normalize(payload.full_name),
        phone: normalize(payload.phone),
        avatar_url: normalize(payload.avatar_url),
    };
    if let Some(name) = &payload.full_name {
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(ApiError::BadRequest(format!(
                "fullName must be between 1 and {MAX_NAME_LENGTH} characters"
            )));
        }
    }

    let updated = User::update_profile(&deployment.db().pool, user.id, &payload).await?;
    tracing::debug!(user_id = %user.id, "Profile updated");
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/auth/me", get(get_me).patch(update_me))
}
