use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::user::{Role, User};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::access::{self, DashboardTab};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

pub async fn list_users(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<UserListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    access::require_tab(&user, DashboardTab::Users)?;
    let users = User::find_all(&deployment.db().pool, query.role).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn update_user_role(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(admin): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    access::require_tab(&admin, DashboardTab::Users)?;
    if admin.id == user_id {
        return Err(ApiError::Conflict("admins cannot change their own role".to_string()));
    }

    let updated = User::update_role(&deployment.db().pool, user_id, payload.role).await?;
    info!(user_id = %user_id, role = %payload.role, changed_by = %admin.id, "User role changed");
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}/role", put(update_user_role))
}
