use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::cms::{CmsContent, CmsDocument};
use deployment::Deployment;
use services::services::access::{self, DashboardTab};
use tracing::info;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

pub async fn get_cms(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<CmsDocument>>, ApiError> {
    let document = CmsDocument::load(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

pub async fn update_cms(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Json(content): Json<CmsContent>,
) -> Result<ResponseJson<ApiResponse<CmsDocument>>, ApiError> {
    access::require_tab(&user, DashboardTab::Cms)?;
    if content.hero.title.trim().is_empty() {
        return Err(ApiError::BadRequest("hero title is required".to_string()));
    }

    let document = CmsDocument::save(&deployment.db().pool, &content, user.id).await?;
    info!(updated_by = %user.id, "Site content updated");
    Ok(ResponseJson(ApiResponse::success(document)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/cms", get(get_cms).put(update_cms))
}
