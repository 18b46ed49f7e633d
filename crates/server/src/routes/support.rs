use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::chat_session::ChatSession;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::access;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct SupportMessageRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    #[serde(default)]
    pub needs_attention: bool,
}

pub async fn get_session(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<ChatSession>>, ApiError> {
    let session = deployment.support_chat().session_for(user.id).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn send_message(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SupportMessageRequest>,
) -> Result<ResponseJson<ApiResponse<ChatSession>>, ApiError> {
    let session = deployment
        .support_chat()
        .send_user_message(user.id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn list_sessions(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SessionListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ChatSession>>>, ApiError> {
    access::require_admin(&user, "manage support sessions")?;
    let sessions = deployment
        .support_chat()
        .list_sessions(query.needs_attention)
        .await?;
    Ok(ResponseJson(ApiResponse::success(sessions)))
}

pub async fn reply_to_session(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SupportMessageRequest>,
) -> Result<ResponseJson<ApiResponse<ChatSession>>, ApiError> {
    access::require_admin(&user, "manage support sessions")?;
    let session = deployment
        .support_chat()
        .admin_reply(session_id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn release_session(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ChatSession>>, ApiError> {
    access::require_admin(&user, "manage support sessions")?;
    let session = deployment.support_chat().release(session_id).await?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/support/session", get(get_session))
        .route("/support/messages", post(send_message))
        .route("/support/sessions", get(list_sessions))
        .route("/support/sessions/{session_id}/reply", post(reply_to_session))
        .route("/support/sessions/{session_id}/release", post(release_session))
}
