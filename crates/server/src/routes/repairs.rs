use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    repair::{RepairIntake, RepairJob, RepairStatus, UpdateRepairDetails},
    repair_chat::{CreateRepairChatMessage, RepairChatMessage},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::ai_assistant::Diagnosis;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct RepairListQuery {
    pub status: Option<RepairStatus>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AssignFixerRequest {
    pub fixer_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateRepairStatusRequest {
    pub status: RepairStatus,
}

pub async fn preview_diagnosis(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(_user): CurrentUser,
    Json(intake): Json<RepairIntake>,
) -> Result<ResponseJson<ApiResponse<Diagnosis>>, ApiError> {
    let diagnosis = deployment.repairs().preview_diagnosis(&intake).await?;
    Ok(ResponseJson(ApiResponse::success(diagnosis)))
}

pub async fn create_repair(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Json(intake): Json<RepairIntake>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<RepairJob>>), ApiError> {
    let repair = deployment.repairs().submit(&user, intake).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(repair))))
}

pub async fn list_repairs(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RepairListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<RepairJob>>>, ApiError> {
    let repairs = deployment.repairs().list(&user, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(repairs)))
}

pub async fn get_repair(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(repair_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<RepairJob>>, ApiError> {
    let repair = deployment.repairs().get(&user, repair_id).await?;
    Ok(ResponseJson(ApiResponse::success(repair)))
}

pub async fn assign_fixer(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(repair_id): Path<Uuid>,
    Json(payload): Json<AssignFixerRequest>,
) -> Result<ResponseJson<ApiResponse<RepairJob>>, ApiError> {
    let repair = deployment
        .repairs()
        .assign(&user, repair_id, payload.fixer_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(repair)))
}

pub async fn update_status(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(repair_id): Path<Uuid>,
    Json(payload): Json<UpdateRepairStatusRequest>,
) -> Result<ResponseJson<ApiResponse<RepairJob>>, ApiError> {
    let repair = deployment
        .repairs()
        .advance_status(&user, repair_id, payload.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(repair)))
}

pub async fn update_details(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(repair_id): Path<Uuid>,
    Json(payload): Json<UpdateRepairDetails>,
) -> Result<ResponseJson<ApiResponse<RepairJob>>, ApiError> {
    let repair = deployment
        .repairs()
        .update_details(&user, repair_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(repair)))
}

pub async fn list_messages(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(repair_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<RepairChatMessage>>>, ApiError> {
    let messages = deployment.repairs().messages(&user, repair_id).await?;
    Ok(ResponseJson(ApiResponse::success(messages)))
}

pub async fn post_message(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(repair_id): Path<Uuid>,
    Json(payload): Json<CreateRepairChatMessage>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<RepairChatMessage>>), ApiError> {
    let message = deployment
        .repairs()
        .post_message(&user, repair_id, &payload.message)
        .await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(message))))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/repairs", get(list_repairs).post(create_repair))
        .route("/repairs/diagnose", post(preview_diagnosis))
        .route(
            "/repairs/{repair_id}",
            get(get_repair).patch(update_details),
        )
        .route("/repairs/{repair_id}/assign", put(assign_fixer))
        .route("/repairs/{repair_id}/status", put(update_status))
        .route(
            "/repairs/{repair_id}/messages",
            get(list_messages).post(post_message),
        )
}
