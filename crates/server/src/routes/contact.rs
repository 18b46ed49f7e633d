use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, put},
};
use db::models::contact_message::{ContactMessage, CreateContactMessage};
use deployment::Deployment;
use serde::Deserialize;
use services::services::access::{self, DashboardTab};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

const MAX_CONTACT_MESSAGE_LENGTH: usize = 5000;

#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    #[serde(default)]
    pub unread: bool,
}

fn validate(message: &CreateContactMessage) -> Result<(), ApiError> {
    if message.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if !message.email.contains('@') {
        return Err(ApiError::BadRequest("email is not valid".to_string()));
    }
    let body = message.message.trim();
    if body.is_empty() || body.chars().count() > MAX_CONTACT_MESSAGE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "message must be between 1 and {MAX_CONTACT_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub async fn submit_contact_message(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateContactMessage>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ContactMessage>>), ApiError> {
    validate(&payload)?;
    let message = ContactMessage::create(&deployment.db().pool, &payload).await?;
    info!(contact_message_id = %message.id, "Contact message received");
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(message))))
}

pub async fn list_contact_messages(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ContactListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ContactMessage>>>, ApiError> {
    access::require_tab(&user, DashboardTab::Messages)?;
    let messages = ContactMessage::find_all(&deployment.db().pool, query.unread).await?;
    Ok(ResponseJson(ApiResponse::success(messages)))
}

pub async fn mark_contact_message_read(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ContactMessage>>, ApiError> {
    access::require_tab(&user, DashboardTab::Messages)?;
    let message = ContactMessage::mark_read(&deployment.db().pool, message_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("contact message not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(message)))
}

pub async fn delete_contact_message(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    access::require_tab(&user, DashboardTab::Messages)?;
    let rows_affected = ContactMessage::delete(&deployment.db().pool, message_id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("contact message not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/contact",
            get(list_contact_messages).post(submit_contact_message),
        )
        .route("/contact/{message_id}/read", put(mark_contact_message_read))
        .route("/contact/{message_id}", delete(delete_contact_message))
}
