use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deployment::DeploymentError;
use services::services::{
    access::AccessDenied, checkout::CheckoutError, repair_workflow::RepairWorkflowError,
    support_chat::SupportChatError,
};
use thiserror::Error;
use utils::{identity::IdentityError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(transparent)]
    RepairWorkflow(#[from] RepairWorkflowError),
    #[error(transparent)]
    SupportChat(#[from] SupportChatError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Identity(_) => StatusCode::UNAUTHORIZED,
            ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ApiError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Deployment(DeploymentError::Identity(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Deployment(DeploymentError::EmailInUse(_)) => StatusCode::CONFLICT,
            ApiError::Deployment(DeploymentError::Sqlx(sqlx::Error::RowNotFound)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Deployment(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Checkout(err) => match err {
                CheckoutError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::EmptyCart
                | CheckoutError::InvalidQuantity(_)
                | CheckoutError::IncompleteAddress(_) => StatusCode::BAD_REQUEST,
                CheckoutError::ProductNotFound(_) | CheckoutError::OrderNotFound => {
                    StatusCode::NOT_FOUND
                }
                CheckoutError::InsufficientStock { .. }
                | CheckoutError::InvalidTransition { .. }
                | CheckoutError::NotCancellable => StatusCode::CONFLICT,
            },
            ApiError::RepairWorkflow(err) => match err {
                RepairWorkflowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                RepairWorkflowError::AccessDenied(_) => StatusCode::FORBIDDEN,
                RepairWorkflowError::NotFound => StatusCode::NOT_FOUND,
                RepairWorkflowError::InvalidInput(_) | RepairWorkflowError::NotAFixer(_) => {
                    StatusCode::BAD_REQUEST
                }
                RepairWorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
            },
            ApiError::SupportChat(err) => match err {
                SupportChatError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SupportChatError::EmptyMessage | SupportChatError::MessageTooLong => {
                    StatusCode::BAD_REQUEST
                }
                SupportChatError::SessionNotFound => StatusCode::NOT_FOUND,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
