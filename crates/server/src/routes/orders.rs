use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    order::{Order, OrderStatus},
    user::{Role, User},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    access::{self, AccessDenied},
    checkout::{CheckoutService, PlaceOrder},
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

async fn load_visible(
    deployment: &DeploymentImpl,
    user: &User,
    order_id: Uuid,
) -> Result<Order, ApiError> {
    let order = Order::find_by_id(&deployment.db().pool, order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;
    if !access::can_view_order(user, &order) {
        return Err(AccessDenied {
            role: user.role,
            action: "view this order".to_string(),
        }
        .into());
    }
    Ok(order)
}

pub async fn place_order(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PlaceOrder>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Order>>), ApiError> {
    let order = CheckoutService::place_order(&deployment.db().pool, user.id, &payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(order))))
}

pub async fn list_orders(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Order>>>, ApiError> {
    let customer_id = (user.role != Role::Admin).then_some(user.id);
    let orders = Order::find_all(&deployment.db().pool, customer_id, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Order>>, ApiError> {
    let order = load_visible(&deployment, &user, order_id).await?;
    Ok(ResponseJson(ApiResponse::success(order)))
}

pub async fn update_order_status(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<ResponseJson<ApiResponse<Order>>, ApiError> {
    access::require_admin(&user, "update order status")?;
    let order =
        CheckoutService::update_status(&deployment.db().pool, order_id, payload.status).await?;
    Ok(ResponseJson(ApiResponse::success(order)))
}

pub async fn cancel_order(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Order>>, ApiError> {
    let order = load_visible(&deployment, &user, order_id).await?;
    let cancelled = CheckoutService::cancel(&deployment.db().pool, &user, &order).await?;
    Ok(ResponseJson(ApiResponse::success(cancelled)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/{order_id}", get(get_order))
        .route("/orders/{order_id}/status", put(update_order_status))
        .route("/orders/{order_id}/cancel", post(cancel_order))
}
