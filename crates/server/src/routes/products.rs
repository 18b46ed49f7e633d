use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::product::{CreateProduct, Product, ProductQuery, UpdateProduct};
use deployment::Deployment;
use services::services::access::{self, DashboardTab};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::CurrentUser};

fn validate(product: &CreateProduct) -> Result<(), ApiError> {
    if product.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if product.category.trim().is_empty() {
        return Err(ApiError::BadRequest("category is required".to_string()));
    }
    if product.price_cents < 0 || product.original_price_cents.is_some_and(|c| c < 0) {
        return Err(ApiError::BadRequest("prices must not be negative".to_string()));
    }
    if product.stock < 0 {
        return Err(ApiError::BadRequest("stock must not be negative".to_string()));
    }
    if !(0.0..=5.0).contains(&product.rating) {
        return Err(ApiError::BadRequest("rating must be between 0 and 5".to_string()));
    }
    Ok(())
}

pub async fn list_products(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ProductQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Product>>>, ApiError> {
    let products = Product::search(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(products)))
}

pub async fn list_categories(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    let categories = Product::categories(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(categories)))
}

pub async fn get_product(
    State(deployment): State<DeploymentImpl>,
    Path(product_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Product>>, ApiError> {
    let product = Product::find_by_id(&deployment.db().pool, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(product)))
}

pub async fn create_product(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Product>>), ApiError> {
    access::require_tab(&user, DashboardTab::Products)?;
    validate(&payload)?;

    let product = Product::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(product))))
}

pub async fn update_product(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProduct>,
) -> Result<ResponseJson<ApiResponse<Product>>, ApiError> {
    access::require_tab(&user, DashboardTab::Products)?;
    let pool = &deployment.db().pool;
    let existing = Product::find_by_id(pool, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;

    let merged = payload.apply_to(existing);
    validate(&merged)?;
    let product = Product::update(pool, product_id, &merged).await?;
    Ok(ResponseJson(ApiResponse::success(product)))
}

pub async fn delete_product(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    access::require_tab(&user, DashboardTab::Products)?;
    let rows_affected = Product::delete(&deployment.db().pool, product_id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("product not found".to_string()));
    }
    info!(product_id = %product_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/categories", get(list_categories))
        .route(
            "/products/{product_id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use db::models::user::Role;

    use super::*;
    use crate::test_support;

    fn phone_case(price_cents: i64) -> CreateProduct {
        CreateProduct {
            name: "Slim case".to_string(),
            description: "Matte finish".to_string(),
            category: "accessories".to_string(),
            brand: Some("Blu".to_string()),
            price_cents,
            original_price_cents: None,
            stock: 12,
            image_url: None,
            specs: BTreeMap::from([("material".to_string(), "TPU".to_string())]),
            rating: 4.5,
            is_featured: true,
        }
    }

    #[tokio::test]
    async fn admin_manages_catalog() {
        let deployment = test_support::deployment().await;
        let admin = test_support::user(&deployment, "admin", Role::Admin).await;

        let (status, ResponseJson(created)) = create_product(
            State(deployment.clone()),
            CurrentUser(admin.clone()),
            Json(phone_case(1_999)),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let created = created.into_data().unwrap();

        let ResponseJson(updated) = update_product(
            State(deployment.clone()),
            CurrentUser(admin.clone()),
            Path(created.id),
            Json(UpdateProduct {
                stock: Some(3),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let updated = updated.into_data().unwrap();
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.price_cents, 1_999);
        assert_eq!(updated.specs.get("material").map(String::as_str), Some("TPU"));

        let status = delete_product(State(deployment.clone()), CurrentUser(admin), Path(created.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_product(State(deployment), Path(created.id)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_invalid_products_and_non_admins() {
        let deployment = test_support::deployment().await;
        let admin = test_support::user(&deployment, "admin", Role::Admin).await;
        let customer = test_support::user(&deployment, "cus", Role::Customer).await;

        let err = create_product(
            State(deployment.clone()),
            CurrentUser(admin.clone()),
            Json(phone_case(-1)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let mut too_good = phone_case(100);
        too_good.rating = 5.5;
        let err = create_product(State(deployment.clone()), CurrentUser(admin), Json(too_good))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = create_product(State(deployment), CurrentUser(customer), Json(phone_case(100)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn public_listing_filters() {
        let deployment = test_support::deployment().await;
        let admin = test_support::user(&deployment, "admin", Role::Admin).await;
        create_product(State(deployment.clone()), CurrentUser(admin), Json(phone_case(500)))
            .await
            .unwrap();

        let ResponseJson(found) = list_products(
            State(deployment.clone()),
            Query(ProductQuery {
                search: Some("SLIM".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.into_data().unwrap().len(), 1);

        let ResponseJson(categories) = list_categories(State(deployment)).await.unwrap();
        assert_eq!(categories.into_data().unwrap(), vec!["accessories".to_string()]);
    }
}
