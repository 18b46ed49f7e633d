//! Navigation, dashboard tabs and the per-role overview numbers.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    chat_session::ChatSession,
    contact_message::ContactMessage,
    order::Order,
    product::Product,
    repair::{RepairJob, RepairScope, RepairStatus},
    user::{Role, User},
};
use deployment::Deployment;
use serde::Serialize;
use services::services::access::{self, DashboardTab, View};
use sqlx::SqlitePool;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::auth::{CurrentUser, OptionalUser},
};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub signed_in: bool,
    pub role: Option<Role>,
    pub views: Vec<View>,
}

#[derive(Debug, PartialEq, Serialize, TS)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum DashboardStats {
    Customer {
        order_count: i64,
        active_repairs: i64,
    },
    Fixer {
        assigned_active_jobs: i64,
        completed_jobs: i64,
    },
    Admin {
        users: i64,
        products: i64,
        revenue_cents: i64,
        pending_repairs: i64,
        unread_messages: i64,
        sessions_needing_attention: i64,
    },
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub role: Role,
    pub tabs: Vec<DashboardTab>,
    pub stats: DashboardStats,
}

async fn stats_for(pool: &SqlitePool, user: &User) -> Result<DashboardStats, sqlx::Error> {
    Ok(match user.role {
        Role::Customer => DashboardStats::Customer {
            order_count: Order::count_for_customer(pool, user.id).await?,
            active_repairs: RepairJob::count_active(pool, RepairScope::Customer(user.id)).await?,
        },
        Role::Fixer => DashboardStats::Fixer {
            assigned_active_jobs: RepairJob::count_active(pool, RepairScope::Fixer(user.id))
                .await?,
            completed_jobs: RepairJob::count_finished(pool, RepairScope::Fixer(user.id)).await?,
        },
        Role::Admin => DashboardStats::Admin {
            users: User::count(pool).await?,
            products: Product::count(pool).await?,
            revenue_cents: Order::revenue_cents(pool).await?,
            pending_repairs: RepairJob::count_with_status(pool, RepairStatus::Pending).await?,
            unread_messages: ContactMessage::count_unread(pool).await?,
            sessions_needing_attention: ChatSession::count_needing_attention(pool).await?,
        },
    })
}

pub async fn get_navigation(
    OptionalUser(user): OptionalUser,
) -> Result<ResponseJson<ApiResponse<Navigation>>, ApiError> {
    let role = user.map(|u| u.role);
    Ok(ResponseJson(ApiResponse::success(Navigation {
        signed_in: role.is_some(),
        role,
        views: access::accessible_views(role),
    })))
}

pub async fn get_dashboard(
    State(deployment): State<DeploymentImpl>,
    CurrentUser(user): CurrentUser,
) -> Result<ResponseJson<ApiResponse<Dashboard>>, ApiError> {
    let stats = stats_for(&deployment.db().pool, &user).await?;
    Ok(ResponseJson(ApiResponse::success(Dashboard {
        role: user.role,
        tabs: DashboardTab::allowed_for(user.role).to_vec(),
        stats,
    })))
}

pub async fn check_tab(
    CurrentUser(user): CurrentUser,
    Path(tab): Path<DashboardTab>,
) -> Result<StatusCode, ApiError> {
    access::require_tab(&user, tab)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/navigation", get(get_navigation))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/tabs/{tab}", get(check_tab))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use db::models::product::CreateProduct;
    use uuid::Uuid;

    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn anonymous_navigation_hides_private_views() {
        let ResponseJson(response) = get_navigation(OptionalUser(None)).await.unwrap();
        let navigation = response.into_data().unwrap();
        assert!(!navigation.signed_in);
        assert!(navigation.views.contains(&View::Login));
        assert!(!navigation.views.contains(&View::Dashboard));
    }

    #[tokio::test]
    async fn tabs_follow_role() {
        let deployment = test_support::deployment().await;
        let fixer = test_support::user(&deployment, "fix", Role::Fixer).await;

        let status = check_tab(CurrentUser(fixer.clone()), Path(DashboardTab::AssignedJobs))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = check_tab(CurrentUser(fixer), Path(DashboardTab::Orders))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_overview_counts() {
        let deployment = test_support::deployment().await;
        let admin = test_support::user(&deployment, "admin", Role::Admin).await;
        test_support::user(&deployment, "cus", Role::Customer).await;
        Product::create(
            &deployment.db().pool,
            &CreateProduct {
                name: "Tempered glass".to_string(),
                description: String::new(),
                category: "accessories".to_string(),
                brand: None,
                price_cents: 900,
                original_price_cents: None,
                stock: 40,
                image_url: None,
                specs: BTreeMap::new(),
                rating: 0.0,
                is_featured: false,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let ResponseJson(response) = get_dashboard(State(deployment), CurrentUser(admin))
            .await
            .unwrap();
        let dashboard = response.into_data().unwrap();
        assert_eq!(dashboard.role, Role::Admin);
        assert!(dashboard.tabs.contains(&DashboardTab::Cms));
        assert_eq!(
            dashboard.stats,
            DashboardStats::Admin {
                users: 2,
                products: 1,
                revenue_cents: 0,
                pending_repairs: 0,
                unread_messages: 0,
                sessions_needing_attention: 0,
            }
        );
    }
}
