use axum::Router;

use crate::DeploymentImpl;

pub mod auth;
pub mod cms;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod repairs;
pub mod support;
pub mod users;

pub fn router(deployment: DeploymentImpl) -> Router {
    let base_routes = Router::new()
        .merge(health::router(&deployment))
        .merge(auth::router(&deployment))
        .merge(users::router(&deployment))
        .merge(dashboard::router(&deployment))
        .merge(products::router(&deployment))
        .merge(repairs::router(&deployment))
        .merge(orders::router(&deployment))
        .merge(support::router(&deployment))
        .merge(contact::router(&deployment))
        .merge(cms::router(&deployment));

    Router::new()
        .nest("/api", base_routes)
        .with_state(deployment)
}
