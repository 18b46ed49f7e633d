//! Which views, dashboard tabs and records each role may reach.

use db::models::{order::Order, repair::RepairJob, user::{Role, User}};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{role} is not allowed to {action}")]
pub struct AccessDenied {
    pub role: Role,
    pub action: String,
}

impl AccessDenied {
    pub(crate) fn new(role: Role, action: impl Into<String>) -> Self {
        Self {
            role,
            action: action.into(),
        }
    }
}

/// Top-level pages of the web application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum View {
    Home,
    Shop,
    Product,
    Repair,
    Contact,
    Login,
    Checkout,
    Dashboard,
    Support,
}

impl View {
    pub const ALL: [View; 9] = [
        View::Home,
        View::Shop,
        View::Product,
        View::Repair,
        View::Contact,
        View::Login,
        View::Checkout,
        View::Dashboard,
        View::Support,
    ];

    pub fn requires_sign_in(self) -> bool {
        matches!(self, View::Checkout | View::Dashboard | View::Support)
    }

    /// `role` is `None` for anonymous visitors.
    pub fn is_accessible(self, role: Option<Role>) -> bool {
        match (self, role) {
            (View::Login, Some(_)) => false,
            (view, None) => !view.requires_sign_in(),
            (_, Some(_)) => true,
        }
    }
}

pub fn accessible_views(role: Option<Role>) -> Vec<View> {
    View::ALL
        .into_iter()
        .filter(|v| v.is_accessible(role))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DashboardTab {
    Overview,
    Orders,
    Repairs,
    AssignedJobs,
    Users,
    Products,
    Messages,
    Cms,
    Support,
    Profile,
}

impl DashboardTab {
    pub fn allowed_for(role: Role) -> &'static [DashboardTab] {
        use DashboardTab::*;
        match role {
            Role::Customer => &[Overview, Orders, Repairs, Support, Profile],
            Role::Fixer => &[Overview, AssignedJobs, Profile],
            Role::Admin => &[
                Overview, Users, Products, Repairs, Orders, Messages, Cms, Support, Profile,
            ],
        }
    }

    pub fn is_allowed_for(self, role: Role) -> bool {
        Self::allowed_for(role).contains(&self)
    }
}

pub fn require_tab(user: &User, tab: DashboardTab) -> Result<(), AccessDenied> {
    if tab.is_allowed_for(user.role) {
        Ok(())
    } else {
        Err(AccessDenied::new(user.role, format!("open the {tab} tab")))
    }
}

pub fn require_role(user: &User, allowed: &[Role], action: &str) -> Result<(), AccessDenied> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AccessDenied::new(user.role, action))
    }
}

pub fn require_admin(user: &User, action: &str) -> Result<(), AccessDenied> {
    require_role(user, &[Role::Admin], action)
}

/// Owner, assigned fixer, or admin.
pub fn can_view_repair(user: &User, repair: &RepairJob) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Fixer => repair.fixer_id == Some(user.id) || repair.customer_id == user.id,
        Role::Customer => repair.customer_id == user.id,
    }
}

/// Assigned fixer or admin.
pub fn can_work_on_repair(user: &User, repair: &RepairJob) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Fixer => repair.fixer_id == Some(user.id),
        Role::Customer => false,
    }
}

pub fn can_view_order(user: &User, order: &Order) -> bool {
    user.role == Role::Admin || order.customer_id == user.id
}
