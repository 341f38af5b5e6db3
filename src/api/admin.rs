//! Admin API
//! Mission: Dashboard figures and account administration for staff

use super::AppState;
use crate::{
    auth::{models::UserResponse, Identity, Role},
    error::ApiError,
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

const REVENUE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_orders: u64,
    pub total_customers: u64,
    pub total_revenue: f64,
    /// Reservations submitted since midnight UTC.
    pub new_bookings: u64,
}

#[derive(Debug, Serialize)]
pub struct Analytics {
    pub orders_by_status: BTreeMap<String, u64>,
    /// Paid revenue keyed by `YYYY-MM-DD`, starting seven days before today.
    pub revenue_by_day: BTreeMap<String, f64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/analytics", get(analytics))
        .route("/users", get(list_users))
        .route("/users/:id/activate", put(activate_user))
        .route("/users/:id/deactivate", put(deactivate_user))
}

/// GET /api/admin/dashboard
async fn dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<DashboardStats>, ApiError> {
    identity.require(Role::Admin)?;

    let midnight = start_of_today();

    let (total_users, total_customers, total_orders, total_revenue, new_bookings) = tokio::try_join!(
        state.users.count(None),
        state.users.count(Some(Role::Customer)),
        state.orders.count(None),
        state.orders.paid_revenue(),
        state.reservations.count_created_since(midnight),
    )?;

    Ok(Json(DashboardStats {
        total_users,
        total_orders,
        total_customers,
        total_revenue,
        new_bookings,
    }))
}

/// GET /api/admin/analytics
async fn analytics(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Analytics>, ApiError> {
    identity.require(Role::Admin)?;

    let since = start_of_today() - Duration::days(REVENUE_WINDOW_DAYS);
    let (orders_by_status, revenue_by_day) = tokio::try_join!(
        state.orders.count_by_status(),
        state.orders.paid_revenue_by_day(since),
    )?;

    Ok(Json(Analytics {
        orders_by_status,
        revenue_by_day,
    }))
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    identity.require(Role::Admin)?;
    let users = state.users.list().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// PUT /api/admin/users/:id/activate
async fn activate_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    identity.require(Role::Admin)?;
    let user = state.users.set_active(&user_id, true).await?;
    info!(admin_id = %identity.user_id, user_id = %user.id, "account activated");
    Ok(Json(UserResponse::from(&user)))
}

/// PUT /api/admin/users/:id/deactivate
async fn deactivate_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    identity.require(Role::Admin)?;
    if user_id == identity.user_id {
        return Err(ApiError::validation("You cannot deactivate your own account"));
    }
    let user = state.users.set_active(&user_id, false).await?;
    info!(admin_id = %identity.user_id, user_id = %user.id, "account deactivated");
    Ok(Json(UserResponse::from(&user)))
}

fn start_of_today() -> DateTime<Utc> {
    Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}
