//! Orders API
//! Mission: Take guest and customer orders priced from the live menu

use super::{menu::required_text, AppState};
use crate::{
    auth::{service::validate_email, Identity, Role},
    error::ApiError,
    store::{
        menu::MenuItem,
        orders::{
            round_cents, CustomerInfo, NewOrder, Order, OrderFilter, OrderItem, OrderStatus,
            OrderUpdate,
        },
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Per-line quantity ceiling.
const MAX_QUANTITY: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub menu_item_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GuestOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Order from a signed-in customer; ownership comes from the token.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub pending_orders: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", collection())
        .route("/guest", post(create_guest_order))
        .route("/stats", get(order_stats))
        .route(
            "/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
}

pub(crate) fn collection() -> MethodRouter<AppState> {
    get(list_orders).post(create_order)
}

/// POST /api/orders/guest
async fn create_guest_order(
    State(state): State<AppState>,
    Json(payload): Json<GuestOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let customer_info = validate_customer(payload.customer_info)?;
    let items = price_lines(&state, payload.items).await?;

    let order = state
        .orders
        .insert(NewOrder {
            user_id: None,
            customer_info: Some(customer_info),
            items,
            payment_method: payload.payment_method,
            special_instructions: payload.special_instructions,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /api/orders
async fn create_order(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let items = price_lines(&state, payload.items).await?;

    let order = state
        .orders
        .insert(NewOrder {
            user_id: Some(identity.user_id),
            customer_info: None,
            items,
            payment_method: payload.payment_method,
            special_instructions: payload.special_instructions,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders?status= ; admins see every order, customers their own.
async fn list_orders(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let filter = OrderFilter {
        status: query.status,
        user_id: (!identity.is_admin()).then(|| identity.user_id.clone()),
    };
    Ok(Json(state.orders.list(filter).await?))
}

/// GET /api/orders/:id
async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;

    let owns = order.user_id.as_deref() == Some(identity.user_id.as_str());
    if !owns {
        identity.require(Role::Admin)?;
    }
    Ok(Json(order))
}

/// PUT /api/orders/:id (admin)
async fn update_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<OrderUpdate>,
) -> Result<Json<Order>, ApiError> {
    identity.require(Role::Admin)?;
    let order = state.orders.update(&id, payload).await?;
    info!(admin_id = %identity.user_id, order_id = %order.id, "order updated by admin");
    Ok(Json(order))
}

/// DELETE /api/orders/:id (admin)
async fn delete_order(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    identity.require(Role::Admin)?;
    state.orders.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/orders/stats (admin)
async fn order_stats(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<OrderStats>, ApiError> {
    identity.require(Role::Admin)?;
    let (total_orders, pending_orders) = tokio::try_join!(
        state.orders.count(None),
        state.orders.count(Some(OrderStatus::Pending)),
    )?;
    Ok(Json(OrderStats {
        total_orders,
        pending_orders,
    }))
}

/// Price every line from the stored menu; client-supplied prices never count.
async fn price_lines(
    state: &AppState,
    lines: Vec<OrderLineRequest>,
) -> Result<Vec<OrderItem>, ApiError> {
    if lines.is_empty() {
        return Err(ApiError::validation("An order needs at least one item"));
    }
    for line in &lines {
        if line.quantity == 0 || line.quantity > MAX_QUANTITY {
            return Err(ApiError::validation(format!(
                "quantity must be between 1 and {MAX_QUANTITY}"
            )));
        }
    }

    let ids = lines.iter().map(|line| line.menu_item_id.clone()).collect();
    let menu = state.menu.get_many(ids).await?;
    lines.into_iter().map(|line| price_line(&menu, line)).collect()
}

fn price_line(menu: &HashMap<String, MenuItem>, line: OrderLineRequest) -> Result<OrderItem, ApiError> {
    let item = menu
        .get(&line.menu_item_id)
        .filter(|item| item.is_available)
        .ok_or_else(|| {
            ApiError::validation(format!(
                "Menu item {} does not exist or is unavailable",
                line.menu_item_id
            ))
        })?;

    let unit_price = item.unit_price(line.size.as_deref());
    Ok(OrderItem {
        menu_item_id: item.id.clone(),
        name: item.name.clone(),
        quantity: line.quantity,
        size: line.size,
        unit_price,
        subtotal: round_cents(unit_price * f64::from(line.quantity)),
    })
}

fn validate_customer(info: CustomerInfo) -> Result<CustomerInfo, ApiError> {
    let email = match info.email.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(email) => {
            let email = email.to_ascii_lowercase();
            validate_email(&email)?;
            Some(email)
        }
    };
    Ok(CustomerInfo {
        name: required_text(&info.name, "customer name")?,
        phone: required_text(&info.phone, "customer phone")?,
        email,
        address: required_text(&info.address, "customer address")?,
    })
}
