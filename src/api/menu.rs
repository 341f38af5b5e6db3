//! Menu API
//! Mission: Public catalogue reads, admin-only catalogue writes

use super::AppState;
use crate::{
    auth::{Identity, Role},
    error::ApiError,
    store::menu::{MenuFilter, MenuItem, MenuItemUpdate, NewMenuItem},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, MethodRouter},
    Json, Router,
};
use std::collections::BTreeMap;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", collection())
        .route("/categories", get(list_categories))
        .route("/categories/list", get(list_categories))
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

/// Handlers for the collection root, also mounted with a trailing slash.
pub(crate) fn collection() -> MethodRouter<AppState> {
    get(list_items).post(create_item)
}

/// GET /api/menu?category=&available_only=
async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<MenuFilter>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    Ok(Json(state.menu.list(filter).await?))
}

/// GET /api/menu/categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.menu.categories().await?))
}

/// GET /api/menu/:id
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItem>, ApiError> {
    state
        .menu
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Menu item"))
}

/// POST /api/menu (admin)
async fn create_item(
    State(state): State<AppState>,
    identity: Identity,
    Json(mut payload): Json<NewMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    identity.require(Role::Admin)?;

    payload.name = required_text(&payload.name, "name")?;
    payload.category = required_text(&payload.category, "category")?;
    validate_price(payload.price)?;
    validate_size_prices(&payload.prices)?;

    let item = state.menu.insert(payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/menu/:id (admin)
async fn update_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(mut payload): Json<MenuItemUpdate>,
) -> Result<Json<MenuItem>, ApiError> {
    identity.require(Role::Admin)?;

    if let Some(name) = &payload.name {
        payload.name = Some(required_text(name, "name")?);
    }
    if let Some(category) = &payload.category {
        payload.category = Some(required_text(category, "category")?);
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(prices) = &payload.prices {
        validate_size_prices(prices)?;
    }

    Ok(Json(state.menu.update(&id, payload).await?))
}

/// DELETE /api/menu/:id (admin)
async fn delete_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    identity.require(Role::Admin)?;
    state.menu.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn required_text(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(ApiError::validation("price must be greater than zero"))
    }
}

fn validate_size_prices(prices: &BTreeMap<String, f64>) -> Result<(), ApiError> {
    for (size, price) in prices {
        if size.trim().is_empty() {
            return Err(ApiError::validation("size names cannot be empty"));
        }
        validate_price(*price)?;
    }
    Ok(())
}
