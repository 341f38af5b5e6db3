//! Reservations API
//! Mission: Public table booking, admin-managed lifecycle

use super::{menu::required_text, AppState};
use crate::{
    auth::{
        service::{normalize_email, validate_email},
        Identity, Role,
    },
    error::ApiError,
    store::reservations::{NewReservation, Reservation, ReservationStatus, ReservationUpdate},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, MethodRouter},
    Json, Router,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

const GUEST_RANGE: RangeInclusive<u32> = 1..=20;

#[derive(Debug, Default, Deserialize)]
pub struct ReservationListQuery {
    pub status: Option<ReservationStatus>,
}

#[derive(Debug, Serialize)]
pub struct ReservationStats {
    pub total_reservations: u64,
    pub confirmed_reservations: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", collection())
        .route("/stats", get(reservation_stats))
        .route(
            "/:id",
            get(get_reservation)
                .put(update_reservation)
                .delete(delete_reservation),
        )
}

pub(crate) fn collection() -> MethodRouter<AppState> {
    get(list_reservations).post(create_reservation)
}

/// POST /api/reservations
async fn create_reservation(
    State(state): State<AppState>,
    Json(mut payload): Json<NewReservation>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    payload.customer_name = required_text(&payload.customer_name, "customer name")?;
    payload.customer_phone = required_text(&payload.customer_phone, "customer phone")?;
    payload.customer_email = normalize_email(&payload.customer_email);
    validate_email(&payload.customer_email)?;
    payload.time = normalize_time(&payload.time)?;
    validate_guests(payload.guests)?;

    let reservation = state.reservations.insert(payload).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /api/reservations?status= (admin)
async fn list_reservations(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    identity.require(Role::Admin)?;
    Ok(Json(state.reservations.list(query.status).await?))
}

/// GET /api/reservations/:id (admin)
async fn get_reservation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    identity.require(Role::Admin)?;
    state
        .reservations
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Reservation"))
}

/// PUT /api/reservations/:id (admin)
async fn update_reservation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(mut payload): Json<ReservationUpdate>,
) -> Result<Json<Reservation>, ApiError> {
    identity.require(Role::Admin)?;

    if let Some(name) = &payload.customer_name {
        payload.customer_name = Some(required_text(name, "customer name")?);
    }
    if let Some(phone) = &payload.customer_phone {
        payload.customer_phone = Some(required_text(phone, "customer phone")?);
    }
    if let Some(time) = &payload.time {
        payload.time = Some(normalize_time(time)?);
    }
    if let Some(guests) = payload.guests {
        validate_guests(guests)?;
    }
    if let Some(email) = &payload.customer_email {
        let email = normalize_email(email);
        validate_email(&email)?;
        payload.customer_email = Some(email);
    }

    Ok(Json(state.reservations.update(&id, payload).await?))
}

/// DELETE /api/reservations/:id (admin)
async fn delete_reservation(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    identity.require(Role::Admin)?;
    state.reservations.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/reservations/stats (admin)
async fn reservation_stats(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<ReservationStats>, ApiError> {
    identity.require(Role::Admin)?;
    let (total_reservations, confirmed_reservations) = tokio::try_join!(
        state.reservations.count(None),
        state.reservations.count(Some(ReservationStatus::Confirmed)),
    )?;
    Ok(Json(ReservationStats {
        total_reservations,
        confirmed_reservations,
    }))
}

/// Accept `H:MM` or `HH:MM` and store the zero-padded form.
fn normalize_time(raw: &str) -> Result<String, ApiError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| ApiError::validation("time must be in HH:MM format"))
}

fn validate_guests(guests: u32) -> Result<(), ApiError> {
    if GUEST_RANGE.contains(&guests) {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "guests must be between {} and {}",
            GUEST_RANGE.start(),
            GUEST_RANGE.end()
        )))
    }
}
