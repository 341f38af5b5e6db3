//! HTTP API
//! Mission: Wire every resource router onto one shared application state

pub mod admin;
pub mod menu;
pub mod orders;
pub mod reservations;

use crate::{
    auth::{self, AuthService, JwtHandler, PasswordHasher, UserStore},
    config::{AdminSeed, Config},
    error::ApiError,
    middleware::{rate_limit_middleware, request_logging, RateLimiter},
    store::{Database, MenuStore, OrderStore, ReservationStore},
};
use axum::{
    extract::{FromRef, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "restaurant-backend";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthService>,
    pub jwt: Arc<JwtHandler>,
    pub users: UserStore,
    pub menu: MenuStore,
    pub orders: OrderStore,
    pub reservations: ReservationStore,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> anyhow::Result<Self> {
        let jwt = Arc::new(JwtHandler::new(
            &config.signing_secret()?,
            config.access_token_ttl,
        ));
        let users = UserStore::new(db.clone());
        let auth = Arc::new(AuthService::new(
            users.clone(),
            jwt.clone(),
            PasswordHasher::new(config.bcrypt_cost),
        ));

        Ok(Self {
            auth,
            jwt,
            users,
            menu: MenuStore::new(db.clone()),
            orders: OrderStore::new(db.clone()),
            reservations: ReservationStore::new(db.clone()),
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            db,
        })
    }

    /// Create the configured bootstrap admin. A configured seed that cannot be
    /// applied is a startup error.
    pub async fn seed_admin(&self, seed: Option<&AdminSeed>) -> anyhow::Result<()> {
        let Some(seed) = seed else {
            return Ok(());
        };
        match self
            .auth
            .ensure_admin(seed)
            .await
            .with_context(|| format!("Failed to seed admin account {}", seed.username))?
        {
            Some(admin) => info!(user_id = %admin.id, "👤 Seeded admin account"),
            None => info!("admin account already present"),
        }
        Ok(())
    }
}

impl FromRef<AppState> for Arc<JwtHandler> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Full application router with logging and CORS applied.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::api::register))
        .route("/login", post(auth::api::login))
        .route_layer(from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .route("/me", get(auth::api::me));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin::router())
        .nest("/api/menu", menu::router())
        .nest("/api/orders", orders::router())
        .nest("/api/reservations", reservations::router())
        // Nested roots only match without the trailing slash.
        .route("/api/menu/", menu::collection())
        .route("/api/orders/", orders::collection())
        .route("/api/reservations/", reservations::collection())
        .layer(from_fn(request_logging))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

/// Explicit origins allow credentials; an empty list falls back to permissive CORS.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        info!("ALLOWED_ORIGINS not set, CORS is permissive");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the restaurant API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.db.ping().await?;
    Ok(Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    })))
}
