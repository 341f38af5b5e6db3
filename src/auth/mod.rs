//! Authentication Module
//! Mission: Credentials, signed tokens and role checks for the restaurant API

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod user_store;

pub use jwt::JwtHandler;
pub use models::{authorize, Identity, Role};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use user_store::UserStore;
