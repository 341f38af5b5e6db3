//! Restaurant Backend Library
//!
//! Exposes the API, auth and storage modules for the binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod store;
