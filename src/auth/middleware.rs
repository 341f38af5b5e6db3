//! Authentication Extractor
//! Mission: Turn `Authorization: Bearer <token>` into a verified `Identity`
//!
//! Protected handlers take an `Identity` argument; verification runs before the
//! handler body and rejects with 401 on any token problem.

use crate::{
    auth::{jwt::JwtHandler, models::Identity},
    error::ApiError,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use tracing::debug;

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    Arc<JwtHandler>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    debug!(path = %parts.uri.path(), "missing or malformed bearer header");
                    ApiError::Unauthorized
                })?;

        let jwt = Arc::<JwtHandler>::from_ref(state);
        jwt.verify_token(bearer.token())
            .map_err(|_| ApiError::Unauthorized)
    }
}
