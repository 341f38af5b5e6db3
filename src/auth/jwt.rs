//! JWT Token Handler
//! Mission: Issue and verify signed, time-bounded bearer tokens

use crate::auth::models::{Claims, Identity, Role};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Any verification failure. Deliberately carries no reason.
#[derive(Debug, thiserror::Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// JWT Handler for token operations (HS256)
pub struct JwtHandler {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key
    pub fn new(secret: &str, default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sign `{sub, role, exp = now + ttl}`; `ttl` falls back to the configured default.
    pub fn issue_token(
        &self,
        user_id: &str,
        role: Role,
        ttl: Option<Duration>,
    ) -> Result<IssuedToken> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(ttl)
            .context("Invalid timestamp")?
            .timestamp()
            .max(0) as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: expiration,
            iat: now.timestamp().max(0) as usize,
        };

        debug!(
            user_id,
            role = role.as_str(),
            ttl_secs = ttl.num_seconds(),
            "issuing access token"
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to generate JWT")?;

        Ok(IssuedToken {
            token,
            expires_in: ttl.num_seconds(),
        })
    }

    /// Verify signature, then expiry, then required claims.
    pub fn verify_token(&self, token: &str) -> Result<Identity, InvalidToken> {
        let decoded = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(reason = %e, "rejected bearer token");
            InvalidToken
        })?;

        let claims = decoded.claims;
        if claims.sub.trim().is_empty() {
            debug!("rejected bearer token with empty subject");
            return Err(InvalidToken);
        }

        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
