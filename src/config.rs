//! Configuration
//! Mission: Read every runtime knob from the environment once, at startup

use crate::middleware::RateLimitConfig;
use anyhow::{bail, Result};
use chrono::Duration;
use std::str::FromStr;
use tracing::warn;

/// Signing key used when `SECRET_KEY` is unset outside production.
pub const DEV_SECRET_KEY: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => bail!("unknown APP_ENV '{other}'"),
        }
    }
}

/// Bootstrap admin created at startup when absent.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub secret_key: Option<String>,
    pub access_token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub admin_seed: Option<AdminSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: "./restaurant.db".to_string(),
            secret_key: None,
            access_token_ttl: Duration::minutes(30),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            allowed_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            admin_seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = match var("APP_ENV") {
            Some(raw) => raw.parse()?,
            None => defaults.environment,
        };

        let host = var("HOST").unwrap_or(defaults.host);
        let port = parse_or(var("PORT"), "PORT", defaults.port);
        let database_path = var("DATABASE_PATH").unwrap_or(defaults.database_path);
        let secret_key = var("SECRET_KEY");

        let ttl_minutes = parse_or(
            var("ACCESS_TOKEN_EXPIRE_MINUTES"),
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            defaults.access_token_ttl.num_minutes(),
        );
        if ttl_minutes <= 0 {
            bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
        }

        let bcrypt_cost = parse_or(var("BCRYPT_COST"), "BCRYPT_COST", defaults.bcrypt_cost);
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit = RateLimitConfig {
            max_requests: parse_or(
                var("RATE_LIMIT_MAX_REQUESTS"),
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit.max_requests,
            ),
            window: std::time::Duration::from_secs(parse_or(
                var("RATE_LIMIT_WINDOW_SECS"),
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit.window.as_secs(),
            )),
            burst: parse_or(
                var("RATE_LIMIT_BURST"),
                "RATE_LIMIT_BURST",
                defaults.rate_limit.burst,
            ),
        };

        let admin_seed = match (var("ADMIN_USERNAME"), var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(username), Some(email), Some(password)) => Some(AdminSeed {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => {
                warn!("ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must all be set to seed an admin");
                None
            }
        };

        Ok(Self {
            environment,
            host,
            port,
            database_path,
            secret_key,
            access_token_ttl: Duration::minutes(ttl_minutes),
            bcrypt_cost,
            allowed_origins,
            rate_limit,
            admin_seed,
        })
    }

    /// The key tokens are signed with. Production refuses to start without one.
    pub fn signing_secret(&self) -> Result<String> {
        match (&self.secret_key, self.environment) {
            (Some(secret), _) => Ok(secret.clone()),
            (None, Environment::Production) => bail!("SECRET_KEY must be set when APP_ENV=production"),
            (None, Environment::Development) => {
                warn!("SECRET_KEY not set, signing tokens with the development key");
                Ok(DEV_SECRET_KEY.to_string())
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value = %value, "unparsable setting, using default");
            default
        }),
        None => default,
    }
}
