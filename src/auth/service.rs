//! Authentication Service
//! Mission: Registration and login flows on top of the credential authority

use crate::{
    auth::{
        jwt::JwtHandler,
        models::{LoginRequest, RegisterRequest, Role, TokenResponse, User},
        password::{PasswordHasher, MAX_SECRET_BYTES},
        user_store::{NewUser, UserStore},
    },
    config::AdminSeed,
    error::ApiError,
    store::StoreError,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct AuthService {
    users: UserStore,
    jwt: Arc<JwtHandler>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(users: UserStore, jwt: Arc<JwtHandler>, hasher: PasswordHasher) -> Self {
        Self { users, jwt, hasher }
    }

    pub fn jwt(&self) -> &Arc<JwtHandler> {
        &self.jwt
    }

    /// Create a customer account and log it in.
    pub async fn register(&self, request: RegisterRequest) -> Result<TokenResponse, ApiError> {
        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);
        validate_username(&username)?;
        validate_email(&email)?;
        validate_secret(&request.password)?;

        let role = request.role.unwrap_or(Role::Customer);
        if role == Role::Admin {
            warn!(username = %username, "self-registration requested the admin role");
            return Err(ApiError::forbidden(
                "Self-registration cannot grant the admin role",
            ));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }

        let password_hash = self.hasher.hash_secret_blocking(request.password).await?;

        let full_name = request
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                full_name,
                password_hash,
                role,
            })
            .await
            .map_err(registration_conflict)?;

        info!(user_id = %user.id, "registration successful");
        self.token_for(&user)
    }

    /// Exchange email and password for a token.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ApiError> {
        let email = normalize_email(&request.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("login failed: unknown account");
            return Err(ApiError::InvalidCredentials);
        };

        let valid = self
            .hasher
            .verify_secret_blocking(request.password, user.password_hash.clone())
            .await?;
        if !valid {
            warn!(user_id = %user.id, "login failed: wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        // Only a caller who already knows the password learns the account is inactive.
        if !user.is_active {
            warn!(user_id = %user.id, "login refused: account inactive");
            return Err(ApiError::InactiveAccount);
        }

        info!(user_id = %user.id, role = user.role.as_str(), "login successful");
        self.token_for(&user)
    }

    /// Load the account behind a verified token.
    pub async fn current_user(&self, user_id: &str) -> Result<User, ApiError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    /// Create the configured bootstrap admin unless that email already exists.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<Option<User>, ApiError> {
        let email = normalize_email(&seed.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(None);
        }

        validate_secret(&seed.password)?;
        let password_hash = self
            .hasher
            .hash_secret_blocking(seed.password.clone())
            .await?;

        let admin = self
            .users
            .insert(NewUser {
                username: seed.username.trim().to_string(),
                email,
                full_name: None,
                password_hash,
                role: Role::Admin,
            })
            .await
            .map_err(registration_conflict)?;

        info!(user_id = %admin.id, "bootstrap admin created");
        Ok(Some(admin))
    }

    fn token_for(&self, user: &User) -> Result<TokenResponse, ApiError> {
        let issued = self.jwt.issue_token(&user.id, user.role, None)?;
        Ok(TokenResponse::bearer(
            issued.token,
            user.id.clone(),
            user.role,
            issued.expires_in,
        ))
    }
}

/// The insert lost a race with a concurrent registration.
fn registration_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(message) if message.contains("users.email") => {
            ApiError::Conflict("Email already registered".to_string())
        }
        StoreError::Conflict(_) => ApiError::Conflict("Username already taken".to_string()),
        other => other.into(),
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    if validator::validate_email(email) {
        Ok(())
    } else {
        Err(ApiError::validation("A valid email address is required"))
    }
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() || username.chars().count() > 50 {
        return Err(ApiError::validation(
            "Username must be between 1 and 50 characters",
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::validation("Username cannot contain whitespace"));
    }
    Ok(())
}

fn validate_secret(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password cannot be empty"));
    }
    if password.len() > MAX_SECRET_BYTES {
        return Err(ApiError::validation(format!(
            "Password cannot exceed {MAX_SECRET_BYTES} bytes"
        )));
    }
    Ok(())
}
