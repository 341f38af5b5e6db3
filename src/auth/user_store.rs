//! User Storage
//! Mission: Persist credential records; uniqueness lives in the schema

use crate::{
    auth::models::{Role, User},
    store::{
        expect_changed, new_id, now, optional, parsed_column, time_column, to_db_time, Database,
        StoreError, StoreResult,
    },
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::info;

const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, role, is_active, created_at, updated_at";

/// Fields supplied when creating an account. The id is assigned here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// User storage over the shared database
#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new active user.
    ///
    /// A duplicate username or email surfaces as `StoreError::Conflict`, which
    /// closes the race the caller's pre-checks leave open.
    pub async fn insert(&self, new_user: NewUser) -> StoreResult<User> {
        let timestamp = now();
        let user = User {
            id: new_id(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_active: true,
            created_at: timestamp,
            updated_at: timestamp,
        };

        let row = user.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, username, email, full_name, password_hash, role, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.id,
                        row.username,
                        row.email,
                        row.full_name,
                        row.password_hash,
                        row.role.as_str(),
                        row.is_active,
                        to_db_time(&row.created_at),
                        to_db_time(&row.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;

        info!(user_id = %user.id, role = user.role.as_str(), "created user");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.find_one("id", id.to_string()).await
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_one("email", email.to_string()).await
    }

    pub async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.find_one("username", username.to_string()).await
    }

    async fn find_one(&self, column: &'static str, value: String) -> StoreResult<Option<User>> {
        self.db
            .call(move |conn| {
                let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
                let mut stmt = conn.prepare_cached(&sql)?;
                optional(stmt.query_row(params![value], user_from_row))
            })
            .await
    }

    /// All users, oldest first (admin only)
    pub async fn list(&self) -> StoreResult<Vec<User>> {
        self.db
            .call(|conn| {
                let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
                let mut stmt = conn.prepare_cached(&sql)?;
                let users = stmt
                    .query_map([], user_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await
    }

    /// Flip the active flag and return the updated record.
    pub async fn set_active(&self, id: &str, active: bool) -> StoreResult<User> {
        let id = id.to_string();
        let user = self
            .db
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                    params![active, to_db_time(&now()), id],
                )?;
                expect_changed(changed, "User")?;
                load(conn, &id)
            })
            .await?;

        info!(user_id = %user.id, active, "updated user status");
        Ok(user)
    }

    /// Count users, optionally restricted to one role.
    pub async fn count(&self, role: Option<Role>) -> StoreResult<u64> {
        self.db
            .call(move |conn| {
                let count: i64 = match role {
                    Some(role) => conn.query_row(
                        "SELECT COUNT(*) FROM users WHERE role = ?1",
                        params![role.as_str()],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?,
                };
                Ok(count.max(0) as u64)
            })
            .await
    }
}

fn load(conn: &Connection, id: &str) -> StoreResult<User> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    optional(conn.query_row(&sql, params![id], user_from_row))?
        .ok_or_else(|| StoreError::NotFound("User".to_string()))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: DateTime<Utc> = time_column(row, 7)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        role: parsed_column(row, 5)?,
        is_active: row.get(6)?,
        created_at,
        updated_at: time_column(row, 8)?,
    })
}
