//! SQLite Storage
//! Mission: One explicitly owned database handle shared by every repository
//!
//! The handle is opened once at startup, cloned into each repository and
//! closed at shutdown. rusqlite is synchronous, so every call hops onto the
//! blocking pool instead of stalling the async workers.

pub mod menu;
pub mod orders;
pub mod reservations;

use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::{types::Type, Connection, ErrorCode, Row};
use serde::de::DeserializeOwned;
use std::{str::FromStr, sync::Arc};
use tracing::{debug, info, warn};

pub use menu::MenuStore;
pub use orders::OrderStore;
pub use reservations::ReservationStore;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS menu_items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    price REAL NOT NULL,
    category TEXT NOT NULL,
    image_url TEXT,
    is_available INTEGER NOT NULL DEFAULT 1,
    allergens_json TEXT NOT NULL DEFAULT '[]',
    preparation_time INTEGER NOT NULL DEFAULT 15,
    prices_json TEXT NOT NULL DEFAULT '{}',
    popular INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_menu_items_category ON menu_items(category);
CREATE INDEX IF NOT EXISTS idx_menu_items_available ON menu_items(is_available);

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    customer_info_json TEXT,
    items_json TEXT NOT NULL,
    total_amount REAL NOT NULL,
    status TEXT NOT NULL,
    payment_status TEXT NOT NULL,
    payment_method TEXT,
    special_instructions TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at DESC);

CREATE TABLE IF NOT EXISTS reservations (
    id TEXT PRIMARY KEY,
    customer_name TEXT NOT NULL,
    customer_phone TEXT NOT NULL,
    customer_email TEXT NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    guests INTEGER NOT NULL,
    status TEXT NOT NULL,
    special_requests TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_reservations_date ON reservations(date);
CREATE INDEX IF NOT EXISTS idx_reservations_status ON reservations(status);
CREATE INDEX IF NOT EXISTS idx_reservations_created ON reservations(created_at);
"#;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A UNIQUE constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => StoreError::Unexpected(err.into()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle to the restaurant database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Arc<str>,
}

impl Database {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, path)
    }

    /// Private in-memory database, used by tests and throwaway runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, location: &str) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        info!(location, "database ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::from(location),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn call<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Unexpected(anyhow!("database task failed: {e}")))?
    }

    /// Cheap liveness probe used by the health endpoint.
    pub async fn ping(&self) -> StoreResult<()> {
        self.call(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    /// Close the connection once no other clones remain.
    pub async fn close(self) -> StoreResult<()> {
        let location = self.location.clone();
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner();
                tokio::task::spawn_blocking(move || conn.close())
                    .await
                    .map_err(|e| StoreError::Unexpected(anyhow!("close task failed: {e}")))?
                    .map_err(|(_, e)| StoreError::from(e))?;
                info!(location = %location, "database closed");
            }
            Err(_) => {
                warn!(location = %location, "database still shared at shutdown, leaving it to drop");
            }
        }
        Ok(())
    }
}

/// Closed, lowercase string enum stored as TEXT and exchanged as JSON.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(crate::error::UnknownVariant::new($kind, s)),
                }
            }
        }
    };
}

pub(crate) use text_enum;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time at the precision the database keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn to_db_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map "no rows" to `None`, everything else through `?`.
pub(crate) fn optional<T>(result: rusqlite::Result<T>) -> StoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn expect_changed(rows: usize, what: &str) -> StoreResult<()> {
    if rows == 0 {
        debug!(what, "no rows affected");
        return Err(StoreError::NotFound(what.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_open_and_ping() {
        let db = Database::open_in_memory().unwrap();
        db.ping().await.unwrap();
        assert_eq!(db.location(), ":memory:");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();

        let db = Database::open(&path).unwrap();
        db.close().await.unwrap();

        // Reopening must not fail on existing tables or indexes.
        let db = Database::open(&path).unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_conflict() {
        let db = Database::open_in_memory().unwrap();
        let now = to_db_time(&Utc::now());

        let insert = move |conn: &mut Connection| -> StoreResult<()> {
            conn.execute(
                "INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
                 VALUES (?1, 'dup', 'dup@x.com', 'h', 'customer', ?2, ?2)",
                rusqlite::params![new_id(), now],
            )?;
            Ok(())
        };

        db.call(insert.clone()).await.unwrap();
        let err = db.call(insert).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(msg) if msg.contains("users.")));
    }

    #[test]
    fn test_db_time_sorts_lexicographically() {
        let earlier = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(to_db_time(&earlier) < to_db_time(&later));
        assert_eq!(to_db_time(&earlier).len(), to_db_time(&later).len());
    }

    #[test]
    fn test_expect_changed() {
        assert!(expect_changed(1, "Order").is_ok());
        assert!(matches!(
            expect_changed(0, "Order"),
            Err(StoreError::NotFound(what)) if what == "Order"
        ));
    }
}
