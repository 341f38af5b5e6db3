//! Reservation Storage
//! Mission: Table bookings submitted by the public and managed by staff

use super::{
    expect_changed, new_id, now, optional, parsed_column, text_enum, time_column, to_db_time,
    Database, StoreError, StoreResult,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

const RESERVATION_COLUMNS: &str = "id, customer_name, customer_phone, customer_email, date, time, \
     guests, status, special_requests, created_at, updated_at";

text_enum!(
    ReservationStatus, "reservation status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
);

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub date: NaiveDate,
    /// Local wall-clock time, `HH:MM`.
    pub time: String,
    pub guests: u32,
    pub status: ReservationStatus,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub date: NaiveDate,
    pub time: String,
    pub guests: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationUpdate {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub guests: Option<u32>,
    pub status: Option<ReservationStatus>,
    pub special_requests: Option<String>,
}

impl ReservationUpdate {
    fn apply(self, reservation: &mut Reservation) {
        if let Some(customer_name) = self.customer_name {
            reservation.customer_name = customer_name;
        }
        if let Some(customer_phone) = self.customer_phone {
            reservation.customer_phone = customer_phone;
        }
        if let Some(customer_email) = self.customer_email {
            reservation.customer_email = customer_email;
        }
        if let Some(date) = self.date {
            reservation.date = date;
        }
        if let Some(time) = self.time {
            reservation.time = time;
        }
        if let Some(guests) = self.guests {
            reservation.guests = guests;
        }
        if let Some(status) = self.status {
            reservation.status = status;
        }
        if let Some(special_requests) = self.special_requests {
            reservation.special_requests = Some(special_requests);
        }
    }
}

#[derive(Clone)]
pub struct ReservationStore {
    db: Database,
}

impl ReservationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, new_reservation: NewReservation) -> StoreResult<Reservation> {
        let timestamp = now();
        let reservation = Reservation {
            id: new_id(),
            customer_name: new_reservation.customer_name,
            customer_phone: new_reservation.customer_phone,
            customer_email: new_reservation.customer_email,
            date: new_reservation.date,
            time: new_reservation.time,
            guests: new_reservation.guests,
            status: ReservationStatus::Pending,
            special_requests: new_reservation.special_requests,
            created_at: timestamp,
            updated_at: timestamp,
        };

        let row = reservation.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO reservations ({RESERVATION_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                    ),
                    params![
                        row.id,
                        row.customer_name,
                        row.customer_phone,
                        row.customer_email,
                        row.date.to_string(),
                        row.time,
                        row.guests,
                        row.status.as_str(),
                        row.special_requests,
                        to_db_time(&row.created_at),
                        to_db_time(&row.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;

        info!(
            reservation_id = %reservation.id,
            date = %reservation.date,
            guests = reservation.guests,
            "created reservation"
        );
        Ok(reservation)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Reservation>> {
        let id = id.to_string();
        self.db.call(move |conn| optional(load(conn, &id))).await
    }

    /// Ordered by booking date and time.
    pub async fn list(&self, status: Option<ReservationStatus>) -> StoreResult<Vec<Reservation>> {
        self.db
            .call(move |conn| {
                let mut sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations");
                let args: Vec<&'static str> = status.iter().map(|s| s.as_str()).collect();
                if !args.is_empty() {
                    sql.push_str(" WHERE status = ?1");
                }
                sql.push_str(" ORDER BY date ASC, time ASC");

                let mut stmt = conn.prepare(&sql)?;
                let reservations = stmt
                    .query_map(params_from_iter(args.iter()), reservation_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(reservations)
            })
            .await
    }

    pub async fn update(&self, id: &str, update: ReservationUpdate) -> StoreResult<Reservation> {
        let id = id.to_string();
        let reservation = self
            .db
            .call(move |conn| {
                let mut reservation = optional(load(conn, &id))?
                    .ok_or_else(|| StoreError::NotFound("Reservation".to_string()))?;
                update.apply(&mut reservation);
                reservation.updated_at = now();

                conn.execute(
                    "UPDATE reservations SET customer_name = ?1, customer_phone = ?2,
                        customer_email = ?3, date = ?4, time = ?5, guests = ?6, status = ?7,
                        special_requests = ?8, updated_at = ?9
                     WHERE id = ?10",
                    params![
                        reservation.customer_name,
                        reservation.customer_phone,
                        reservation.customer_email,
                        reservation.date.to_string(),
                        reservation.time,
                        reservation.guests,
                        reservation.status.as_str(),
                        reservation.special_requests,
                        to_db_time(&reservation.updated_at),
                        reservation.id,
                    ],
                )?;
                Ok(reservation)
            })
            .await?;

        info!(
            reservation_id = %reservation.id,
            status = reservation.status.as_str(),
            "updated reservation"
        );
        Ok(reservation)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        let deleted = id.clone();
        self.db
            .call(move |conn| {
                let changed =
                    conn.execute("DELETE FROM reservations WHERE id = ?1", params![id])?;
                expect_changed(changed, "Reservation")
            })
            .await?;

        info!(reservation_id = %deleted, "deleted reservation");
        Ok(())
    }

    pub async fn count(&self, status: Option<ReservationStatus>) -> StoreResult<u64> {
        self.db
            .call(move |conn| {
                let count: i64 = match status {
                    Some(status) => conn.query_row(
                        "SELECT COUNT(*) FROM reservations WHERE status = ?1",
                        params![status.as_str()],
                        |row| row.get(0),
                    )?,
                    None => {
                        conn.query_row("SELECT COUNT(*) FROM reservations", [], |row| row.get(0))?
                    }
                };
                Ok(count.max(0) as u64)
            })
            .await
    }

    /// Bookings submitted at or after `since`.
    pub async fn count_created_since(&self, since: DateTime<Utc>) -> StoreResult<u64> {
        self.db
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM reservations WHERE created_at >= ?1",
                    params![to_db_time(&since)],
                    |row| row.get(0),
                )?;
                Ok(count.max(0) as u64)
            })
            .await
    }
}

fn load(conn: &Connection, id: &str) -> rusqlite::Result<Reservation> {
    let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1");
    conn.query_row(&sql, params![id], reservation_from_row)
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_phone: row.get(2)?,
        customer_email: row.get(3)?,
        date: parsed_column(row, 4)?,
        time: row.get(5)?,
        guests: row.get(6)?,
        status: parsed_column(row, 7)?,
        special_requests: row.get(8)?,
        created_at: time_column(row, 9)?,
        updated_at: time_column(row, 10)?,
    })
}
