//! Order Storage
//! Mission: Persist priced orders for guests and signed-in customers

use super::{
    expect_changed, json_column, new_id, now, optional, parsed_column, text_enum, time_column,
    to_db_time, Database, StoreError, StoreResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

const ORDER_COLUMNS: &str = "id, user_id, customer_info_json, items_json, total_amount, status, \
     payment_status, payment_method, special_instructions, created_at, updated_at";

text_enum!(
    /// Kitchen lifecycle of an order.
    OrderStatus, "order status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Preparing => "preparing",
        Ready => "ready",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
);

text_enum!(
    PaymentStatus, "payment status" {
        Unpaid => "unpaid",
        Paid => "paid",
        Refunded => "refunded",
    }
);

/// One priced line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub size: Option<String>,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Contact details for orders placed without an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_info: Option<CustomerInfo>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order whose lines have already been priced.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub customer_info: Option<CustomerInfo>,
    pub items: Vec<OrderItem>,
    pub payment_method: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub special_instructions: Option<String>,
}

#[derive(Clone)]
pub struct OrderStore {
    db: Database,
}

impl OrderStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a new order as pending and unpaid; the total is the sum of line subtotals.
    pub async fn insert(&self, new_order: NewOrder) -> StoreResult<Order> {
        let timestamp = now();
        let total_amount = round_cents(new_order.items.iter().map(|item| item.subtotal).sum());
        let order = Order {
            id: new_id(),
            user_id: new_order.user_id,
            customer_info: new_order.customer_info,
            items: new_order.items,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: new_order.payment_method,
            special_instructions: new_order.special_instructions,
            created_at: timestamp,
            updated_at: timestamp,
        };

        let row = order.clone();
        self.db
            .call(move |conn| {
                let customer_info = row
                    .customer_info
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                conn.execute(
                    &format!(
                        "INSERT INTO orders ({ORDER_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                    ),
                    params![
                        row.id,
                        row.user_id,
                        customer_info,
                        serde_json::to_string(&row.items)?,
                        row.total_amount,
                        row.status.as_str(),
                        row.payment_status.as_str(),
                        row.payment_method,
                        row.special_instructions,
                        to_db_time(&row.created_at),
                        to_db_time(&row.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;

        info!(
            order_id = %order.id,
            guest = order.user_id.is_none(),
            items = order.items.len(),
            total = order.total_amount,
            "created order"
        );
        Ok(order)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Order>> {
        let id = id.to_string();
        self.db.call(move |conn| optional(load(conn, &id))).await
    }

    /// Newest first.
    pub async fn list(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        self.db
            .call(move |conn| {
                let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1");
                let mut args: Vec<String> = Vec::new();
                if let Some(status) = filter.status {
                    args.push(status.as_str().to_string());
                    sql.push_str(&format!(" AND status = ?{}", args.len()));
                }
                if let Some(user_id) = filter.user_id {
                    args.push(user_id);
                    sql.push_str(&format!(" AND user_id = ?{}", args.len()));
                }
                sql.push_str(" ORDER BY created_at DESC");

                let mut stmt = conn.prepare(&sql)?;
                let orders = stmt
                    .query_map(params_from_iter(args.iter()), order_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(orders)
            })
            .await
    }

    pub async fn update(&self, id: &str, update: OrderUpdate) -> StoreResult<Order> {
        let id = id.to_string();
        let order = self
            .db
            .call(move |conn| {
                let mut order = optional(load(conn, &id))?
                    .ok_or_else(|| StoreError::NotFound("Order".to_string()))?;
                if let Some(status) = update.status {
                    order.status = status;
                }
                if let Some(payment_status) = update.payment_status {
                    order.payment_status = payment_status;
                }
                if let Some(special_instructions) = update.special_instructions {
                    order.special_instructions = Some(special_instructions);
                }
                order.updated_at = now();

                conn.execute(
                    "UPDATE orders SET status = ?1, payment_status = ?2,
                        special_instructions = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![
                        order.status.as_str(),
                        order.payment_status.as_str(),
                        order.special_instructions,
                        to_db_time(&order.updated_at),
                        order.id,
                    ],
                )?;
                Ok(order)
            })
            .await?;

        info!(
            order_id = %order.id,
            status = order.status.as_str(),
            payment_status = order.payment_status.as_str(),
            "updated order"
        );
        Ok(order)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        let deleted = id.clone();
        self.db
            .call(move |conn| {
                let changed = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
                expect_changed(changed, "Order")
            })
            .await?;

        info!(order_id = %deleted, "deleted order");
        Ok(())
    }

    pub async fn count(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        self.db
            .call(move |conn| {
                let count: i64 = match status {
                    Some(status) => conn.query_row(
                        "SELECT COUNT(*) FROM orders WHERE status = ?1",
                        params![status.as_str()],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?,
                };
                Ok(count.max(0) as u64)
            })
            .await
    }

    /// Sum of `total_amount` over paid orders.
    pub async fn paid_revenue(&self) -> StoreResult<f64> {
        self.db
            .call(|conn| {
                let revenue: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(total_amount), 0.0) FROM orders WHERE payment_status = ?1",
                    params![PaymentStatus::Paid.as_str()],
                    |row| row.get(0),
                )?;
                Ok(round_cents(revenue))
            })
            .await
    }

    /// Order counts keyed by status; statuses with no orders are absent.
    pub async fn count_by_status(&self) -> StoreResult<BTreeMap<String, u64>> {
        self.db
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT status, COUNT(*) FROM orders GROUP BY status")?;
                let counts = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?.max(0) as u64))
                    })?
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                Ok(counts)
            })
            .await
    }

    /// Paid revenue per UTC day (`YYYY-MM-DD`) for orders created at or after `since`.
    pub async fn paid_revenue_by_day(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<BTreeMap<String, f64>> {
        let since = to_db_time(&since);
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT substr(created_at, 1, 10) AS day, SUM(total_amount)
                     FROM orders
                     WHERE payment_status = ?1 AND created_at >= ?2
                     GROUP BY day",
                )?;
                let revenue = stmt
                    .query_map(params![PaymentStatus::Paid.as_str(), since], |row| {
                        Ok((row.get::<_, String>(0)?, round_cents(row.get(1)?)))
                    })?
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                Ok(revenue)
            })
            .await
    }
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn load(conn: &Connection, id: &str) -> rusqlite::Result<Order> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    conn.query_row(&sql, params![id], order_from_row)
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let customer_info = match row.get::<_, Option<String>>(2)? {
        Some(_) => Some(json_column(row, 2)?),
        None => None,
    };
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        customer_info,
        items: json_column(row, 3)?,
        total_amount: row.get(4)?,
        status: parsed_column(row, 5)?,
        payment_status: parsed_column(row, 6)?,
        payment_method: row.get(7)?,
        special_instructions: row.get(8)?,
        created_at: time_column(row, 9)?,
        updated_at: time_column(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OrderStore {
        OrderStore::new(Database::open_in_memory().unwrap())
    }

    fn line(name: &str, quantity: u32, unit_price: f64) -> OrderItem {
        OrderItem {
            menu_item_id: format!("menu-{name}"),
            name: name.to_string(),
            quantity,
            size: None,
            unit_price,
            subtotal: round_cents(unit_price * quantity as f64),
        }
    }

    fn guest_order() -> NewOrder {
        NewOrder {
            user_id: None,
            customer_info: Some(CustomerInfo {
                name: "Guest".to_string(),
                phone: "555-0100".to_string(),
                email: None,
                address: "1 Main St".to_string(),
            }),
            items: vec![line("Pizza", 2, 9.5), line("Cola", 1, 2.25)],
            payment_method: Some("cash".to_string()),
            special_instructions: None,
        }
    }

    #[tokio::test]
    async fn test_insert_computes_total_and_defaults() {
        let store = store();
        let order = store.insert(guest_order()).await.unwrap();

        assert_eq!(order.total_amount, 21.25);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert!(order.user_id.is_none());

        let loaded = store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded, order);
    }

    #[tokio::test]
    async fn test_list_filters_by_owner_and_status() {
        let store = store();
        store.insert(guest_order()).await.unwrap();
        let mine = store
            .insert(NewOrder {
                user_id: Some("user-1".to_string()),
                customer_info: None,
                ..guest_order()
            })
            .await
            .unwrap();

        let all = store.list(OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, mine.id);

        let owned = store
            .list(OrderFilter {
                user_id: Some("user-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert!(owned[0].customer_info.is_none());

        store
            .update(
                &mine.id,
                OrderUpdate {
                    status: Some(OrderStatus::Preparing),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let preparing = store
            .list(OrderFilter {
                status: Some(OrderStatus::Preparing),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(preparing.len(), 1);
        assert_eq!(store.count(Some(OrderStatus::Pending)).await.unwrap(), 1);
        assert_eq!(store.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_revenue_counts_only_paid_orders() {
        let store = store();
        let paid = store.insert(guest_order()).await.unwrap();
        store.insert(guest_order()).await.unwrap();
        assert_eq!(store.paid_revenue().await.unwrap(), 0.0);

        store
            .update(
                &paid.id,
                OrderUpdate {
                    payment_status: Some(PaymentStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.paid_revenue().await.unwrap(), 21.25);
    }

    #[tokio::test]
    async fn test_analytics_groupings() {
        let store = store();
        let paid = store.insert(guest_order()).await.unwrap();
        let other = store.insert(guest_order()).await.unwrap();
        store.insert(guest_order()).await.unwrap();
        for id in [&paid.id, &other.id] {
            store
                .update(
                    id,
                    OrderUpdate {
                        status: Some(OrderStatus::Delivered),
                        payment_status: Some(PaymentStatus::Paid),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let by_status = store.count_by_status().await.unwrap();
        assert_eq!(by_status.get("delivered"), Some(&2));
        assert_eq!(by_status.get("pending"), Some(&1));
        assert!(!by_status.contains_key("cancelled"));

        let week_ago = Utc::now() - chrono::Duration::days(7);
        let revenue = store.paid_revenue_by_day(week_ago).await.unwrap();
        let day = paid.created_at.format("%Y-%m-%d").to_string();
        assert_eq!(revenue.values().sum::<f64>(), 42.5);
        assert!(revenue.contains_key(&day));

        let tomorrow = Utc::now() + chrono::Duration::days(1);
        assert!(store.paid_revenue_by_day(tomorrow).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = store();
        assert!(matches!(
            store.update("nope", OrderUpdate::default()).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            store.delete("nope").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_status_text_round_trip() {
        assert_eq!("ready".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert!("READY".parse::<OrderStatus>().is_err());
        assert_eq!(PaymentStatus::Refunded.to_string(), "refunded");
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
