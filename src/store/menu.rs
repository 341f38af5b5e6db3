//! Menu Storage
//! Mission: Catalogue of dishes that orders are priced from

use super::{
    expect_changed, json_column, new_id, now, optional, time_column, to_db_time, Database, StoreError,
    StoreResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

const MENU_COLUMNS: &str = "id, name, description, price, category, image_url, is_available, \
     allergens_json, preparation_time, prices_json, popular, created_at, updated_at";

fn default_true() -> bool {
    true
}

fn default_preparation_time() -> u32 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub allergens: Vec<String>,
    pub preparation_time: u32,
    /// Optional per-size prices, e.g. `{"large": 14.5}`.
    pub prices: BTreeMap<String, f64>,
    pub popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// Unit price for an optional size; unknown sizes use the base price.
    pub fn unit_price(&self, size: Option<&str>) -> f64 {
        size.and_then(|s| self.prices.get(s).copied())
            .unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default = "default_preparation_time")]
    pub preparation_time: u32,
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub popular: bool,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    pub allergens: Option<Vec<String>>,
    pub preparation_time: Option<u32>,
    pub prices: Option<BTreeMap<String, f64>>,
    pub popular: Option<bool>,
}

impl MenuItemUpdate {
    fn apply(self, item: &mut MenuItem) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(image_url) = self.image_url {
            item.image_url = Some(image_url);
        }
        if let Some(is_available) = self.is_available {
            item.is_available = is_available;
        }
        if let Some(allergens) = self.allergens {
            item.allergens = allergens;
        }
        if let Some(preparation_time) = self.preparation_time {
            item.preparation_time = preparation_time;
        }
        if let Some(prices) = self.prices {
            item.prices = prices;
        }
        if let Some(popular) = self.popular {
            item.popular = popular;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuFilter {
    pub category: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Clone)]
pub struct MenuStore {
    db: Database,
}

impl MenuStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: MenuFilter) -> StoreResult<Vec<MenuItem>> {
        self.db
            .call(move |conn| {
                let mut sql = format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE 1 = 1");
                let mut args: Vec<String> = Vec::new();
                if let Some(category) = filter.category {
                    args.push(category);
                    sql.push_str(&format!(" AND category = ?{}", args.len()));
                }
                if filter.available_only {
                    sql.push_str(" AND is_available = 1");
                }
                sql.push_str(" ORDER BY category ASC, name ASC");

                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map(params_from_iter(args.iter()), item_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await
    }

    /// Distinct categories, sorted.
    pub async fn categories(&self) -> StoreResult<Vec<String>> {
        self.db
            .call(|conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT DISTINCT category FROM menu_items ORDER BY category ASC",
                )?;
                let categories = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(categories)
            })
            .await
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<MenuItem>> {
        let id = id.to_string();
        self.db
            .call(move |conn| optional(load(conn, &id)))
            .await
    }

    /// Fetch several items at once, keyed by id. Missing ids are simply absent.
    pub async fn get_many(&self, ids: Vec<String>) -> StoreResult<HashMap<String, MenuItem>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.db
            .call(move |conn| {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql =
                    format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE id IN ({placeholders})");
                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map(params_from_iter(ids.iter()), item_from_row)?
                    .map(|item| item.map(|item| (item.id.clone(), item)))
                    .collect::<Result<HashMap<_, _>, _>>()?;
                Ok(items)
            })
            .await
    }

    pub async fn insert(&self, new_item: NewMenuItem) -> StoreResult<MenuItem> {
        let timestamp = now();
        let item = MenuItem {
            id: new_id(),
            name: new_item.name,
            description: new_item.description,
            price: new_item.price,
            category: new_item.category,
            image_url: new_item.image_url,
            is_available: new_item.is_available,
            allergens: new_item.allergens,
            preparation_time: new_item.preparation_time,
            prices: new_item.prices,
            popular: new_item.popular,
            created_at: timestamp,
            updated_at: timestamp,
        };

        let row = item.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO menu_items ({MENU_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                    ),
                    params![
                        row.id,
                        row.name,
                        row.description,
                        row.price,
                        row.category,
                        row.image_url,
                        row.is_available,
                        serde_json::to_string(&row.allergens)?,
                        row.preparation_time,
                        serde_json::to_string(&row.prices)?,
                        row.popular,
                        to_db_time(&row.created_at),
                        to_db_time(&row.updated_at),
                    ],
                )
                .map_err(name_conflict)?;
                Ok(())
            })
            .await?;

        info!(menu_item_id = %item.id, name = %item.name, "created menu item");
        Ok(item)
    }

    pub async fn update(&self, id: &str, update: MenuItemUpdate) -> StoreResult<MenuItem> {
        let id = id.to_string();
        let item = self
            .db
            .call(move |conn| {
                let mut item = optional(load(conn, &id))?
                    .ok_or_else(|| StoreError::NotFound("Menu item".to_string()))?;
                update.apply(&mut item);
                item.updated_at = now();

                conn.execute(
                    "UPDATE menu_items SET name = ?1, description = ?2, price = ?3, category = ?4,
                        image_url = ?5, is_available = ?6, allergens_json = ?7,
                        preparation_time = ?8, prices_json = ?9, popular = ?10, updated_at = ?11
                     WHERE id = ?12",
                    params![
                        item.name,
                        item.description,
                        item.price,
                        item.category,
                        item.image_url,
                        item.is_available,
                        serde_json::to_string(&item.allergens)?,
                        item.preparation_time,
                        serde_json::to_string(&item.prices)?,
                        item.popular,
                        to_db_time(&item.updated_at),
                        item.id,
                    ],
                )
                .map_err(name_conflict)?;
                Ok(item)
            })
            .await?;

        info!(menu_item_id = %item.id, "updated menu item");
        Ok(item)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        let deleted = id.clone();
        self.db
            .call(move |conn| {
                let changed = conn.execute("DELETE FROM menu_items WHERE id = ?1", params![id])?;
                expect_changed(changed, "Menu item")
            })
            .await?;

        info!(menu_item_id = %deleted, "deleted menu item");
        Ok(())
    }
}

fn name_conflict(err: rusqlite::Error) -> StoreError {
    match StoreError::from(err) {
        StoreError::Conflict(_) => {
            StoreError::Conflict("Menu item with this name already exists".to_string())
        }
        other => other,
    }
}

fn load(conn: &Connection, id: &str) -> rusqlite::Result<MenuItem> {
    let sql = format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ?1");
    conn.query_row(&sql, params![id], item_from_row)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<MenuItem> {
    Ok(MenuItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category: row.get(4)?,
        image_url: row.get(5)?,
        is_available: row.get(6)?,
        allergens: json_column(row, 7)?,
        preparation_time: row.get(8)?,
        prices: json_column(row, 9)?,
        popular: row.get(10)?,
        created_at: time_column(row, 11)?,
        updated_at: time_column(row, 12)?,
    })
}
