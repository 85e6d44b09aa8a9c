//! Cart Aggregate
//!
//! One aggregate per customer device key, single writer. Every mutation
//! rewrites the full line list through a [`CartStore`] so the cart survives a
//! restart with no external coordination. Order assembly reads a
//! [`Cart::snapshot`] and never touches live state.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{AppError, Result};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco")]
    pub unit_price: Decimal,
    #[serde(rename = "quantidade")]
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Rebuilds the aggregate from stored lines, dropping anything that
    /// violates the quantity invariant.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines: lines.into_iter().filter(|l| l.quantity > 0).collect() }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Immutable copy for downstream consumption.
    pub fn snapshot(&self) -> Vec<CartLine> {
        self.lines.clone()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Merges by product id: an existing line has its quantity incremented,
    /// otherwise a new line is appended.
    pub fn add_line(&mut self, product_id: i64, name: &str, unit_price: Decimal, qty: i32) {
        let qty = qty.max(1);
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += qty;
        } else {
            self.lines.push(CartLine {
                product_id,
                name: name.to_string(),
                unit_price,
                quantity: qty,
            });
        }
    }

    /// Deletes the line entirely, regardless of quantity.
    pub fn remove_line(&mut self, product_id: i64) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Adds `delta` to the line's quantity; a result of zero or less removes
    /// the line rather than keeping it at zero.
    pub fn change_quantity(&mut self, product_id: i64, delta: i32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += delta;
            if line.quantity <= 0 {
                self.remove_line(product_id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Durable storage for one device's cart lines.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, device_key: &str) -> Result<Vec<CartLine>>;
    async fn save(&self, device_key: &str, lines: &[CartLine]) -> Result<()>;
}

#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    product_id: i64,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn load(&self, device_key: &str) -> Result<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartRow>(
            "SELECT product_id, name, unit_price, quantity FROM cart_items \
             WHERE device_key = $1 ORDER BY product_id",
        )
        .bind(device_key)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| CartLine {
                product_id: r.product_id,
                name: r.name,
                unit_price: r.unit_price,
                quantity: r.quantity,
            })
            .collect())
    }

    async fn save(&self, device_key: &str, lines: &[CartLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cart_items WHERE device_key = $1")
            .bind(device_key)
            .execute(&mut *tx)
            .await?;
        for line in lines {
            sqlx::query(
                "INSERT INTO cart_items (device_key, product_id, name, unit_price, quantity) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(device_key)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await.map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn adding_same_product_merges_quantities() {
        let mut cart = Cart::default();
        cart.add_line(1, "Bolo", price(4000), 1);
        cart.add_line(1, "Bolo", price(4000), 2);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn remove_deletes_regardless_of_quantity() {
        let mut cart = Cart::default();
        cart.add_line(1, "Bolo", price(4000), 5);
        cart.remove_line(1);
        assert!(cart.is_empty());
    }

    #[test]
    fn quantity_dropping_to_zero_removes_the_line() {
        let mut cart = Cart::default();
        cart.add_line(1, "Bolo", price(4000), 2);
        cart.change_quantity(1, -1);
        assert_eq!(cart.lines()[0].quantity, 1);
        cart.change_quantity(1, -1);
        assert!(cart.is_empty());
    }

    #[test]
    fn no_sequence_leaves_a_non_positive_quantity() {
        let mut cart = Cart::default();
        cart.add_line(1, "Bolo", price(4000), 1);
        cart.add_line(2, "Torta", price(2500), 3);
        cart.change_quantity(1, -10);
        cart.change_quantity(2, -2);
        cart.change_quantity(99, -1); // unknown id is a no-op
        assert!(cart.lines().iter().all(|l| l.quantity > 0));
    }

    #[test]
    fn snapshot_is_detached_from_live_state() {
        let mut cart = Cart::default();
        cart.add_line(1, "Bolo", price(4000), 1);
        let snap = cart.snapshot();
        cart.clear();
        assert_eq!(snap.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn stored_zero_quantity_lines_are_dropped_on_load() {
        let cart = Cart::from_lines(vec![
            CartLine { product_id: 1, name: "Bolo".into(), unit_price: price(4000), quantity: 0 },
            CartLine { product_id: 2, name: "Torta".into(), unit_price: price(2500), quantity: 2 },
        ]);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product_id, 2);
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let mut cart = Cart::default();
        cart.add_line(1, "Bolo", price(4000), 2);
        cart.add_line(2, "Torta", price(2550), 1);
        assert_eq!(cart.subtotal(), price(10550));
    }
}
